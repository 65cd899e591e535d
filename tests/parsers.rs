//! Parser tests against full server responses

#![allow(clippy::unwrap_used)]

use squad_rcon::parsers::{
    parse_chat_message, parse_current_map, parse_list_players, parse_list_squads, parse_next_map,
};
use squad_rcon::ChatChannel;

const FULL_ROSTER: &str = "----- Active Players -----\r\n\
ID: 0 | Online IDs: EOS: 00020000000000000000000000000001 steam: 76561198000000001 | Name: [1st] Able | Team ID: 1 | Squad ID: 1 | Is Leader: True | Role: USA_SL_01\r\n\
ID: 1 | Online IDs: EOS: 00020000000000000000000000000002 steam: 76561198000000002 | Name: Baker | Team ID: 1 | Squad ID: 1 | Is Leader: False | Role: USA_Medic_01\r\n\
ID: 2 | Online IDs: EOS: 00020000000000000000000000000003 | Name: Charlie | Team ID: 2 | Squad ID: N/A | Is Leader: False | Role: RGF_Rifleman_01\r\n\
ID: 3 | Online IDs: EOS: 00020000000000000000000000000004 steam: 76561198000000004 | Name: Dog | Team ID: N/A | Squad ID: N/A | Is Leader: False | Role: \r\n\
\r\n\
----- Recently Disconnected Players [Max of 15] -----\r\n\
ID: 9 | Online IDs: EOS: 00020000000000000000000000000009 steam: 76561198000000009 | Since Disconnect: 00m.42s | Name: Easy\r\n";

#[test]
fn full_roster_with_crlf_line_endings() {
    let listing = parse_list_players(FULL_ROSTER);
    assert!(listing.is_clean(), "{:?}", listing.skipped);

    let names: Vec<_> = listing.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["[1st] Able", "Baker", "Charlie", "Dog"]);

    let charlie = &listing.records[2];
    assert_eq!(charlie.steam_id, None);
    assert_eq!(charlie.admin_id(), Some("00020000000000000000000000000003"));

    let dog = &listing.records[3];
    assert_eq!(dog.team_id, None);
    assert_eq!(dog.squad_id, None);
    assert_eq!(dog.role, "");
}

#[test]
fn squads_grouped_by_team() {
    let text = "----- Active Squads -----\n\
Team ID: 1 (Australian Defence Force)\n\
ID: 1 | Name: Infantry | Size: 8 | Locked: False | Creator Name: Able | Creator Online IDs: EOS: e1 steam: s1\n\
ID: 2 | Name: Logi | Run | Size: 2 | Locked: True | Creator Name: Baker | Creator Online IDs: EOS: e2\n\
Team ID: 2 (Insurgent Forces)\n\
ID: 1 | Name: HAB | Size: 3 | Locked: False | Creator Name: Charlie | Creator Online IDs: EOS: e3 steam: s3\n";

    let squads = parse_list_squads(text);
    assert!(squads.is_clean(), "{:?}", squads.skipped);
    assert_eq!(squads.len(), 3);

    let logi = &squads.records[1];
    assert_eq!(logi.name, "Logi | Run");
    assert_eq!(logi.team_name.as_deref(), Some("Australian Defence Force"));
    assert_eq!(logi.creator_eos_id.as_deref(), Some("e2"));
    assert_eq!(logi.creator_steam_id, None);

    let per_team: Vec<_> = squads.iter().map(|s| (s.team_id, s.squad_id)).collect();
    assert_eq!(per_team, [(Some(1), Some(1)), (Some(1), Some(2)), (Some(2), Some(1))]);
}

#[test]
fn chat_channels() {
    for (tag, channel) in [
        ("ChatAll", ChatChannel::All),
        ("ChatTeam", ChatChannel::Team),
        ("ChatSquad", ChatChannel::Squad),
        ("ChatAdmin", ChatChannel::Admin),
    ] {
        let line = format!("[{tag}] [Online IDs:EOS: e steam: s] Name : text");
        let message = parse_chat_message(&line).unwrap();
        assert_eq!(message.channel, channel);
        assert_eq!(message.channel.to_string(), tag);
    }
}

#[test]
fn map_responses() {
    let current =
        parse_current_map("Current level is Yehorivka, layer is Yehorivka_RAAS_v2").unwrap();
    assert_eq!(current.level, "Yehorivka");
    assert_eq!(current.factions, None);

    let next = parse_next_map("Next level is Fool's Road, layer is Fools_Road_AAS_v1, factions PLA USMC")
        .unwrap()
        .unwrap();
    assert_eq!(next.level, "Fool's Road");
    assert_eq!(next.factions.as_deref(), Some("PLA USMC"));
}
