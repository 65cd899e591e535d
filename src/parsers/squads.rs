//! `ListSquads` response parser

use serde::{Deserialize, Serialize};

use super::{is_banner, parse_flag, parse_online_ids, parse_optional_id, Listing, ParseError};

/// One squad as reported by `ListSquads`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadRecord {
    pub team_id: Option<u32>,
    /// Faction name from the enclosing team header
    pub team_name: Option<String>,
    pub squad_id: Option<u32>,
    pub name: String,
    /// Member count, 0 when the server printed something unparsable
    pub size: u32,
    pub locked: bool,
    pub creator_name: Option<String>,
    pub creator_eos_id: Option<String>,
    pub creator_steam_id: Option<String>,
}

/// Parse the full text of a `ListSquads` response.
///
/// Squad lines carry no team id of their own; it comes from the most recent
/// `Team ID: n (Faction)` header.
pub fn parse_list_squads(text: &str) -> Listing<SquadRecord> {
    let mut listing = Listing::default();
    let mut team: (Option<u32>, Option<String>) = (None, None);

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || is_banner(line) {
            continue;
        }
        if let Some(header) = line.strip_prefix("Team ID: ") {
            team = parse_team_header(header);
            continue;
        }

        match parse_squad_line(line, &team) {
            Ok(record) => listing.records.push(record),
            Err(reason) => listing.skipped.push(ParseError::new(index + 1, line, reason)),
        }
    }

    listing
}

/// `1 (United States Army)`
fn parse_team_header(header: &str) -> (Option<u32>, Option<String>) {
    match header.split_once(" (") {
        Some((id, name)) => (
            parse_optional_id(id),
            Some(name.trim_end_matches(')').to_string()),
        ),
        None => (parse_optional_id(header), None),
    }
}

fn parse_squad_line(
    line: &str,
    team: &(Option<u32>, Option<String>),
) -> Result<SquadRecord, &'static str> {
    let rest = line.strip_prefix("ID: ").ok_or("missing squad id")?;
    let (id_text, rest) = rest.split_once(" | Name: ").ok_or("missing squad name")?;
    // Squad names are free text; the fixed fields start at the last " | Size: ".
    let size_at = rest.rfind(" | Size: ").ok_or("missing squad size")?;

    let mut record = SquadRecord {
        team_id: team.0,
        team_name: team.1.clone(),
        squad_id: parse_optional_id(id_text),
        name: rest[..size_at].to_string(),
        size: 0,
        locked: false,
        creator_name: None,
        creator_eos_id: None,
        creator_steam_id: None,
    };

    for field in rest[size_at + " | ".len()..].split(" | ") {
        let Some((key, value)) = field.split_once(": ") else {
            continue;
        };
        match key {
            "Size" => record.size = parse_optional_id(value).unwrap_or(0),
            "Locked" => record.locked = parse_flag(value),
            "Creator Name" => record.creator_name = Some(value.trim().to_string()),
            "Creator Online IDs" => {
                let ids = parse_online_ids(value);
                record.creator_eos_id = ids.eos_id;
                record.creator_steam_id = ids.steam_id;
            }
            "Creator Steam ID" => record.creator_steam_id = Some(value.trim().to_string()),
            _ => {}
        }
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUADS: &str = "----- Active Squads -----\n\
Team ID: 1 (United States Army)\n\
ID: 1 | Name: ALPHA | Size: 9 | Locked: False | Creator Name: Alpha | Creator Online IDs: EOS: 0002aaa steam: 76561198000000001\n\
ID: 2 | Name: ARMOR | Size: x | Locked: True | Creator Name: Echo | Creator Online IDs: EOS: 0002eee\n\
Team ID: 2 (Russian Ground Forces)\n\
ID: 1 | Name: Squad 1 | Size: 4 | Locked: False | Creator Name: Bravo | Creator Online IDs: EOS: 0002bbb steam: 76561198000000002\n";

    #[test]
    fn squads_inherit_team_from_header() {
        let listing = parse_list_squads(SQUADS);
        assert!(listing.is_clean(), "{:?}", listing.skipped);
        assert_eq!(listing.len(), 3);

        let alpha = &listing.records[0];
        assert_eq!(alpha.team_id, Some(1));
        assert_eq!(alpha.team_name.as_deref(), Some("United States Army"));
        assert_eq!(alpha.squad_id, Some(1));
        assert_eq!(alpha.size, 9);
        assert!(!alpha.locked);
        assert_eq!(alpha.creator_steam_id.as_deref(), Some("76561198000000001"));

        let armor = &listing.records[1];
        assert_eq!(armor.size, 0);
        assert!(armor.locked);
        assert_eq!(armor.creator_steam_id, None);

        assert_eq!(listing.records[2].team_id, Some(2));
        assert_eq!(listing.records[2].name, "Squad 1");
    }

    #[test]
    fn junk_line_is_skipped() {
        let listing = parse_list_squads("Team ID: 1 (A)\nnonsense\nID: 3 | Name: C | Size: 1 | Locked: False");
        assert_eq!(listing.len(), 1);
        assert_eq!(listing.skipped.len(), 1);
        assert_eq!(listing.skipped[0].line_number, 2);
    }
}
