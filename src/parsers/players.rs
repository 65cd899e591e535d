//! `ListPlayers` response parser

use serde::{Deserialize, Serialize};

use super::{is_banner, parse_flag, parse_online_ids, parse_optional_id, Listing, ParseError};

const RECENTLY_DISCONNECTED: &str = "Recently Disconnected";
const NAME_SEPARATOR: &str = " | Name: ";
const TEAM_SEPARATOR: &str = " | Team ID: ";

/// One connected player as reported by `ListPlayers`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Server-side slot id
    pub player_id: Option<u32>,
    pub eos_id: Option<String>,
    pub steam_id: Option<String>,
    pub name: String,
    pub team_id: Option<u32>,
    pub squad_id: Option<u32>,
    pub is_leader: bool,
    pub role: String,
}

impl PlayerRecord {
    /// Preferred identifier for admin commands: EOS id, falling back to Steam id.
    pub fn admin_id(&self) -> Option<&str> {
        self.eos_id.as_deref().or(self.steam_id.as_deref())
    }
}

/// Parse the full text of a `ListPlayers` response.
///
/// Only the active-player section is read. Player names may themselves contain ` | `,
/// so the name runs up to the last ` | Team ID: ` on the line.
pub fn parse_list_players(text: &str) -> Listing<PlayerRecord> {
    let mut listing = Listing::default();
    let mut in_disconnected = false;

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if is_banner(line) {
            in_disconnected = line.contains(RECENTLY_DISCONNECTED);
            continue;
        }
        if in_disconnected {
            continue;
        }

        match parse_player_line(line) {
            Ok(record) => listing.records.push(record),
            Err(reason) => listing.skipped.push(ParseError::new(index + 1, line, reason)),
        }
    }

    listing
}

fn parse_player_line(line: &str) -> Result<PlayerRecord, &'static str> {
    let rest = line.strip_prefix("ID: ").ok_or("missing player id")?;
    let (id_text, rest) = rest.split_once(" | ").ok_or("missing player fields")?;
    let (ids_text, rest) = rest.split_once(NAME_SEPARATOR).ok_or("missing name")?;
    let team_at = rest.rfind(TEAM_SEPARATOR).ok_or("missing team id")?;

    let name = rest[..team_at].to_string();
    let tail = &rest[team_at + " | ".len()..];

    let (eos_id, steam_id) = match ids_text.split_once(": ") {
        Some(("Online IDs", ids)) => {
            let ids = parse_online_ids(ids);
            (ids.eos_id, ids.steam_id)
        }
        Some(("SteamID", steam)) => (None, Some(steam.trim().to_string())),
        _ => return Err("unrecognized player identifiers"),
    };

    let mut record = PlayerRecord {
        player_id: parse_optional_id(id_text),
        eos_id,
        steam_id,
        name,
        team_id: None,
        squad_id: None,
        is_leader: false,
        role: String::new(),
    };

    for field in tail.split(" | ") {
        let Some((key, value)) = field.split_once(": ") else {
            continue;
        };
        match key {
            "Team ID" => record.team_id = parse_optional_id(value),
            "Squad ID" => record.squad_id = parse_optional_id(value),
            "Is Leader" => record.is_leader = parse_flag(value),
            "Role" => record.role = value.trim().to_string(),
            _ => {}
        }
    }

    Ok(record)
}
