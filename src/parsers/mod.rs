//! # Structured Parsers
//!
//! Turn raw command responses into typed records.
//!
//! Listing parsers are line-oriented and forgiving: header and footer lines are
//! recognized and ignored, lines that do not have the record shape are reported in
//! [`Listing::skipped`] instead of failing the whole batch, and unparsable ids degrade to
//! `None`. A roster with one glitched line is still a roster.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{RconError, Result};

pub mod chat;
pub mod map;
pub mod players;
pub mod squads;

pub use chat::{parse_chat_message, ChatChannel, ChatMessage};
pub use map::{parse_current_map, parse_next_map, MapInfo};
pub use players::{parse_list_players, PlayerRecord};
pub use squads::{parse_list_squads, SquadRecord};

/// A line that could not be turned into a record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line_number}: {reason}: {line:?}")]
pub struct ParseError {
    /// 1-based line number within the response
    pub line_number: usize,
    pub line: String,
    pub reason: &'static str,
}

impl ParseError {
    pub fn new(line_number: usize, line: &str, reason: &'static str) -> Self {
        Self {
            line_number,
            line: line.to_string(),
            reason,
        }
    }
}

/// Records parsed from a listing response plus the lines that were skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing<T> {
    pub records: Vec<T>,
    #[serde(skip)]
    pub skipped: Vec<ParseError>,
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> Listing<T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True when every non-header line produced a record
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }

    /// All-or-nothing view: the first skipped line becomes an error.
    pub fn into_strict(self) -> Result<Vec<T>> {
        match self.skipped.into_iter().next() {
            Some(err) => Err(RconError::Parse(err)),
            None => Ok(self.records),
        }
    }
}

impl<T> IntoIterator for Listing<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Player identifiers carried in `Online IDs:` fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct OnlineIds {
    pub eos_id: Option<String>,
    pub steam_id: Option<String>,
}

/// Parse `EOS: 0002a1... steam: 7656...` into its identifiers. Unknown platforms are ignored.
pub(crate) fn parse_online_ids(text: &str) -> OnlineIds {
    let mut ids = OnlineIds::default();
    let mut tokens = text.split_whitespace();
    while let Some(key) = tokens.next() {
        let Some(value) = tokens.next() else { break };
        match key.trim_end_matches(':').to_ascii_lowercase().as_str() {
            "eos" => ids.eos_id = Some(value.to_string()),
            "steam" => ids.steam_id = Some(value.to_string()),
            _ => {}
        }
    }
    ids
}

/// Numeric id field; `N/A` and anything unparsable map to `None`.
pub(crate) fn parse_optional_id(text: &str) -> Option<u32> {
    text.trim().parse::<u32>().ok()
}

pub(crate) fn parse_flag(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("true")
}

/// `----- Active Players -----` style section banners
pub(crate) fn is_banner(line: &str) -> bool {
    line.starts_with("-----")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn online_ids_pick_known_platforms() {
        let ids = parse_online_ids(" EOS: 0002abc steam: 76561198000000001 epic: zzz ");
        assert_eq!(ids.eos_id.as_deref(), Some("0002abc"));
        assert_eq!(ids.steam_id.as_deref(), Some("76561198000000001"));
    }

    #[test]
    fn unknown_ids_degrade_to_none() {
        assert_eq!(parse_optional_id("N/A"), None);
        assert_eq!(parse_optional_id(" 2 "), Some(2));
        assert_eq!(parse_optional_id("x1"), None);
    }

    #[test]
    fn strict_listing_surfaces_first_skip() {
        let listing: Listing<u32> = Listing {
            records: vec![1],
            skipped: vec![ParseError::new(3, "garbage", "not a record")],
        };
        match listing.into_strict() {
            Err(RconError::Parse(err)) => assert_eq!(err.line_number, 3),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
