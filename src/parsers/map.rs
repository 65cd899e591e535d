//! `ShowCurrentMap` / `ShowNextMap` parsers

use serde::{Deserialize, Serialize};

use super::ParseError;

const CURRENT_PREFIX: &str = "Current level is ";
const NEXT_PREFIX: &str = "Next level is ";
const NEXT_UNDEFINED: &str = "Next map is not defined";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapInfo {
    pub level: String,
    pub layer: String,
    pub factions: Option<String>,
}

pub fn parse_current_map(text: &str) -> Result<MapInfo, ParseError> {
    parse_map_line(text, CURRENT_PREFIX)
}

/// `Ok(None)` when the server has no next map queued.
pub fn parse_next_map(text: &str) -> Result<Option<MapInfo>, ParseError> {
    if text.trim().starts_with(NEXT_UNDEFINED) {
        return Ok(None);
    }
    parse_map_line(text, NEXT_PREFIX).map(Some)
}

/// `<prefix>Narva, layer is Narva_RAAS_v1, factions USA RGF`
fn parse_map_line(text: &str, prefix: &str) -> Result<MapInfo, ParseError> {
    let line = text.trim();
    let fail = |reason| ParseError::new(1, line, reason);

    let rest = line.strip_prefix(prefix).ok_or_else(|| fail("unexpected map response"))?;
    let (level, rest) = rest.split_once(", layer is ").ok_or_else(|| fail("missing layer"))?;
    let (layer, factions) = match rest.split_once(", factions ") {
        Some((layer, factions)) => (layer, Some(factions.trim().to_string())),
        None => (rest, None),
    };

    Ok(MapInfo {
        level: level.trim().to_string(),
        layer: layer.trim().to_string(),
        factions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_map_with_factions() {
        let info =
            parse_current_map("Current level is Narva, layer is Narva_RAAS_v1, factions USA RGF")
                .unwrap();
        assert_eq!(info.level, "Narva");
        assert_eq!(info.layer, "Narva_RAAS_v1");
        assert_eq!(info.factions.as_deref(), Some("USA RGF"));
    }

    #[test]
    fn next_map_undefined() {
        assert_eq!(parse_next_map("Next map is not defined").unwrap(), None);
        let next = parse_next_map("Next level is Gorodok, layer is Gorodok_AAS_v1")
            .unwrap()
            .unwrap();
        assert_eq!(next.layer, "Gorodok_AAS_v1");
        assert_eq!(next.factions, None);
    }

    #[test]
    fn garbage_is_an_error() {
        let err = parse_current_map("Unknown command").unwrap_err();
        assert_eq!(err.reason, "unexpected map response");
    }
}
