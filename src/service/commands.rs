//! Squad admin command formatting
//!
//! Pure functions from arguments to command strings. Player identifiers are quoted as
//! the server expects; free-text arguments are flattened to one line since a command
//! body cannot span lines.

pub const LIST_PLAYERS: &str = "ListPlayers";
pub const LIST_SQUADS: &str = "ListSquads";
pub const SHOW_CURRENT_MAP: &str = "ShowCurrentMap";
pub const SHOW_NEXT_MAP: &str = "ShowNextMap";

fn single_line(text: &str) -> String {
    text.split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn quoted_id(player: &str) -> String {
    format!("\"{}\"", player.replace('"', ""))
}

/// `AdminWarn "<player>" <message>`
pub fn warn(player: &str, message: &str) -> String {
    format!("AdminWarn {} {}", quoted_id(player), single_line(message))
}

/// `AdminBroadcast <message>`
pub fn broadcast(message: &str) -> String {
    format!("AdminBroadcast {}", single_line(message))
}

/// `AdminKick "<player>" <reason>`
pub fn kick(player: &str, reason: &str) -> String {
    format!("AdminKick {} {}", quoted_id(player), single_line(reason))
}

/// `AdminBan "<player>" <duration> <reason>`
///
/// Duration uses server syntax: `1d`, `2h`, or `0` for permanent.
pub fn ban(player: &str, duration: &str, reason: &str) -> String {
    format!(
        "AdminBan {} {} {}",
        quoted_id(player),
        duration.trim(),
        single_line(reason)
    )
}

/// `AdminForceTeamChange <player>`
pub fn force_team_change(player: &str) -> String {
    format!("AdminForceTeamChange {}", player.trim())
}

/// `AdminDisbandSquad <team> <squad>`
pub fn disband_squad(team_id: u32, squad_id: u32) -> String {
    format!("AdminDisbandSquad {team_id} {squad_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_commands() {
        assert_eq!(
            warn("76561198000000001", "Please join a squad"),
            "AdminWarn \"76561198000000001\" Please join a squad"
        );
        assert_eq!(broadcast("Seeding\nrules apply"), "AdminBroadcast Seeding rules apply");
        assert_eq!(kick("0002abc", "afk"), "AdminKick \"0002abc\" afk");
        assert_eq!(ban("0002abc", "1d", "teamkilling"), "AdminBan \"0002abc\" 1d teamkilling");
        assert_eq!(force_team_change("0002abc"), "AdminForceTeamChange 0002abc");
        assert_eq!(disband_squad(1, 4), "AdminDisbandSquad 1 4");
    }

    #[test]
    fn quotes_cannot_escape_the_id() {
        assert_eq!(kick("a\" b", "x"), "AdminKick \"a b\" x");
    }
}
