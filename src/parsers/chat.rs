//! Chat packet parser

use serde::{Deserialize, Serialize};
use std::fmt;

use super::parse_online_ids;

/// Channel a chat line was sent on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatChannel {
    All,
    Team,
    Squad,
    Admin,
}

impl ChatChannel {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ChatAll" => Some(Self::All),
            "ChatTeam" => Some(Self::Team),
            "ChatSquad" => Some(Self::Squad),
            "ChatAdmin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for ChatChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::All => "ChatAll",
            Self::Team => "ChatTeam",
            Self::Squad => "ChatSquad",
            Self::Admin => "ChatAdmin",
        };
        f.write_str(tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub channel: ChatChannel,
    pub eos_id: Option<String>,
    pub steam_id: Option<String>,
    pub name: String,
    pub message: String,
}

/// Parse `[ChatAll] [Online IDs:EOS: x steam: y] Name : message`.
///
/// Returns `None` for anything that is not a player chat line.
pub fn parse_chat_message(body: &str) -> Option<ChatMessage> {
    let rest = body.trim().strip_prefix('[')?;
    let (tag, rest) = rest.split_once(']')?;
    let channel = ChatChannel::from_tag(tag)?;

    let rest = rest.trim_start().strip_prefix('[')?;
    let (ids, rest) = rest.split_once(']')?;
    let ids = ids.strip_prefix("Online IDs:").or_else(|| ids.strip_prefix("SteamID:"))?;
    let ids = if !ids.trim().is_empty() && ids.trim().chars().all(|c| c.is_ascii_digit()) {
        // SteamID-only header from older servers
        super::OnlineIds {
            eos_id: None,
            steam_id: Some(ids.trim().to_string()),
        }
    } else {
        parse_online_ids(ids)
    };

    let (name, message) = rest.split_once(" : ")?;

    Some(ChatMessage {
        channel,
        eos_id: ids.eos_id,
        steam_id: ids.steam_id,
        name: name.trim().to_string(),
        message: message.to_string(),
    })
}
