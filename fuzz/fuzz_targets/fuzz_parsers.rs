#![no_main]

use libfuzzer_sys::fuzz_target;
use squad_rcon::parsers::{
    parse_chat_message, parse_current_map, parse_list_players, parse_list_squads, parse_next_map,
};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let _ = parse_list_players(text);
    let _ = parse_list_squads(text);
    let _ = parse_chat_message(text);
    let _ = parse_current_map(text);
    let _ = parse_next_map(text);
});
