//! In-process mock Squad RCON server for integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use squad_rcon::{Packet, PacketType, RconCodec, RconConfig};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;

pub const PASSWORD: &str = "secret";

pub const PLAYERS: &str = "----- Active Players -----\n\
ID: 0 | Online IDs: EOS: 0002aaa steam: 76561198000000001 | Name: Alpha | Team ID: 1 | Squad ID: 1 | Is Leader: True | Role: USA_SL_01\n\
ID: ??? garbled line\n\
ID: 1 | Online IDs: EOS: 0002bbb steam: 76561198000000002 | Name: Bravo | Team ID: 2 | Squad ID: N/A | Is Leader: False | Role: RGF_Rifleman_01\n\
----- Recently Disconnected Players [Max of 15] -----\n\
ID: 2 | Online IDs: EOS: 0002ccc steam: 76561198000000003 | Since Disconnect: 01m.10s | Name: Charlie\n";

pub const SQUADS: &str = "----- Active Squads -----\n\
Team ID: 1 (United States Army)\n\
ID: 1 | Name: ALPHA | Size: 9 | Locked: False | Creator Name: Alpha | Creator Online IDs: EOS: 0002aaa steam: 76561198000000001\n\
Team ID: 2 (Russian Ground Forces)\n\
ID: 1 | Name: ARMOR | Size: 2 | Locked: True | Creator Name: Bravo | Creator Online IDs: EOS: 0002bbb steam: 76561198000000002\n";

/// Player name whose multi-byte character `SplitUtf8` cuts across two fragments
pub const SPLIT_NAME: &str = "Ayşe Çelik";
pub const SPLIT_AT: usize = 3;

pub const CHAT_LINE: &str =
    "[ChatAll] [Online IDs:EOS: 0002aaa steam: 76561198000000001] Alpha : hello admins";

/// Behaviour knobs for the mock
#[derive(Debug, Clone)]
pub struct MockOptions {
    pub password: String,
    /// Never answer AUTH packets
    pub silent_auth: bool,
    /// Delay before the server accepts a connection's auth
    pub auth_delay: Duration,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            password: PASSWORD.to_string(),
            silent_auth: false,
            auth_delay: Duration::ZERO,
        }
    }
}

/// Running mock server. Commands it understands:
/// - `Hang`: no reply, and the following probe is swallowed
/// - `Split`: reply in two fragments, `Hello, ` and `World`
/// - `SplitUtf8`: reply with [`SPLIT_NAME`] cut inside a character
/// - `Garble`: write a frame header with a negative size
/// - `Slow`: reply after 150 ms
/// - `Close`: drop the connection without replying
/// - `EmitChat`: push a chat packet, then reply `ok`
/// - `ListPlayers`, `ListSquads`, `ShowCurrentMap`, `ShowNextMap`: canned listings
/// - anything else is echoed back
pub struct MockServer {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    log: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> Self {
        Self::start_with(MockOptions::default()).await
    }

    pub async fn start_with(options: MockOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));

        let task = {
            let connections = Arc::clone(&connections);
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    connections.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve(stream, options.clone(), Arc::clone(&log)));
                }
            })
        };

        Self {
            addr,
            connections,
            log,
            task,
        }
    }

    /// Client configuration pointing at this server with test-friendly timeouts
    pub fn config(&self) -> RconConfig {
        let mut config = RconConfig::new("127.0.0.1", self.addr.port(), PASSWORD);
        config.connect_timeout = Duration::from_secs(1);
        config.auth_timeout = Duration::from_millis(300);
        config.command_timeout = Duration::from_millis(400);
        config.reconnect_delay = Duration::from_millis(20);
        config.max_reconnect_attempts = 3;
        config
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// `recv:<command>` when a command arrives, `sent:<command>` once its reply is written
    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Reply {
    delay: Duration,
    frames: Vec<Vec<u8>>,
    note: Option<String>,
}

fn response(id: i32, body: impl Into<Vec<u8>>) -> Vec<u8> {
    Packet::new(id, PacketType::RESPONSE_VALUE, body).to_bytes()
}

async fn serve(stream: TcpStream, options: MockOptions, log: Arc<Mutex<Vec<String>>>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut stream = FramedRead::new(read_half, RconCodec::default());
    let (tx, mut rx) = mpsc::unbounded_channel::<Reply>();

    // Replies go out strictly in order, delays included, like a real server
    let writer_log = Arc::clone(&log);
    let writer = tokio::spawn(async move {
        while let Some(reply) = rx.recv().await {
            if !reply.delay.is_zero() {
                tokio::time::sleep(reply.delay).await;
            }
            for frame in reply.frames {
                if write_half.write_all(&frame).await.is_err() {
                    return;
                }
            }
            if let Some(note) = reply.note {
                writer_log.lock().push(format!("sent:{note}"));
            }
        }
    });

    let mut swallow_next_probe = false;
    while let Some(Ok(packet)) = stream.next().await {
        let reply = match packet.kind {
            PacketType::AUTH => {
                if options.silent_auth {
                    continue;
                }
                let verdict = if packet.body == options.password.as_bytes() {
                    packet.id
                } else {
                    -1
                };
                Reply {
                    delay: options.auth_delay,
                    frames: vec![
                        response(packet.id, ""),
                        Packet::new(verdict, PacketType::AUTH_RESPONSE, "").to_bytes(),
                    ],
                    note: None,
                }
            }
            PacketType::EXEC_COMMAND => {
                let command = packet.text().into_owned();
                log.lock().push(format!("recv:{command}"));
                let (delay, frames) = match command.as_str() {
                    "Hang" => {
                        swallow_next_probe = true;
                        continue;
                    }
                    "Close" => break,
                    "Split" => (
                        Duration::ZERO,
                        vec![response(packet.id, "Hello, "), response(packet.id, "World")],
                    ),
                    "SplitUtf8" => {
                        let (head, tail) = SPLIT_NAME.as_bytes().split_at(SPLIT_AT);
                        (Duration::ZERO, vec![response(packet.id, head), response(packet.id, tail)])
                    }
                    // Negative size prefix: the client cannot resynchronise after this
                    "Garble" => (Duration::ZERO, vec![(-5i32).to_le_bytes().to_vec()]),
                    "Slow" => (Duration::from_millis(150), vec![response(packet.id, "slow done")]),
                    "EmitChat" => (
                        Duration::ZERO,
                        vec![
                            Packet::new(0, PacketType::CHAT_VALUE, CHAT_LINE).to_bytes(),
                            response(packet.id, "ok"),
                        ],
                    ),
                    "ListPlayers" => (Duration::ZERO, vec![response(packet.id, PLAYERS)]),
                    "ListSquads" => (Duration::ZERO, vec![response(packet.id, SQUADS)]),
                    "ShowCurrentMap" => (
                        Duration::ZERO,
                        vec![response(
                            packet.id,
                            "Current level is Narva, layer is Narva_RAAS_v1, factions USA RGF",
                        )],
                    ),
                    "ShowNextMap" => (
                        Duration::ZERO,
                        vec![response(packet.id, "Next map is not defined")],
                    ),
                    other => (Duration::ZERO, vec![response(packet.id, other)]),
                };
                Reply {
                    delay,
                    frames,
                    note: Some(command),
                }
            }
            PacketType::RESPONSE_VALUE => {
                if swallow_next_probe {
                    swallow_next_probe = false;
                    continue;
                }
                // Echo plus the odd trailing packet Squad sends after an empty RESPONSE_VALUE
                Reply {
                    delay: Duration::ZERO,
                    frames: vec![response(packet.id, ""), response(packet.id, "\u{1}")],
                    note: None,
                }
            }
            _ => continue,
        };

        if tx.send(reply).is_err() {
            break;
        }
    }

    drop(tx);
    let _ = writer.await;
}
