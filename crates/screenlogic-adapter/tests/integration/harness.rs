//! Test harness: an in-process fake controller speaking the real protocol
//! over loopback TCP, plus adapter builders pointed at it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use screenlogic_adapter::{Adapter, AdapterOptions, TcpConnector};
use screenlogic_protocol::wire::put_string;
use screenlogic_protocol::{Message, MessageCodec, MsgCode, CONNECT_PREAMBLE};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Decoder;

pub const VERSION: &str = "POOL: 5.2 Build 738.0 Rel";

#[derive(Debug, Clone)]
pub struct FakeCircuit {
    pub id: u32,
    pub name: &'static str,
    pub on: bool,
}

/// Controller state and everything the fake has observed.
#[derive(Debug)]
pub struct FakeState {
    pub circuits: Vec<FakeCircuit>,
    /// Accepted connections so far.
    pub connections: usize,
    /// Connections the client has closed.
    pub disconnects: usize,
    pub logins: usize,
    /// (connection, id, code) of every framed request.
    pub requests: Vec<(usize, u16, u16)>,
    pub reject_login: bool,
    /// Requests with these codes are never answered.
    pub stall_codes: Vec<u16>,
    /// Send a stale response with a foreign id before each real one.
    pub stale_first: bool,
    /// Answer every request with this id instead of the request's.
    pub fixed_reply_id: Option<u16>,
    /// Hang up after this many requests on a connection.
    pub drop_after: Option<usize>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            circuits: vec![
                FakeCircuit { id: 500, name: "Spa", on: false },
                FakeCircuit { id: 505, name: "Pool", on: false },
                FakeCircuit { id: 510, name: "Pool Light", on: false },
                FakeCircuit { id: 515, name: "Cleaner", on: true },
            ],
            connections: 0,
            disconnects: 0,
            logins: 0,
            requests: Vec::new(),
            reject_login: false,
            stall_codes: Vec::new(),
            stale_first: false,
            fixed_reply_id: None,
            drop_after: None,
        }
    }
}

pub struct FakeController {
    pub addr: String,
    pub state: Arc<Mutex<FakeState>>,
    handle: tokio::task::JoinHandle<()>,
}

#[allow(dead_code)]
impl FakeController {
    pub async fn start() -> Self {
        Self::start_with(FakeState::default()).await
    }

    pub async fn start_with(state: FakeState) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let state = Arc::new(Mutex::new(state));

        let accept_state = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            while let Ok((sock, _)) = listener.accept().await {
                let conn = {
                    let mut s = accept_state.lock().unwrap();
                    s.connections += 1;
                    s.connections
                };
                let state = Arc::clone(&accept_state);
                tokio::spawn(async move {
                    let _ = serve(sock, conn, Arc::clone(&state)).await;
                    state.lock().unwrap().disconnects += 1;
                });
            }
        });

        Self { addr, state, handle }
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn connections(&self) -> usize {
        self.with_state(|s| s.connections)
    }

    pub fn disconnects(&self) -> usize {
        self.with_state(|s| s.disconnects)
    }

    pub fn logins(&self) -> usize {
        self.with_state(|s| s.logins)
    }

    /// (id, code) of requests seen on connection `conn` (1-based).
    pub fn requests_on(&self, conn: usize) -> Vec<(u16, u16)> {
        self.with_state(|s| {
            s.requests
                .iter()
                .filter(|r| r.0 == conn)
                .map(|r| (r.1, r.2))
                .collect()
        })
    }

    pub fn circuit_on(&self, id: u32) -> Option<bool> {
        self.with_state(|s| s.circuits.iter().find(|c| c.id == id).map(|c| c.on))
    }

    /// Poll until `f` holds or `timeout` passes.
    pub async fn wait_for(&self, timeout: Duration, f: impl Fn(&FakeState) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if f(&self.state.lock().unwrap()) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

impl Drop for FakeController {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Adapter options with short timings for tests.
pub fn test_options(keep_alive: Duration) -> AdapterOptions {
    AdapterOptions {
        timeout: Duration::from_millis(500),
        keep_alive,
        max_retries: 3,
        match_response_ids: true,
    }
}

pub fn adapter_for(fake: &FakeController, options: AdapterOptions) -> Adapter {
    let connector = TcpConnector::new(fake.addr.clone(), options.timeout);
    Adapter::with_connector(Arc::new(connector), options)
}

async fn serve(
    mut sock: TcpStream,
    conn: usize,
    state: Arc<Mutex<FakeState>>,
) -> std::io::Result<()> {
    let mut preamble = vec![0u8; CONNECT_PREAMBLE.len()];
    sock.read_exact(&mut preamble).await?;
    if preamble != CONNECT_PREAMBLE {
        return Ok(());
    }

    let mut codec = MessageCodec;
    let mut buf = BytesMut::new();
    let mut served = 0;
    loop {
        let request = match codec.decode(&mut buf) {
            Ok(Some(m)) => m,
            Ok(None) => {
                if sock.read_buf(&mut buf).await? == 0 {
                    return Ok(());
                }
                continue;
            }
            Err(_) => return Ok(()),
        };

        let replies = {
            let mut s = state.lock().unwrap();
            s.requests.push((conn, request.id(), request.code()));
            served += 1;
            if s.drop_after.is_some_and(|n| served > n) {
                return Ok(());
            }
            respond(&mut s, &request)
        };
        for reply in replies {
            sock.write_all(reply.as_bytes()).await?;
        }
    }
}

fn respond(s: &mut FakeState, request: &Message) -> Vec<Message> {
    let code = request.code();
    if s.stall_codes.contains(&code) {
        return Vec::new();
    }
    let id = s.fixed_reply_id.unwrap_or(request.id());

    let reply = match MsgCode::from_u16(code) {
        Some(MsgCode::LocalLogin) if s.reject_login => {
            Message::new(id, MsgCode::BadLogin.as_u16(), &[])
        }
        Some(MsgCode::LocalLogin) => {
            s.logins += 1;
            Message::new(id, MsgCode::LocalLogin.response_code(), &[])
        }
        Some(MsgCode::GetDateTime) => {
            let mut b = Vec::new();
            for f in [2024u16, 7, 0, 14, 9, 30, 5, 0, 1] {
                b.put_u16_le(f);
            }
            Message::new(id, MsgCode::GetDateTime.response_code(), &b)
        }
        Some(MsgCode::GetVersion) => {
            let mut b = Vec::new();
            put_string(&mut b, VERSION);
            Message::new(id, MsgCode::GetVersion.response_code(), &b)
        }
        Some(MsgCode::GetConfig) => {
            let payload = config_payload(&s.circuits);
            Message::new(id, MsgCode::GetConfig.response_code(), &payload)
        }
        Some(MsgCode::GetStatus) => {
            let payload = status_payload(&s.circuits);
            Message::new(id, MsgCode::GetStatus.response_code(), &payload)
        }
        Some(MsgCode::ButtonPress) => {
            let p = request.payload();
            let circuit = u32::from_le_bytes([p[4], p[5], p[6], p[7]]);
            let on = p[8] != 0;
            match s.circuits.iter_mut().find(|c| c.id == circuit) {
                Some(c) => {
                    c.on = on;
                    Message::new(id, MsgCode::ButtonPress.response_code(), &[])
                }
                None => Message::new(id, MsgCode::BadParameter.as_u16(), &[]),
            }
        }
        _ => Message::new(id, MsgCode::InvalidRequest.as_u16(), &[]),
    };

    if s.stale_first {
        let stale = Message::new(id.wrapping_add(1000), reply.code(), reply.payload());
        vec![stale, reply]
    } else {
        vec![reply]
    }
}

/// EasyTouch2 8, Fahrenheit, no pumps.
fn config_payload(circuits: &[FakeCircuit]) -> Vec<u8> {
    let mut b = Vec::new();
    b.put_u32_le(100);
    b.put_slice(&[40, 104, 40, 104]);
    b.put_u8(0);
    b.put_u8(13);
    b.put_u8(0);
    b.put_u8(0);
    b.put_u32_le(0);
    put_string(&mut b, "Circuits");
    b.put_u32_le(circuits.len() as u32);
    for c in circuits {
        b.put_u32_le(c.id);
        put_string(&mut b, c.name);
        b.put_u8(0); // index
        b.put_slice(&[2, 0, 0, 0, 0, 0]);
        b.put_u8(1); // device id
        b.put_u16_le(720);
        b.put_u16_le(0);
    }
    b.put_u32_le(1);
    put_string(&mut b, "White");
    for v in [255u32, 255, 255] {
        b.put_u32_le(v);
    }
    b.put_slice(&[0; 8]);
    b.put_u32_le(0);
    b.put_u32_le(0);
    b
}

/// Ready, no bodies, every circuit, neutral chemistry.
fn status_payload(circuits: &[FakeCircuit]) -> Vec<u8> {
    let mut b = Vec::new();
    b.put_u32_le(1);
    b.put_slice(&[0; 12]);
    b.put_u32_le(0);
    b.put_u32_le(circuits.len() as u32);
    for c in circuits {
        b.put_u32_le(c.id);
        b.put_u32_le(u32::from(c.on));
        b.put_slice(&[0; 4]);
    }
    for v in [740i32, 650, 0, 3200, 0, 0, 0] {
        b.put_i32_le(v);
    }
    b
}
