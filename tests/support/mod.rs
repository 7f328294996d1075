//! A scripted MySQL server on a loopback listener, speaking just enough of
//! the wire protocol to exercise the client end-to-end.
#![allow(dead_code)]

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;

use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use marlin_mysql::MySqlConnectOptions;

pub const PASSWORD: &str = "open-sesame";
pub const SCRAMBLE_1: &[u8] = b"abcdefgh";
pub const SCRAMBLE_2: &[u8] = b"ijklmnopqrst";

// capability bits the mock server advertises
const LONG_PASSWORD: u32 = 0x0000_0001;
const LONG_FLAG: u32 = 0x0000_0004;
const CONNECT_WITH_DB: u32 = 0x0000_0008;
const PROTOCOL_41: u32 = 0x0000_0200;
const TRANSACTIONS: u32 = 0x0000_2000;
const SECURE_CONNECTION: u32 = 0x0000_8000;
const MULTI_RESULTS: u32 = 0x0002_0000;
const PS_MULTI_RESULTS: u32 = 0x0004_0000;
const PLUGIN_AUTH: u32 = 0x0008_0000;
const PLUGIN_AUTH_LENENC_DATA: u32 = 0x0020_0000;
const DEPRECATE_EOF: u32 = 0x0100_0000;

const SERVER_CAPABILITIES: u32 = LONG_PASSWORD
    | LONG_FLAG
    | CONNECT_WITH_DB
    | PROTOCOL_41
    | TRANSACTIONS
    | SECURE_CONNECTION
    | MULTI_RESULTS
    | PS_MULTI_RESULTS
    | PLUGIN_AUTH
    | PLUGIN_AUTH_LENENC_DATA
    | DEPRECATE_EOF;

const AUTOCOMMIT: u16 = 0x0002;
const MORE_RESULTS: u16 = 0x0008;

const MAX_FRAME: usize = 0xff_ff_ff;

pub type Handler =
    fn(ServerConn) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'static>>;

pub struct MockServer {
    addr: SocketAddr,
}

impl MockServer {
    /// The stock server: native-password handshake, then the command loop.
    pub async fn spawn() -> io::Result<MockServer> {
        Self::spawn_with(|mut conn| {
            Box::pin(async move {
                conn.handshake("mysql_native_password").await?;
                conn.serve_commands().await
            })
        })
        .await
    }

    /// Serve every accepted connection with `handler`.
    pub async fn spawn_with(handler: Handler) -> io::Result<MockServer> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handler(ServerConn::new(stream)));
            }
        });

        Ok(MockServer { addr })
    }

    pub fn options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host("127.0.0.1")
            .port(self.addr.port())
            .username("root")
            .password(PASSWORD)
    }
}

/// The server side of one connection, with packet framing helpers.
pub struct ServerConn {
    stream: TcpStream,
    seq: u8,
}

impl ServerConn {
    fn new(stream: TcpStream) -> Self {
        Self { stream, seq: 0 }
    }

    pub async fn send_packet(&mut self, payload: &[u8]) -> io::Result<()> {
        let mut rest = payload;

        loop {
            let frame_len = rest.len().min(MAX_FRAME);
            let (frame, tail) = rest.split_at(frame_len);

            let mut header = (frame_len as u32).to_le_bytes();
            header[3] = self.seq;
            self.seq = self.seq.wrapping_add(1);

            self.stream.write_all(&header).await?;
            self.stream.write_all(frame).await?;

            rest = tail;

            if frame_len < MAX_FRAME {
                return Ok(());
            }
        }
    }

    pub async fn recv_packet(&mut self) -> io::Result<Vec<u8>> {
        let mut header = [0_u8; 4];
        self.stream.read_exact(&mut header).await?;

        let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
        assert!(len < MAX_FRAME, "mock server does not reassemble client packets");

        self.seq = header[3].wrapping_add(1);

        let mut payload = vec![0; len];
        self.stream.read_exact(&mut payload).await?;

        Ok(payload)
    }

    /// Send the v10 greeting and consume (and check) the handshake
    /// response. Returns the client's auth response bytes.
    pub async fn handshake(&mut self, auth_plugin: &str) -> io::Result<Vec<u8>> {
        self.send_packet(&greeting(auth_plugin)).await?;

        let response = self.recv_packet().await?;
        let auth_response = parse_auth_response(&response);

        if auth_plugin == "mysql_native_password" {
            assert_eq!(
                auth_response,
                native_scramble(PASSWORD, &[SCRAMBLE_1, SCRAMBLE_2]),
                "client sent a bad native-password scramble"
            );

            self.send_ok(0, 0, AUTOCOMMIT, 0, "").await?;
        }

        Ok(auth_response)
    }

    pub async fn send_ok(
        &mut self,
        affected_rows: u64,
        last_insert_id: u64,
        status: u16,
        warnings: u16,
        info: &str,
    ) -> io::Result<()> {
        let mut payload = vec![0x00];
        put_lenenc(&mut payload, affected_rows);
        put_lenenc(&mut payload, last_insert_id);
        payload.extend_from_slice(&status.to_le_bytes());
        payload.extend_from_slice(&warnings.to_le_bytes());
        payload.extend_from_slice(info.as_bytes());

        self.send_packet(&payload).await
    }

    /// The OK-in-EOF-position packet that ends a row stream under
    /// `DEPRECATE_EOF`.
    pub async fn send_eof_ok(&mut self, status: u16) -> io::Result<()> {
        let mut payload = vec![0xfe, 0x00, 0x00];
        payload.extend_from_slice(&status.to_le_bytes());
        payload.extend_from_slice(&0_u16.to_le_bytes());

        self.send_packet(&payload).await
    }

    pub async fn send_err(&mut self, code: u16, sql_state: &str, message: &str) -> io::Result<()> {
        let mut payload = vec![0xff];
        payload.extend_from_slice(&code.to_le_bytes());
        payload.push(b'#');
        payload.extend_from_slice(sql_state.as_bytes());
        payload.extend_from_slice(message.as_bytes());

        self.send_packet(&payload).await
    }

    pub async fn send_column(
        &mut self,
        name: &str,
        type_byte: u8,
        charset: u16,
        flags: u16,
    ) -> io::Result<()> {
        let mut payload = Vec::new();

        for part in ["def", "app", "users", "users", name, name] {
            put_lenenc(&mut payload, part.len() as u64);
            payload.extend_from_slice(part.as_bytes());
        }

        payload.push(0x0c);
        payload.extend_from_slice(&charset.to_le_bytes());
        payload.extend_from_slice(&64_u32.to_le_bytes());
        payload.push(type_byte);
        payload.extend_from_slice(&flags.to_le_bytes());
        payload.push(0);
        payload.extend_from_slice(&[0, 0]); // filler

        self.send_packet(&payload).await
    }

    pub async fn send_text_row(&mut self, values: &[Option<&[u8]>]) -> io::Result<()> {
        let mut payload = Vec::new();

        for value in values {
            match value {
                None => payload.push(0xfb),
                Some(value) => {
                    put_lenenc(&mut payload, value.len() as u64);
                    payload.extend_from_slice(value);
                }
            }
        }

        self.send_packet(&payload).await
    }

    /// Answer commands until the peer quits or disconnects.
    pub async fn serve_commands(&mut self) -> io::Result<()> {
        loop {
            let command = match self.recv_packet().await {
                Ok(command) => command,
                Err(_) => return Ok(()),
            };

            match command.first().copied() {
                // COM_QUIT
                Some(0x01) => return Ok(()),

                // COM_PING / COM_RESET_CONNECTION
                Some(0x0e) | Some(0x1f) => self.send_ok(0, 0, AUTOCOMMIT, 0, "").await?,

                // COM_QUERY
                Some(0x03) => {
                    let sql = String::from_utf8_lossy(&command[1..]).into_owned();
                    self.handle_query(&sql).await?;
                }

                // COM_STMT_PREPARE
                Some(0x16) => {
                    let sql = String::from_utf8_lossy(&command[1..]).into_owned();
                    self.handle_prepare(&sql).await?;
                }

                // COM_STMT_EXECUTE
                Some(0x17) => {
                    assert_eq!(&command[1..5], &7_u32.to_le_bytes());
                    self.handle_execute().await?;
                }

                // COM_STMT_CLOSE has no reply
                Some(0x19) => {}

                _ => self.send_err(1047, "08S01", "Unknown command").await?,
            }
        }
    }

    async fn handle_query(&mut self, sql: &str) -> io::Result<()> {
        match sql {
            "SELECT 1" => {
                self.send_packet(&[0x01]).await?;
                self.send_column("1", 0x08, 63, 0x0081).await?;
                self.send_text_row(&[Some(b"1")]).await?;
                self.send_eof_ok(AUTOCOMMIT).await
            }

            "SELECT id, name FROM users" => {
                self.send_users_metadata().await?;
                self.send_text_row(&[Some(b"1"), Some(b"alice")]).await?;
                self.send_text_row(&[Some(b"2"), None]).await?;
                self.send_eof_ok(AUTOCOMMIT).await
            }

            "CALL multi()" => {
                self.send_packet(&[0x01]).await?;
                self.send_column("a", 0x08, 63, 0x0081).await?;
                self.send_text_row(&[Some(b"1")]).await?;
                self.send_eof_ok(AUTOCOMMIT | MORE_RESULTS).await?;

                self.send_packet(&[0x01]).await?;
                self.send_column("b", 0x08, 63, 0x0081).await?;
                self.send_text_row(&[Some(b"2")]).await?;
                self.send_text_row(&[Some(b"3")]).await?;
                self.send_eof_ok(AUTOCOMMIT).await
            }

            "SELECT big" => {
                // a row payload larger than one frame, to force reassembly
                self.send_packet(&[0x01]).await?;
                self.send_column("big", 0xfc, 63, 0x0090).await?;

                let big = vec![b'x'; MAX_FRAME + 100];
                let mut row = Vec::with_capacity(big.len() + 9);
                put_lenenc(&mut row, big.len() as u64);
                row.extend_from_slice(&big);

                self.send_packet(&row).await?;
                self.send_eof_ok(AUTOCOMMIT).await
            }

            "SELECT missing FROM nowhere" => {
                self.send_err(1049, "42000", "Unknown database 'a'").await
            }

            _ => {
                self.send_ok(4, 0, AUTOCOMMIT, 0, "Rows matched: 5  Changed: 4  Warnings: 0")
                    .await
            }
        }
    }

    async fn handle_prepare(&mut self, sql: &str) -> io::Result<()> {
        let params = sql.matches('?').count() as u16;

        let mut payload = vec![0x00];
        payload.extend_from_slice(&7_u32.to_le_bytes());
        payload.extend_from_slice(&2_u16.to_le_bytes()); // columns
        payload.extend_from_slice(&params.to_le_bytes());
        payload.push(0);
        payload.extend_from_slice(&0_u16.to_le_bytes()); // warnings
        self.send_packet(&payload).await?;

        for _ in 0..params {
            self.send_column("?", 0xfd, 63, 0x0080).await?;
        }

        self.send_column("id", 0x08, 63, 0x0003).await?;
        self.send_column("name", 0xfd, 45, 0x0000).await?;

        Ok(())
    }

    async fn handle_execute(&mut self) -> io::Result<()> {
        self.send_users_metadata().await?;

        // id = 1, name = "alice"
        let mut row = vec![0x00, 0x00];
        row.extend_from_slice(&1_u64.to_le_bytes());
        put_lenenc(&mut row, 5);
        row.extend_from_slice(b"alice");
        self.send_packet(&row).await?;

        // id = 2, name = NULL (bit 3 of the bitmap)
        let mut row = vec![0x00, 0x08];
        row.extend_from_slice(&2_u64.to_le_bytes());
        self.send_packet(&row).await?;

        self.send_eof_ok(AUTOCOMMIT).await
    }

    async fn send_users_metadata(&mut self) -> io::Result<()> {
        self.send_packet(&[0x02]).await?;
        self.send_column("id", 0x08, 63, 0x0003).await?;
        self.send_column("name", 0xfd, 45, 0x0000).await
    }
}

fn greeting(auth_plugin: &str) -> Vec<u8> {
    let mut payload = vec![10];
    payload.extend_from_slice(b"8.0.36-mock\0");
    payload.extend_from_slice(&99_u32.to_le_bytes());
    payload.extend_from_slice(SCRAMBLE_1);
    payload.push(0);

    payload.extend_from_slice(&(SERVER_CAPABILITIES as u16).to_le_bytes());
    payload.push(45);
    payload.extend_from_slice(&AUTOCOMMIT.to_le_bytes());
    payload.extend_from_slice(&((SERVER_CAPABILITIES >> 16) as u16).to_le_bytes());
    payload.push(21);
    payload.extend_from_slice(&[0; 10]);
    payload.extend_from_slice(SCRAMBLE_2);
    payload.push(0);
    payload.extend_from_slice(auth_plugin.as_bytes());
    payload.push(0);

    payload
}

// fixed fields, then the NUL-terminated username, then the length-prefixed
// auth response (PLUGIN_AUTH_LENENC_DATA is always negotiated here)
fn parse_auth_response(response: &[u8]) -> Vec<u8> {
    let after_fixed = &response[4 + 4 + 1 + 23..];

    let nul = after_fixed
        .iter()
        .position(|&b| b == 0)
        .expect("username is NUL-terminated");

    assert_eq!(&after_fixed[..nul], b"root");

    let auth = &after_fixed[nul + 1..];
    let len = auth[0] as usize;
    assert!(len < 0xfb, "auth response fits a 1-byte length");

    auth[1..1 + len].to_vec()
}

/// The scramble as the server computes it from its stored
/// `SHA1(SHA1(password))`.
pub fn native_scramble(password: &str, seed_parts: &[&[u8]]) -> Vec<u8> {
    let pw_hash = Sha1::digest(password);
    let stored = Sha1::digest(pw_hash);

    let mut ctx = Sha1::new();
    for part in seed_parts {
        ctx.update(part);
    }
    ctx.update(stored);

    let mut scramble = ctx.finalize();

    for (byte, pw) in scramble.iter_mut().zip(pw_hash.iter()) {
        *byte ^= pw;
    }

    scramble.to_vec()
}

fn put_lenenc(buf: &mut Vec<u8>, value: u64) {
    if value < 0xfb {
        buf.push(value as u8);
    } else if value < 0x1_00_00 {
        buf.push(0xfc);
        buf.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value < 0x1_00_00_00 {
        buf.push(0xfd);
        buf.extend_from_slice(&(value as u32).to_le_bytes()[..3]);
    } else {
        buf.push(0xfe);
        buf.extend_from_slice(&value.to_le_bytes());
    }
}
