use std::collections::VecDeque;

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{Error, MySqlDatabaseError};
use crate::io::{BufExt, ProtocolDecode, ProtocolEncode};
use crate::net::{BufferedSocket, NullSocket, Socket, TlsUpgrade, WriteBuffer};
use crate::options::MySqlConnectOptions;
use crate::protocol::connect::SslRequest;
use crate::protocol::response::{EofPacket, ErrPacket, OkPacket, Status};
use crate::protocol::{Capabilities, Packet, MAX_FRAME_SIZE};

/// Max size of a command packet the client announces it may send.
pub(crate) const MAX_PACKET_SIZE: u32 = 0xff_ff_ff;

/// The per-connection channel: owns the socket and its buffers, the frame
/// sequence id, and the capabilities negotiated during the handshake.
///
/// MySQL is strictly request/reply, so at most one exchange is in flight;
/// `waiting` remembers what the server still owes us when a result stream
/// is abandoned mid-way.
pub(crate) struct MySqlStream {
    pub(crate) socket: BufferedSocket<Box<dyn Socket>>,
    pub(crate) capabilities: Capabilities,
    pub(crate) sequence_id: u8,
    pub(crate) waiting: VecDeque<Waiting>,
    pub(crate) server_version: (u16, u16, u16),
    pub(crate) status: Status,
    is_unix_socket: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Waiting {
    // waiting for the head of a result set
    Result,

    // waiting for a row within a result set
    Row,
}

impl MySqlStream {
    pub(crate) fn new(
        options: &MySqlConnectOptions,
        socket: Box<dyn Socket>,
        is_unix_socket: bool,
    ) -> Self {
        let mut capabilities = Capabilities::LONG_PASSWORD
            | Capabilities::LONG_FLAG
            | Capabilities::PROTOCOL_41
            | Capabilities::TRANSACTIONS
            | Capabilities::SECURE_CONNECTION
            | Capabilities::PLUGIN_AUTH
            | Capabilities::PLUGIN_AUTH_LENENC_DATA
            | Capabilities::DEPRECATE_EOF
            | Capabilities::MULTI_RESULTS
            | Capabilities::PS_MULTI_RESULTS;

        if options.database.is_some() {
            capabilities |= Capabilities::CONNECT_WITH_DB;
        }

        Self {
            socket: BufferedSocket::new(socket),
            capabilities,
            sequence_id: 0,
            waiting: VecDeque::new(),
            server_version: (0, 0, 0),
            status: Status::empty(),
            is_unix_socket,
        }
    }

    pub(crate) fn is_tls(&self) -> bool {
        self.socket.socket().is_tls()
    }

    /// A channel over which a cleartext credential may travel.
    pub(crate) fn is_secure(&self) -> bool {
        self.is_unix_socket || self.is_tls()
    }

    pub(crate) fn write_buffer(&self) -> &WriteBuffer {
        self.socket.write_buffer()
    }

    /// Send the SSL request half-packet and swap the underlying stream for
    /// its TLS-wrapped replacement.
    pub(crate) async fn upgrade_tls(
        &mut self,
        tls: &dyn TlsUpgrade,
        host: &str,
        collation: u8,
    ) -> Result<(), Error> {
        self.write_packet(SslRequest {
            max_packet_size: MAX_PACKET_SIZE,
            collation,
        })?;
        self.socket.flush().await?;

        let plain = self.socket.replace_socket(Box::new(NullSocket));

        match tls.upgrade(plain, host.to_owned()).await {
            Ok(encrypted) => {
                self.socket.replace_socket(encrypted);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Begin a client command: the sequence id restarts at 0.
    pub(crate) async fn send_packet<'en, T>(&mut self, payload: T) -> Result<(), Error>
    where
        T: ProtocolEncode<'en, Capabilities>,
    {
        self.sequence_id = 0;
        self.write_packet(payload)?;
        self.flush().await
    }

    pub(crate) fn write_packet<'en, T>(&mut self, payload: T) -> Result<(), Error>
    where
        T: ProtocolEncode<'en, Capabilities>,
    {
        self.socket
            .write_with(Packet(payload), (self.capabilities, &mut self.sequence_id))
    }

    pub(crate) async fn flush(&mut self) -> Result<(), Error> {
        self.socket.flush().await?;
        Ok(())
    }

    async fn recv_frame(&mut self) -> Result<Bytes, Error> {
        let mut header = self.socket.read_buffered(4).await?;

        #[allow(clippy::cast_possible_truncation)]
        let frame_len = header.get_uint_le(3) as usize;
        let sequence_id = header.get_u8();

        if sequence_id != self.sequence_id {
            return Err(Error::SequenceNumberMismatch {
                expected: self.sequence_id,
                got: sequence_id,
            });
        }

        self.sequence_id = self.sequence_id.wrapping_add(1);

        Ok(self.socket.read_buffered(frame_len).await?.freeze())
    }

    /// Receive one logical message, reassembling it if it spans frames.
    pub(crate) async fn recv_packet(&mut self) -> Result<Packet<Bytes>, Error> {
        let frame = self.recv_frame().await?;

        let payload = if frame.len() < MAX_FRAME_SIZE {
            frame
        } else {
            let mut message = BytesMut::with_capacity(frame.len() * 2);
            message.extend_from_slice(&frame);
            drop(frame);

            loop {
                let frame = self.recv_frame().await?;
                let frame_len = frame.len();
                message.extend_from_slice(&frame);

                if frame_len < MAX_FRAME_SIZE {
                    break;
                }
            }

            message.freeze()
        };

        log::trace!("read  > packet of {} bytes", payload.len());

        match payload.first().copied() {
            None => Err(err_protocol!("received an empty packet")),

            // an 0xff first byte is an ERR packet in every state; surface it
            // here so no caller has to look for it
            Some(0xff) => {
                self.waiting.pop_front();

                let mut body = payload;
                body.advance(1);

                Err(MySqlDatabaseError::from(ErrPacket::decode_with(body, self.capabilities)?)
                    .into())
            }

            Some(_) => Ok(Packet(payload)),
        }
    }

    pub(crate) async fn recv<'de, T>(&mut self) -> Result<T, Error>
    where
        T: ProtocolDecode<'de, Capabilities>,
    {
        let capabilities = self.capabilities;
        self.recv_packet().await?.decode_with(capabilities)
    }

    pub(crate) async fn recv_ok(&mut self) -> Result<OkPacket, Error> {
        let ok = self.recv_packet().await?.ok(self.capabilities)?;
        self.status = ok.status;
        Ok(ok)
    }

    /// Read and discard the EOF packet that closes a metadata block, unless
    /// EOF packets were deprecated away.
    pub(crate) async fn maybe_recv_eof(&mut self) -> Result<Option<EofPacket>, Error> {
        if self.capabilities.contains(Capabilities::DEPRECATE_EOF) {
            Ok(None)
        } else {
            let eof = self.recv_packet().await?.eof(self.capabilities)?;
            Ok(Some(eof))
        }
    }

    /// Whether this packet terminates a row stream.
    ///
    /// A legacy EOF is an 0xfe packet shorter than 9 bytes. With
    /// `DEPRECATE_EOF` the terminator is an OK packet tagged 0xfe, told apart
    /// from a row by its length: a row whose first value is 8-byte
    /// length-encoded cannot fit in a single frame.
    pub(crate) fn is_row_terminator(&self, packet: &Packet<Bytes>) -> bool {
        packet.first() == Some(&0xfe)
            && if self.capabilities.contains(Capabilities::DEPRECATE_EOF) {
                packet.len() < MAX_FRAME_SIZE
            } else {
                packet.len() < 9
            }
    }

    /// Drain whatever replies are still owed from an abandoned result
    /// stream, then flush any buffered writes. Called before each command.
    pub(crate) async fn wait_until_ready(&mut self) -> Result<(), Error> {
        if !self.socket.write_buffer().is_empty() {
            self.socket.flush().await?;
        }

        while !self.waiting.is_empty() {
            while self.waiting.front() == Some(&Waiting::Row) {
                let packet = self.recv_packet().await?;

                if self.is_row_terminator(&packet) {
                    let eof = packet.eof(self.capabilities)?;
                    self.status = eof.status;

                    if eof.status.contains(Status::SERVER_MORE_RESULTS_EXISTS) {
                        *self.waiting.front_mut().unwrap() = Waiting::Result;
                    } else {
                        self.waiting.pop_front();
                    }
                }
            }

            while self.waiting.front() == Some(&Waiting::Result) {
                let packet = self.recv_packet().await?;

                if packet.first() == Some(&0x00) {
                    let ok = packet.ok(self.capabilities)?;
                    self.status = ok.status;

                    if !ok.status.contains(Status::SERVER_MORE_RESULTS_EXISTS) {
                        self.waiting.pop_front();
                    }
                } else {
                    *self.waiting.front_mut().unwrap() = Waiting::Row;
                    self.skip_result_metadata(packet).await?;
                }
            }
        }

        Ok(())
    }

    async fn skip_result_metadata(&mut self, packet: Packet<Bytes>) -> Result<(), Error> {
        let mut head = packet.0;
        let columns = head.get_uint_lenenc()?;

        for _ in 0..columns {
            let _ = self.recv_packet().await?;
        }

        self.maybe_recv_eof().await?;

        Ok(())
    }

    pub(crate) async fn shutdown(&mut self) -> Result<(), Error> {
        self.socket.shutdown().await?;
        Ok(())
    }

    pub(crate) fn shrink_buffers(&mut self) {
        self.socket.shrink_buffers();
    }
}
