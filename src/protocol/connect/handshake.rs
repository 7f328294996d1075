use bytes::buf::Chain;
use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode};
use crate::protocol::auth::AuthPlugin;
use crate::protocol::response::Status;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/connection-phase-packets.html#packet-Protocol::Handshake
// https://mariadb.com/kb/en/connection/#initial-handshake-packet

/// The initial greeting the server sends after the TCP connection opens:
/// its version, capabilities, and the 20-byte authentication challenge
/// split into an 8-byte and a 12-byte part.
#[derive(Debug)]
pub(crate) struct Handshake {
    pub(crate) server_version: String,
    #[allow(unused)]
    pub(crate) connection_id: u32,
    pub(crate) server_capabilities: Capabilities,
    #[allow(unused)]
    pub(crate) server_default_collation: u8,
    #[allow(unused)]
    pub(crate) status: Status,
    pub(crate) auth_plugin: Option<AuthPlugin>,
    pub(crate) auth_plugin_data: Chain<Bytes, Bytes>,
}

impl ProtocolDecode<'_> for Handshake {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let protocol_version = buf.read_u8()?;
        if protocol_version != 10 {
            return Err(Error::ServerVersion(protocol_version));
        }

        let server_version = buf.get_str_nul()?;
        let connection_id = buf.read_u32_le()?;

        let auth_plugin_data_1 = buf.get_bytes(8)?;
        buf.skip(1)?; // filler, always 0x00

        let capabilities_lo = buf.read_u16_le()?;
        let server_default_collation = buf.read_u8()?;
        let status = Status::from_bits_truncate(buf.read_u16_le()?);
        let capabilities_hi = buf.read_u16_le()?;

        let server_capabilities = Capabilities::from_bits_truncate(
            u64::from(capabilities_lo) | (u64::from(capabilities_hi) << 16),
        );

        // only meaningful with PLUGIN_AUTH, 0x00 otherwise
        let auth_plugin_data_len = buf.read_u8()?;

        buf.skip(10)?; // reserved, all 0x00

        let auth_plugin_data_2 = if server_capabilities.contains(Capabilities::SECURE_CONNECTION) {
            // at least 13 bytes, NUL-padded; the challenge itself is at
            // least 12 bytes
            let len = usize::max(13, usize::from(auth_plugin_data_len.saturating_sub(8)));
            let mut data = buf.get_bytes(len)?;

            if data.last() == Some(&0) {
                data.truncate(data.len() - 1);
            }

            data
        } else {
            Bytes::new()
        };

        let auth_plugin = if server_capabilities.contains(Capabilities::PLUGIN_AUTH) {
            // some servers omit the final NUL terminator of the name
            let name = match memchr::memchr(b'\0', &buf) {
                Some(_) => buf.get_str_nul()?,
                None => buf.get_str_eof()?,
            };

            Some(name.parse()?)
        } else {
            None
        };

        Ok(Self {
            server_version,
            connection_id,
            server_capabilities,
            server_default_collation,
            status,
            auth_plugin,
            auth_plugin_data: auth_plugin_data_1.chain(auth_plugin_data_2),
        })
    }
}
