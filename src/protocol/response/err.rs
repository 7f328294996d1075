use bytes::Bytes;

use crate::error::{Error, MySqlDatabaseError};
use crate::io::{BufExt, ProtocolDecode};
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/packet-ERR_Packet.html
// https://mariadb.com/kb/en/err_packet/

/// An error reported by the server.
///
/// Decodes the packet body after its 0xff tag; a leading 0xff always means
/// an ERR packet, in every protocol state.
#[derive(Debug)]
pub(crate) struct ErrPacket {
    pub(crate) error_code: u16,
    pub(crate) sql_state: Option<String>,
    pub(crate) error_message: String,
}

impl ProtocolDecode<'_, Capabilities> for ErrPacket {
    fn decode_with(mut buf: Bytes, capabilities: Capabilities) -> Result<Self, Error> {
        let error_code = buf.read_u16_le()?;

        let sql_state = if capabilities.contains(Capabilities::PROTOCOL_41)
            && buf.first() == Some(&b'#')
        {
            // a '#' marks the five-character SQLSTATE
            buf.skip(1)?;
            Some(buf.get_str(5)?)
        } else {
            None
        };

        let error_message = buf.get_str_eof()?;

        Ok(Self {
            error_code,
            sql_state,
            error_message,
        })
    }
}

impl From<ErrPacket> for MySqlDatabaseError {
    fn from(err: ErrPacket) -> Self {
        MySqlDatabaseError::new(err.error_code, err.sql_state, err.error_message)
    }
}
