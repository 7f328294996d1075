use crate::error::Error;
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_reset_connection.html

/// Resets the session state (user variables, temporary tables, prepared
/// statements) without re-authenticating.
#[derive(Debug)]
pub(crate) struct ComResetConnection;

impl ProtocolEncode<'_, Capabilities> for ComResetConnection {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(0x1f); // COM_RESET_CONNECTION
        Ok(())
    }
}
