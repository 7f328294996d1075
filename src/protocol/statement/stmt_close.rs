use crate::error::Error;
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/com-stmt-close.html

/// Deallocates a prepared statement on the server. The server sends no
/// reply.
#[derive(Debug)]
pub(crate) struct ComStmtClose {
    pub(crate) statement_id: u32,
}

impl ProtocolEncode<'_, Capabilities> for ComStmtClose {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(0x19); // COM_STMT_CLOSE
        buf.extend_from_slice(&self.statement_id.to_le_bytes());
        Ok(())
    }
}
