use crate::error::Error;
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;
use crate::value::MySqlValue;

// https://dev.mysql.com/doc/internals/en/com-stmt-execute.html
// https://mariadb.com/kb/en/com_stmt_execute/

// cursor behavior is always "no cursor"; rows stream back directly
const NO_CURSOR: u8 = 0;

/// Executes a prepared statement with binary-encoded parameters.
#[derive(Debug)]
pub(crate) struct ComStmtExecute<'q> {
    pub(crate) statement_id: u32,
    pub(crate) params: &'q [MySqlValue<'q>],
}

impl ProtocolEncode<'_, Capabilities> for ComStmtExecute<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(0x17); // COM_STMT_EXECUTE
        buf.extend_from_slice(&self.statement_id.to_le_bytes());
        buf.push(NO_CURSOR);

        // number of times to execute the statement; can only be 1
        buf.extend_from_slice(&1_u32.to_le_bytes());

        if self.params.is_empty() {
            return Ok(());
        }

        // NULL bitmap, no bit offset
        let bitmap_offset = buf.len();
        buf.resize(bitmap_offset + (self.params.len() + 7) / 8, 0);

        // new-params-bound flag; types always follow
        buf.push(1);

        for (index, param) in self.params.iter().enumerate() {
            if param.is_null() {
                buf[bitmap_offset + index / 8] |= 1 << (index % 8);
            }

            // the unsigned flag rides the high byte of the type code
            let (r#type, unsigned) = param.param_type();
            buf.push(r#type as u8);
            buf.push(if unsigned { 0x80 } else { 0 });
        }

        for param in self.params {
            param.encode_binary(buf)?;
        }

        Ok(())
    }
}
