use bytes::Bytes;

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode};
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/com-stmt-prepare-response.html#packet-COM_STMT_PREPARE_OK

#[derive(Debug)]
pub(crate) struct PrepareOk {
    pub(crate) statement_id: u32,
    pub(crate) columns: u16,
    pub(crate) params: u16,
    #[allow(unused)]
    pub(crate) warnings: u16,
}

impl ProtocolDecode<'_, Capabilities> for PrepareOk {
    fn decode_with(mut buf: Bytes, _: Capabilities) -> Result<Self, Error> {
        let status = buf.read_u8()?;
        if status != 0x00 {
            return Err(err_protocol!(
                "expected 0x00 (COM_STMT_PREPARE_OK) but found 0x{status:02x}"
            ));
        }

        let statement_id = buf.read_u32_le()?;
        let columns = buf.read_u16_le()?;
        let params = buf.read_u16_le()?;

        buf.skip(1)?; // reserved: string<1>

        let warnings = buf.read_u16_le()?;

        if !buf.is_empty() {
            return Err(Error::ExtraBytes);
        }

        Ok(Self {
            statement_id,
            columns,
            params,
            warnings,
        })
    }
}
