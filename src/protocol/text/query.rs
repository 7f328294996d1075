use crate::error::Error;
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/com-query.html

#[derive(Debug)]
pub(crate) struct ComQuery<'a> {
    pub(crate) sql: &'a str,
}

impl ProtocolEncode<'_, Capabilities> for ComQuery<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(0x03); // COM_QUERY
        buf.extend_from_slice(self.sql.as_bytes());
        Ok(())
    }
}
