use crate::error::Error;
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/connection-phase-packets.html#packet-Protocol::SSLRequest

/// The first half of the handshake response, sent alone to request a TLS
/// upgrade before any credentials travel over the wire.
#[derive(Debug)]
pub(crate) struct SslRequest {
    /// Max size of a command packet the client intends to send.
    pub(crate) max_packet_size: u32,

    /// Default collation for the connection.
    pub(crate) collation: u8,
}

impl ProtocolEncode<'_, Capabilities> for SslRequest {
    fn encode_with(&self, buf: &mut Vec<u8>, context: Capabilities) -> Result<(), Error> {
        // only the low 32 bits of the capability set are on the wire
        #[allow(clippy::cast_possible_truncation)]
        buf.extend_from_slice(&(context.bits() as u32).to_le_bytes());
        buf.extend_from_slice(&self.max_packet_size.to_le_bytes());
        buf.push(self.collation);

        // reserved: string<23>
        buf.extend_from_slice(&[0_u8; 23]);

        Ok(())
    }
}
