use bytes::Bytes;

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode};
use crate::protocol::response::Status;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/packet-EOF_Packet.html
// https://mariadb.com/kb/en/eof_packet/

/// Legacy terminator for column metadata and row streams, tagged 0xfe with a
/// body shorter than 9 bytes. When `DEPRECATE_EOF` is negotiated the server
/// sends an OK packet in its place and this struct is built from that.
#[derive(Debug)]
pub(crate) struct EofPacket {
    pub(crate) status: Status,
    pub(crate) warnings: u16,
}

impl ProtocolDecode<'_, Capabilities> for EofPacket {
    fn decode_with(mut buf: Bytes, capabilities: Capabilities) -> Result<Self, Error> {
        let (warnings, status) = if capabilities.contains(Capabilities::PROTOCOL_41) {
            let warnings = buf.read_u16_le()?;
            let status = Status::from_bits_truncate(buf.read_u16_le()?);
            (warnings, status)
        } else {
            (0, Status::empty())
        };

        if !buf.is_empty() {
            return Err(Error::ExtraBytes);
        }

        Ok(Self { status, warnings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_final_eof() {
        const DATA: &[u8] = b"\x00\x00\x02\x00";

        let eof = EofPacket::decode_with(DATA.into(), Capabilities::PROTOCOL_41).unwrap();

        assert_eq!(eof.warnings, 0);
        assert_eq!(eof.status, Status::SERVER_STATUS_AUTOCOMMIT);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        const DATA: &[u8] = b"\x00\x00\x02\x00\x00";

        let err = EofPacket::decode_with(DATA.into(), Capabilities::PROTOCOL_41).unwrap_err();

        assert!(matches!(err, Error::ExtraBytes));
    }

    #[test]
    fn truncation_is_incomplete() {
        const DATA: &[u8] = b"\x00\x00\x02";

        let err = EofPacket::decode_with(DATA.into(), Capabilities::PROTOCOL_41).unwrap_err();

        assert!(matches!(err, Error::IncompleteMessage));
    }
}
