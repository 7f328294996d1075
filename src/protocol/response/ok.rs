use bytes::Bytes;

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode};
use crate::protocol::response::Status;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/packet-OK_Packet.html
// https://mariadb.com/kb/en/ok_packet/

/// Signals successful completion of a command.
///
/// Decodes the packet body *after* its 0x00 tag; the tag is examined by the
/// dispatching caller, which also accepts 0xfe here since an OK packet
/// replaces the EOF packet when `DEPRECATE_EOF` is negotiated.
#[derive(Debug)]
pub(crate) struct OkPacket {
    pub(crate) affected_rows: u64,
    pub(crate) last_insert_id: u64,
    pub(crate) status: Status,
    pub(crate) warnings: u16,

    // human-readable status information
    pub(crate) info: String,
}

impl ProtocolDecode<'_, Capabilities> for OkPacket {
    fn decode_with(mut buf: Bytes, capabilities: Capabilities) -> Result<Self, Error> {
        let affected_rows = buf.get_uint_lenenc()?;
        let last_insert_id = buf.get_uint_lenenc()?;

        let status = if capabilities.intersects(Capabilities::PROTOCOL_41 | Capabilities::TRANSACTIONS) {
            Status::from_bits_truncate(buf.read_u16_le()?)
        } else {
            Status::empty()
        };

        let warnings = if capabilities.contains(Capabilities::PROTOCOL_41) {
            buf.read_u16_le()?
        } else {
            0
        };

        let info = if buf.is_empty() {
            String::new()
        } else if capabilities.contains(Capabilities::SESSION_TRACK) {
            // with SESSION_TRACK the info comes down as string<lenenc>,
            // optionally followed by session state change data
            let info = buf.get_str_lenenc()?;

            if status.contains(Status::SERVER_SESSION_STATE_CHANGED) {
                let _ = buf.get_bytes_eof();
            } else if !buf.is_empty() {
                return Err(Error::ExtraBytes);
            }

            info
        } else {
            // otherwise the info is sent as string<EOF>
            buf.get_str_eof()?
        };

        Ok(Self {
            affected_rows,
            last_insert_id,
            status,
            warnings,
            info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPABILITIES: Capabilities = Capabilities::PROTOCOL_41
        .union(Capabilities::TRANSACTIONS)
        .union(Capabilities::SESSION_TRACK);

    #[test]
    fn decodes_successful_update() {
        const DATA: &[u8] = b"\x04\x00\x22\x00\x00\x00\x28Rows matched: 5  Changed: 4  Warnings: 0";

        let ok = OkPacket::decode_with(DATA.into(), CAPABILITIES).unwrap();

        assert_eq!(ok.affected_rows, 4);
        assert_eq!(ok.last_insert_id, 0);
        assert_eq!(ok.status.bits(), 0x0022);
        assert_eq!(ok.warnings, 0);
        assert_eq!(ok.info, "Rows matched: 5  Changed: 4  Warnings: 0");
    }

    #[test]
    fn decodes_successful_insert() {
        const DATA: &[u8] = b"\x01\x06\x02\x00\x00\x00";

        let ok = OkPacket::decode_with(DATA.into(), CAPABILITIES).unwrap();

        assert_eq!(ok.affected_rows, 1);
        assert_eq!(ok.last_insert_id, 6);
        assert_eq!(ok.status, Status::SERVER_STATUS_AUTOCOMMIT);
        assert_eq!(ok.warnings, 0);
        assert_eq!(ok.info, "");
    }

    #[test]
    fn truncations_are_incomplete() {
        const DATA: &[u8] = b"\x04\x00\x22\x00\x00\x00\x28Rows";

        // every proper prefix must fail with IncompleteMessage, except the
        // six fixed bytes alone, which form a complete OK with empty info
        for end in (0..DATA.len()).filter(|&end| end != 6) {
            let err = OkPacket::decode_with(Bytes::copy_from_slice(&DATA[..end]), CAPABILITIES)
                .unwrap_err();

            assert!(
                matches!(err, Error::IncompleteMessage),
                "prefix of {end} bytes: {err:?}"
            );
        }
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        const DATA: &[u8] = b"\x01\x06\x02\x00\x00\x00\x01\x00\x00";

        let err = OkPacket::decode_with(DATA.into(), CAPABILITIES).unwrap_err();

        assert!(matches!(err, Error::ExtraBytes));
    }
}
