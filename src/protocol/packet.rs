use std::ops::Deref;

use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{ProtocolDecode, ProtocolEncode};
use crate::protocol::response::{EofPacket, OkPacket};
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_basic_packets.html
// https://mariadb.com/kb/en/library/0-packet/#standard-packet

/// The largest payload a single frame can carry. A message at or above this
/// size continues in the next frame; an exact multiple is closed by a
/// zero-length frame.
pub(crate) const MAX_FRAME_SIZE: usize = 0xFF_FF_FF;

/// One logical message, carried over one or more frames of
/// `(3-byte LE length, 1-byte sequence id, payload)`.
#[derive(Debug)]
pub(crate) struct Packet<T>(pub(crate) T);

impl<'en, 's, T> ProtocolEncode<'en, (Capabilities, &'s mut u8)> for Packet<T>
where
    T: ProtocolEncode<'en, Capabilities>,
{
    fn encode_with(
        &self,
        buf: &mut Vec<u8>,
        (capabilities, sequence_id): (Capabilities, &'s mut u8),
    ) -> Result<(), Error> {
        // Reserve a header, encode the payload after it, then patch the
        // header once the length is known.
        let offset = buf.len();
        buf.extend_from_slice(&[0; 4]);

        self.0.encode_with(buf, capabilities)?;

        let len = buf.len() - offset - 4;

        if len < MAX_FRAME_SIZE {
            #[allow(clippy::cast_possible_truncation)]
            let header = (len as u32).to_le_bytes();
            buf[offset..offset + 3].copy_from_slice(&header[..3]);
            buf[offset + 3] = *sequence_id;
            *sequence_id = sequence_id.wrapping_add(1);

            return Ok(());
        }

        // Oversize message: pull the payload back out and re-emit it as a
        // chain of frames.
        let payload = buf.split_off(offset + 4);
        buf.truncate(offset);

        let mut rest = &payload[..];

        loop {
            let frame_len = rest.len().min(MAX_FRAME_SIZE);
            let (frame, tail) = rest.split_at(frame_len);

            #[allow(clippy::cast_possible_truncation)]
            let header = (frame_len as u32).to_le_bytes();
            buf.extend_from_slice(&header[..3]);
            buf.push(*sequence_id);
            *sequence_id = sequence_id.wrapping_add(1);
            buf.extend_from_slice(frame);

            rest = tail;

            // a short frame (or the trailing empty one) ends the message
            if frame_len < MAX_FRAME_SIZE {
                return Ok(());
            }
        }
    }
}

impl Packet<Bytes> {
    #[inline]
    pub(crate) fn decode<'de, T>(self) -> Result<T, Error>
    where
        T: ProtocolDecode<'de, ()>,
    {
        self.decode_with(())
    }

    #[inline]
    pub(crate) fn decode_with<'de, T, C>(self, context: C) -> Result<T, Error>
    where
        T: ProtocolDecode<'de, C>,
    {
        T::decode_with(self.0, context)
    }

    pub(crate) fn ok(self, capabilities: Capabilities) -> Result<OkPacket, Error> {
        let mut body = self.0;

        // in EOF position the OK packet is tagged 0xfe instead of 0x00
        match body.first().copied() {
            Some(0x00 | 0xfe) => {
                body.advance(1);
                OkPacket::decode_with(body, capabilities)
            }
            Some(tag) => Err(err_protocol!("expected 0x00 or 0xfe (OK) but found 0x{tag:02x}")),
            None => Err(Error::IncompleteMessage),
        }
    }

    pub(crate) fn eof(self, capabilities: Capabilities) -> Result<EofPacket, Error> {
        if capabilities.contains(Capabilities::DEPRECATE_EOF) {
            // the server emits an OK packet (with an 0xfe tag) in EOF position
            let ok = self.ok(capabilities)?;

            return Ok(EofPacket {
                status: ok.status,
                warnings: ok.warnings,
            });
        }

        let mut body = self.0;

        match body.first().copied() {
            Some(0xfe) => {
                body.advance(1);
                EofPacket::decode_with(body, capabilities)
            }
            Some(tag) => Err(err_protocol!("expected 0xfe (EOF) but found 0x{tag:02x}")),
            None => Err(Error::IncompleteMessage),
        }
    }
}

impl Deref for Packet<Bytes> {
    type Target = Bytes;

    fn deref(&self) -> &Bytes {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ProtocolEncode;

    fn encode(payload: &[u8], sequence_id: &mut u8) -> Vec<u8> {
        let mut buf = Vec::new();
        Packet(payload)
            .encode_with(&mut buf, (Capabilities::empty(), sequence_id))
            .unwrap();
        buf
    }

    #[test]
    fn frames_a_small_payload() {
        let mut sequence_id = 2;
        let buf = encode(b"\x03SELECT 1", &mut sequence_id);

        assert_eq!(&buf[..4], b"\x09\x00\x00\x02");
        assert_eq!(&buf[4..], b"\x03SELECT 1");
        assert_eq!(sequence_id, 3);
    }

    #[test]
    fn frame_header_bytes_are_little_endian() {
        let mut sequence_id = 0xfa;
        let buf = encode(&vec![0; 0xca_cb_cc], &mut sequence_id);

        assert_eq!(&buf[..4], b"\xcc\xcb\xca\xfa");
        assert_eq!(buf.len(), 4 + 0xca_cb_cc);
        assert_eq!(sequence_id, 0xfb);
    }

    #[test]
    fn splits_an_oversize_payload() {
        let mut sequence_id = 0;
        let buf = encode(&vec![0xab; MAX_FRAME_SIZE + 5], &mut sequence_id);

        assert_eq!(&buf[..4], b"\xff\xff\xff\x00");

        let second = 4 + MAX_FRAME_SIZE;
        assert_eq!(&buf[second..second + 4], b"\x05\x00\x00\x01");
        assert_eq!(buf.len(), second + 4 + 5);
        assert_eq!(sequence_id, 2);
    }

    #[test]
    fn exact_multiple_gets_a_trailing_empty_frame() {
        let mut sequence_id = 0;
        let buf = encode(&vec![0xab; MAX_FRAME_SIZE], &mut sequence_id);

        let second = 4 + MAX_FRAME_SIZE;
        assert_eq!(&buf[second..], b"\x00\x00\x00\x01");
        assert_eq!(sequence_id, 2);
    }
}
