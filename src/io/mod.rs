mod buf;
mod buf_mut;

pub(crate) use buf::BufExt;
pub(crate) use buf_mut::BufMutExt;

use bytes::Bytes;

use crate::error::Error;

/// A type that can be decoded from a complete message payload, given some
/// decoding context (usually the negotiated capabilities).
pub(crate) trait ProtocolDecode<'de, Context = ()>: Sized {
    fn decode(buf: Bytes) -> Result<Self, Error>
    where
        Self: ProtocolDecode<'de, ()>,
    {
        Self::decode_with(buf, ())
    }

    fn decode_with(buf: Bytes, context: Context) -> Result<Self, Error>;
}

/// A type that can be encoded into a message payload.
///
/// Encoding writes into a growable buffer and can only fail on values that
/// have no wire representation (e.g. an out-of-range `TIME`).
pub(crate) trait ProtocolEncode<'en, Context = ()> {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), Error>
    where
        Self: ProtocolEncode<'en, ()>,
    {
        self.encode_with(buf, ())
    }

    fn encode_with(&self, buf: &mut Vec<u8>, context: Context) -> Result<(), Error>;
}

/// Raw bytes pass through unchanged, e.g. authentication continuations.
impl<'en, C> ProtocolEncode<'en, C> for &'en [u8] {
    fn encode_with(&self, buf: &mut Vec<u8>, _: C) -> Result<(), Error> {
        buf.extend_from_slice(self);
        Ok(())
    }
}
