use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode};
use crate::protocol::Row;

// https://dev.mysql.com/doc/internals/en/com-query-response.html#packet-ProtocolText::ResultsetRow

/// A row of the text protocol: one length-encoded string per column, with
/// 0xfb marking NULL.
#[derive(Debug)]
pub(crate) struct TextRow(pub(crate) Row);

impl ProtocolDecode<'_, usize> for TextRow {
    fn decode_with(mut buf: Bytes, columns: usize) -> Result<Self, Error> {
        let storage = buf.clone();
        let total = buf.len();

        let mut values = Vec::with_capacity(columns);

        for _ in 0..columns {
            if buf.first() == Some(&0xfb) {
                // NULL is sent as 0xfb
                values.push(None);
                buf.advance(1);
            } else {
                let size = usize::try_from(buf.get_uint_lenenc()?)
                    .map_err(|_| err_protocol!("row value length overflows usize"))?;

                let offset = total - buf.len();
                buf.skip(size)?;

                values.push(Some(offset..offset + size));
            }
        }

        Ok(TextRow(Row { storage, values }))
    }
}
