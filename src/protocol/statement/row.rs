use bytes::Bytes;

use crate::column::MySqlColumn;
use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode};
use crate::protocol::{ColumnType, Row};

// https://dev.mysql.com/doc/internals/en/binary-protocol-resultset-row.html
// https://mariadb.com/kb/en/resultset-row/#binary-resultset-row

/// A row of the binary protocol: a 0x00 header, a NULL bitmap with a two-bit
/// offset, then one type-dependent encoding per non-NULL column.
#[derive(Debug)]
pub(crate) struct BinaryRow(pub(crate) Row);

impl<'de> ProtocolDecode<'de, &'de [MySqlColumn]> for BinaryRow {
    fn decode_with(mut buf: Bytes, columns: &'de [MySqlColumn]) -> Result<Self, Error> {
        let storage = buf.clone();
        let total = buf.len();

        let header = buf.read_u8()?;
        if header != 0 {
            return Err(err_protocol!("expected 0x00 (binary row) but found 0x{header:02x}"));
        }

        // the first two bits of the bitmap are reserved
        let bitmap = buf.get_bytes((columns.len() + 2 + 7) / 8)?;

        let mut values = Vec::with_capacity(columns.len());

        for (index, column) in columns.iter().enumerate() {
            let bit = index + 2;

            if bitmap[bit / 8] & (1 << (bit % 8)) != 0 {
                values.push(None);
                continue;
            }

            let offset = total - buf.len();

            let range = match column.r#type {
                ColumnType::Null => {
                    values.push(None);
                    continue;
                }

                ColumnType::Tiny => {
                    buf.skip(1)?;
                    offset..offset + 1
                }

                ColumnType::Short | ColumnType::Year => {
                    buf.skip(2)?;
                    offset..offset + 2
                }

                ColumnType::Long | ColumnType::Int24 | ColumnType::Float => {
                    buf.skip(4)?;
                    offset..offset + 4
                }

                ColumnType::LongLong | ColumnType::Double => {
                    buf.skip(8)?;
                    offset..offset + 8
                }

                // self-describing, the range keeps the length byte
                ColumnType::Date
                | ColumnType::Time
                | ColumnType::Datetime
                | ColumnType::Timestamp => {
                    let len = buf.read_u8()?;
                    buf.skip(usize::from(len))?;
                    offset..offset + 1 + usize::from(len)
                }

                _ => {
                    let size = usize::try_from(buf.get_uint_lenenc()?)
                        .map_err(|_| err_protocol!("row value length overflows usize"))?;

                    let offset = total - buf.len();
                    buf.skip(size)?;
                    offset..offset + size
                }
            };

            values.push(Some(range));
        }

        Ok(BinaryRow(Row { storage, values }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ColumnDefinition, ColumnFlags};
    use crate::io::ProtocolDecode as _;

    fn column(ordinal: usize, r#type: ColumnType, flags: ColumnFlags) -> MySqlColumn {
        MySqlColumn {
            ordinal,
            name: format!("c{ordinal}"),
            org_name: String::new(),
            table: String::new(),
            org_table: String::new(),
            schema: String::new(),
            collation: 63,
            length: 0,
            r#type,
            flags,
            decimals: 0,
        }
    }

    #[test]
    fn decodes_mixed_row() {
        // bigint 7, NULL, varchar "ab"; the NULL bit for column 1 is bit 3
        const DATA: &[u8] = b"\x00\x08\x07\x00\x00\x00\x00\x00\x00\x00\x02ab";

        let columns = vec![
            column(0, ColumnType::LongLong, ColumnFlags::empty()),
            column(1, ColumnType::VarString, ColumnFlags::empty()),
            column(2, ColumnType::VarString, ColumnFlags::empty()),
        ];

        let row = BinaryRow::decode_with(DATA.into(), &columns).unwrap().0;

        assert_eq!(row.get(0), Some(&b"\x07\x00\x00\x00\x00\x00\x00\x00"[..]));
        assert_eq!(row.get(1), None);
        assert_eq!(row.get(2), Some(&b"ab"[..]));
    }

    #[test]
    fn keeps_length_byte_for_temporals() {
        const DATA: &[u8] = b"\x00\x00\x04\xda\x07\x09\x03";

        let columns = vec![column(0, ColumnType::Date, ColumnFlags::BINARY)];

        let row = BinaryRow::decode_with(DATA.into(), &columns).unwrap().0;

        assert_eq!(row.get(0), Some(&b"\x04\xda\x07\x09\x03"[..]));
    }

    #[test]
    fn truncated_row_is_incomplete() {
        const DATA: &[u8] = b"\x00\x00\x07\x00\x00";

        let columns = vec![column(0, ColumnType::LongLong, ColumnFlags::empty())];

        let err = BinaryRow::decode_with(DATA.into(), &columns).unwrap_err();

        assert!(matches!(err, Error::IncompleteMessage));
    }

    // the test above builds columns directly; make sure definitions convert
    #[test]
    fn column_from_definition() {
        const DATA: &[u8] =
            b"\x03def\x01s\x01t\x01t\x02id\x02id\x0c\x3f\x00\x14\x00\x00\x00\x08\x03\x42\x00\x00\x00\x00";

        let def = ColumnDefinition::decode(DATA.into()).unwrap();
        let column = MySqlColumn::from_definition(3, def).unwrap();

        assert_eq!(column.ordinal(), 3);
        assert_eq!(column.name(), "id");
        assert_eq!(column.r#type(), ColumnType::LongLong);
    }
}
