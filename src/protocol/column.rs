use bytes::Bytes;

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode};

// https://dev.mysql.com/doc/internals/en/com-query-response.html#packet-Protocol::ColumnDefinition
// https://mariadb.com/kb/en/result-set-packets/#column-definition-packet

/// The protocol type of a column, as sent in column metadata and in the
/// parameter type block of a statement execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColumnType {
    Decimal = 0x00,
    Tiny = 0x01,
    Short = 0x02,
    Long = 0x03,
    Float = 0x04,
    Double = 0x05,
    Null = 0x06,
    Timestamp = 0x07,
    LongLong = 0x08,
    Int24 = 0x09,
    Date = 0x0a,
    Time = 0x0b,
    Datetime = 0x0c,
    Year = 0x0d,
    VarChar = 0x0f,
    Bit = 0x10,
    Json = 0xf5,
    NewDecimal = 0xf6,
    Enum = 0xf7,
    Set = 0xf8,
    TinyBlob = 0xf9,
    MediumBlob = 0xfa,
    LongBlob = 0xfb,
    Blob = 0xfc,
    VarString = 0xfd,
    String = 0xfe,
    Geometry = 0xff,
}

impl ColumnType {
    pub(crate) fn try_from_u16(id: u16) -> Result<Self, Error> {
        Ok(match id {
            0x00 => ColumnType::Decimal,
            0x01 => ColumnType::Tiny,
            0x02 => ColumnType::Short,
            0x03 => ColumnType::Long,
            0x04 => ColumnType::Float,
            0x05 => ColumnType::Double,
            0x06 => ColumnType::Null,
            0x07 => ColumnType::Timestamp,
            0x08 => ColumnType::LongLong,
            0x09 => ColumnType::Int24,
            0x0a => ColumnType::Date,
            0x0b => ColumnType::Time,
            0x0c => ColumnType::Datetime,
            0x0d => ColumnType::Year,
            0x0f => ColumnType::VarChar,
            0x10 => ColumnType::Bit,
            0xf5 => ColumnType::Json,
            0xf6 => ColumnType::NewDecimal,
            0xf7 => ColumnType::Enum,
            0xf8 => ColumnType::Set,
            0xf9 => ColumnType::TinyBlob,
            0xfa => ColumnType::MediumBlob,
            0xfb => ColumnType::LongBlob,
            0xfc => ColumnType::Blob,
            0xfd => ColumnType::VarString,
            0xfe => ColumnType::String,
            0xff => ColumnType::Geometry,
            _ => return Err(err_protocol!("unknown column type 0x{id:02x}")),
        })
    }
}

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/group__group__cs__column__definition__flags.html
bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ColumnFlags: u16 {
        /// Field cannot be NULL.
        const NOT_NULL = 1;

        /// Field is part of a primary key.
        const PRIMARY_KEY = 2;

        /// Field is part of a unique key.
        const UNIQUE_KEY = 4;

        /// Field is part of a non-unique key.
        const MULTIPLE_KEY = 8;

        /// Field is a blob.
        const BLOB = 16;

        /// Field is unsigned.
        const UNSIGNED = 32;

        /// Field is zero-filled.
        const ZEROFILL = 64;

        /// Field has a binary collation.
        const BINARY = 128;

        /// Field is an enumeration.
        const ENUM = 256;

        /// Field auto-increments.
        const AUTO_INCREMENT = 512;

        /// Field is a timestamp.
        const TIMESTAMP = 1024;

        /// Field is a set.
        const SET = 2048;

        /// Field has no default value.
        const NO_DEFAULT_VALUE = 4096;

        /// Field is part of some key.
        const PART_KEY = 16384;
    }
}

/// Describes one column of a result set or one statement parameter.
///
/// Trailing bytes after the fixed fields are permitted for forward
/// compatibility.
#[derive(Debug)]
pub(crate) struct ColumnDefinition {
    pub(crate) schema: Bytes,
    pub(crate) table: Bytes,
    pub(crate) org_table: Bytes,
    pub(crate) name: Bytes,
    pub(crate) org_name: Bytes,
    pub(crate) collation: u16,
    pub(crate) length: u32,
    pub(crate) r#type: ColumnType,
    pub(crate) flags: ColumnFlags,
    pub(crate) decimals: u8,
}

impl ProtocolDecode<'_> for ColumnDefinition {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let catalog = buf.get_bytes_lenenc()?;

        // the catalog is always "def"
        if &catalog[..] != b"def" {
            return Err(err_protocol!("expected column catalog \"def\" but found {catalog:?}"));
        }

        let schema = buf.get_bytes_lenenc()?;
        let table = buf.get_bytes_lenenc()?;
        let org_table = buf.get_bytes_lenenc()?;
        let name = buf.get_bytes_lenenc()?;
        let org_name = buf.get_bytes_lenenc()?;

        // the length of the fixed fields that follow, always at least 0x0c
        let fixed_len = buf.get_uint_lenenc()?;
        if fixed_len < 0x0c {
            return Err(err_protocol!("column fixed-fields length {fixed_len} is below 0x0c"));
        }

        let collation = buf.read_u16_le()?;
        let length = buf.read_u32_le()?;
        let r#type = ColumnType::try_from_u16(u16::from(buf.read_u8()?))?;
        let flags = ColumnFlags::from_bits_truncate(buf.read_u16_le()?);
        let decimals = buf.read_u8()?;

        Ok(Self {
            schema,
            table,
            org_table,
            name,
            org_name,
            collation,
            length,
            r#type,
            flags,
            decimals,
        })
    }
}
