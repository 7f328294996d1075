use crate::error::Error;
use crate::protocol::{ColumnDefinition, ColumnFlags, ColumnType};

/// Metadata for one column of a result set, or one parameter of a prepared
/// statement.
#[derive(Debug, Clone)]
pub struct MySqlColumn {
    pub(crate) ordinal: usize,
    pub(crate) name: String,
    pub(crate) org_name: String,
    pub(crate) table: String,
    pub(crate) org_table: String,
    pub(crate) schema: String,
    pub(crate) collation: u16,
    pub(crate) length: u32,
    pub(crate) r#type: ColumnType,
    pub(crate) flags: ColumnFlags,
    pub(crate) decimals: u8,
}

impl MySqlColumn {
    pub(crate) fn from_definition(ordinal: usize, def: ColumnDefinition) -> Result<Self, Error> {
        // metadata strings are UTF-8 under the connection charset
        let utf8 = |bytes: bytes::Bytes| {
            String::from_utf8(bytes.to_vec()).map_err(|_| Error::InvalidEncoding)
        };

        Ok(Self {
            ordinal,
            name: utf8(def.name)?,
            org_name: utf8(def.org_name)?,
            table: utf8(def.table)?,
            org_table: utf8(def.org_table)?,
            schema: utf8(def.schema)?,
            collation: def.collation,
            length: def.length,
            r#type: def.r#type,
            flags: def.flags,
            decimals: def.decimals,
        })
    }

    /// Position of this column in its result set, starting at 0.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// The column's label: its alias if the query gave one, its name
    /// otherwise.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The column's name in its table, ignoring any alias.
    pub fn org_name(&self) -> &str {
        &self.org_name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn org_table(&self) -> &str {
        &self.org_table
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// The collation id of the column's character set.
    pub fn collation(&self) -> u16 {
        self.collation
    }

    /// The declared display length.
    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn r#type(&self) -> ColumnType {
        self.r#type
    }

    pub fn flags(&self) -> ColumnFlags {
        self.flags
    }

    /// Digits after the decimal point, for decimal types.
    pub fn decimals(&self) -> u8 {
        self.decimals
    }
}
