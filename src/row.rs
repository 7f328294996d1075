use std::sync::Arc;

use crate::column::MySqlColumn;
use crate::error::Error;
use crate::protocol::Row;
use crate::value::{self, MySqlValue, MySqlValueFormat};

/// One row of a result set.
///
/// Field access decodes lazily out of the row's storage; returned values
/// borrow from the row and stay valid for as long as it is held.
#[derive(Debug)]
pub struct MySqlRow {
    pub(crate) row: Row,
    pub(crate) format: MySqlValueFormat,
    pub(crate) columns: Arc<Vec<MySqlColumn>>,
}

impl MySqlRow {
    /// Metadata for the row's columns, in order.
    pub fn columns(&self) -> &[MySqlColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.row.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row.len() == 0
    }

    /// Decode the field at `index`.
    pub fn get(&self, index: usize) -> Result<MySqlValue<'_>, Error> {
        let column = self.columns.get(index).ok_or(Error::ColumnIndexOutOfRange {
            index,
            len: self.columns.len(),
        })?;

        let Some(raw) = self.row.get(index) else {
            return Ok(MySqlValue::Null);
        };

        match self.format {
            MySqlValueFormat::Text => value::decode_text(raw, column.r#type, column.flags),
            MySqlValueFormat::Binary => value::decode_binary(raw, column.r#type, column.flags),
        }
    }

    /// Decode the field under the named column.
    pub fn get_by_name(&self, name: &str) -> Result<MySqlValue<'_>, Error> {
        self.get(self.ordinal_of(name)?)
    }

    /// Decode the field at `index` into a concrete Rust type.
    pub fn try_get<'r, T>(&'r self, index: usize) -> Result<T, Error>
    where
        T: TryFrom<MySqlValue<'r>, Error = Error>,
    {
        T::try_from(self.get(index)?)
    }

    fn ordinal_of(&self, name: &str) -> Result<usize, Error> {
        self.columns
            .iter()
            .position(|column| column.name == name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_owned()))
    }
}
