use std::ops::Range;

use bytes::Bytes;

/// Raw storage for one decoded row: the message payload plus, per column,
/// the range its value occupies (`None` for NULL).
///
/// Ranges never include encoding prefixes, except for the binary date/time
/// family whose values are self-describing and keep their length byte.
#[derive(Debug)]
pub(crate) struct Row {
    pub(crate) storage: Bytes,
    pub(crate) values: Vec<Option<Range<usize>>>,
}

impl Row {
    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&[u8]> {
        let range = self.values.get(index)?.as_ref()?;

        Some(&self.storage[range.start..range.end])
    }
}
