use crate::protocol::response::{EofPacket, OkPacket, Status};

/// The summary a completed command or result set ends with.
#[derive(Debug, Clone, Default)]
pub struct MySqlQueryResult {
    pub(crate) rows_affected: u64,
    pub(crate) last_insert_id: u64,
    pub(crate) warnings: u16,
    pub(crate) info: String,
    pub(crate) status: Status,
}

impl MySqlQueryResult {
    /// Rows changed, deleted, or inserted by the statement.
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// The value generated for an `AUTO_INCREMENT` column by the statement;
    /// 0 when none was generated.
    pub fn last_insert_id(&self) -> u64 {
        self.last_insert_id
    }

    pub fn warnings(&self) -> u16 {
        self.warnings
    }

    /// Human-readable status information, e.g. `Rows matched: 5  Changed: 4`.
    pub fn info(&self) -> &str {
        &self.info
    }

    pub(crate) fn more_results(&self) -> bool {
        self.status.contains(Status::SERVER_MORE_RESULTS_EXISTS)
    }

    /// Fold the summary of a later result set into this one.
    pub(crate) fn merge(&mut self, other: MySqlQueryResult) {
        self.rows_affected += other.rows_affected;
        self.last_insert_id = other.last_insert_id;
        self.warnings = self.warnings.saturating_add(other.warnings);
        self.info = other.info;
        self.status = other.status;
    }
}

impl From<OkPacket> for MySqlQueryResult {
    fn from(ok: OkPacket) -> Self {
        Self {
            rows_affected: ok.affected_rows,
            last_insert_id: ok.last_insert_id,
            warnings: ok.warnings,
            info: ok.info,
            status: ok.status,
        }
    }
}

/// A legacy EOF terminator carries no row counts.
impl From<EofPacket> for MySqlQueryResult {
    fn from(eof: EofPacket) -> Self {
        Self {
            warnings: eof.warnings,
            status: eof.status,
            ..Self::default()
        }
    }
}
