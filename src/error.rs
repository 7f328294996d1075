use std::fmt::{self, Display, Formatter};
use std::io;

/// A specialized `Result` type for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Format args into [`Error::ProtocolValue`].
macro_rules! err_protocol {
    ($($args:tt)*) => {
        $crate::error::Error::ProtocolValue(format!($($args)*))
    };
}

/// All the ways a client operation can fail.
///
/// Variants other than [`Error::Database`] originate on the client side;
/// `Database` wraps an `ERR` packet received from the server.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An `ERR` packet returned by the server.
    #[error("{0}")]
    Database(Box<MySqlDatabaseError>),

    #[error("configuration error: {0}")]
    Configuration(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// TLS was required but the server did not offer it, or no TLS
    /// collaborator was configured.
    #[error("TLS was requested but is not available on this connection")]
    TlsUnsupported,

    /// A message ended before all its fields could be read.
    #[error("message was truncated mid-decode")]
    IncompleteMessage,

    /// A fixed-shape message carried bytes past its last field.
    #[error("unexpected trailing bytes after a fixed-shape message")]
    ExtraBytes,

    #[error("packet sequence id mismatch: expected {expected}, got {got}")]
    SequenceNumberMismatch { expected: u8, got: u8 },

    /// The server speaks a handshake protocol other than version 10.
    #[error("unsupported server handshake protocol version {0}; expected version 10")]
    ServerVersion(u8),

    /// A field held a value outside its domain, e.g. a reserved
    /// length-encoded integer lead byte.
    #[error("invalid protocol value: {0}")]
    ProtocolValue(String),

    #[error("unknown authentication plugin: {0:?}")]
    UnknownAuthPlugin(String),

    /// The server demanded a cleartext credential exchange over a channel
    /// that is neither TLS nor a Unix socket.
    #[error("authentication plugin requires a secure connection (TLS or Unix socket)")]
    AuthPluginRequiresSecureConnection,

    #[error("statement expects {expected} parameters but {given} were given")]
    WrongNumParams { expected: usize, given: usize },

    /// A value that must be text was not valid UTF-8.
    #[error("invalid UTF-8 in a text value")]
    InvalidEncoding,

    /// A value was requested as a type its column cannot produce.
    #[error("value does not match the requested type")]
    RowTypeMismatch,

    #[error("no rows returned by a query that expected to return at least one row")]
    RowNotFound,

    #[error("column {0:?} not found in the result set")]
    ColumnNotFound(String),

    #[error("column index {index} out of range for a row of {len} columns")]
    ColumnIndexOutOfRange { index: usize, len: usize },

    #[error("timed out while waiting for a pooled connection")]
    PoolTimedOut,

    #[error("the connection pool is closed")]
    PoolClosed,
}

impl Error {
    pub(crate) fn config(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Configuration(Box::new(err))
    }

    /// Returns the server error, if this is [`Error::Database`].
    pub fn as_database_error(&self) -> Option<&MySqlDatabaseError> {
        match self {
            Error::Database(error) => Some(error),
            _ => None,
        }
    }
}

impl From<MySqlDatabaseError> for Error {
    fn from(error: MySqlDatabaseError) -> Self {
        Error::Database(Box::new(error))
    }
}

/// Which family of server error codes a code belongs to.
///
/// Codes up to 1899 are allocated to errors shared by MySQL and MariaDB and
/// carry portable `SQLSTATE` values. MySQL allocates its own codes from 3000,
/// MariaDB from 1900 and again from 4000.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MySqlErrorCategory {
    CommonServer,
    MySqlServer,
    MariaDbServer,
}

/// An error returned from the MySQL database.
#[derive(Debug)]
pub struct MySqlDatabaseError {
    code: u16,
    sql_state: Option<String>,
    message: String,
}

impl MySqlDatabaseError {
    pub(crate) fn new(code: u16, sql_state: Option<String>, message: String) -> Self {
        Self { code, sql_state, message }
    }

    /// Returns the numeric error code.
    ///
    /// All possible error codes are documented in the server error message
    /// reference of the respective flavor.
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// Returns the `SQLSTATE` code, five ASCII characters, if the server
    /// sent one. `SQLSTATE` values are defined by the SQL standard and are
    /// consistent across databases.
    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }

    /// Returns the human-readable error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Classifies [`code`](Self::code) by its allocation range.
    pub const fn code_category(&self) -> MySqlErrorCategory {
        match self.code {
            1900..=1999 | 4000..=4999 => MySqlErrorCategory::MariaDbServer,
            3000..=3999 => MySqlErrorCategory::MySqlServer,
            _ => MySqlErrorCategory::CommonServer,
        }
    }
}

impl Display for MySqlDatabaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.sql_state {
            Some(state) => write!(f, "{} ({}): {}", self.code, state, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

impl std::error::Error for MySqlDatabaseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorizes_server_codes() {
        let common = MySqlDatabaseError::new(1049, Some("42000".into()), "Unknown database 'a'".into());
        assert_eq!(common.code_category(), MySqlErrorCategory::CommonServer);

        let mysql = MySqlDatabaseError::new(3024, None, "Query execution was interrupted".into());
        assert_eq!(mysql.code_category(), MySqlErrorCategory::MySqlServer);

        let mariadb = MySqlDatabaseError::new(1927, None, "Connection was killed".into());
        assert_eq!(mariadb.code_category(), MySqlErrorCategory::MariaDbServer);
    }

    #[test]
    fn formats_with_sql_state() {
        let error = MySqlDatabaseError::new(1049, Some("42000".into()), "Unknown database 'a'".into());
        assert_eq!(error.to_string(), "1049 (42000): Unknown database 'a'");
    }
}
