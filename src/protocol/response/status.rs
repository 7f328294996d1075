// https://dev.mysql.com/doc/internals/en/status-flags.html#packet-Protocol::StatusFlags
// https://mariadb.com/kb/en/library/mariadb-connectorc-types-and-definitions/#server-status
bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub(crate) struct Status: u16 {
        // a transaction is currently active
        const SERVER_STATUS_IN_TRANS = 1;

        // autocommit mode is set
        const SERVER_STATUS_AUTOCOMMIT = 2;

        // more results exist (more packets will follow)
        const SERVER_MORE_RESULTS_EXISTS = 8;

        const SERVER_QUERY_NO_GOOD_INDEX_USED = 16;
        const SERVER_QUERY_NO_INDEX_USED = 32;

        // when using COM_STMT_FETCH, indicate that a cursor exists
        const SERVER_STATUS_CURSOR_EXISTS = 64;

        // when using COM_STMT_FETCH, indicate that the last row was sent
        const SERVER_STATUS_LAST_ROW_SENT = 128;

        // the database was dropped
        const SERVER_STATUS_DB_DROPPED = 256;

        // current escape mode is "no backslash escape"
        const SERVER_STATUS_NO_BACKSLASH_ESCAPES = 512;

        // a DDL change changed the metadata of a prepared statement
        const SERVER_STATUS_METADATA_CHANGED = 1024;

        // the last statement took more than the configured long_query_time
        const SERVER_QUERY_WAS_SLOW = 2048;

        // this result set contains the out parameters of a stored procedure
        const SERVER_PS_OUT_PARAMS = 4096;

        // the current transaction is read-only
        const SERVER_STATUS_IN_TRANS_READONLY = 8192;

        // session state has changed (carried in the OK packet when
        // SESSION_TRACK was negotiated)
        const SERVER_SESSION_STATE_CHANGED = 16384;
    }
}
