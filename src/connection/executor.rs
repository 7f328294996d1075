use std::sync::Arc;

use crate::column::MySqlColumn;
use crate::connection::stream::Waiting;
use crate::connection::MySqlConnection;
use crate::error::Error;
use crate::protocol::statement::{BinaryRow, ComStmtClose, ComStmtExecute, ComStmtPrepare, PrepareOk};
use crate::protocol::text::{ComQuery, TextRow};
use crate::protocol::response::Status;
use crate::protocol::{Capabilities, ColumnDefinition};
use crate::io::{BufExt, ProtocolDecode};
use crate::query_result::MySqlQueryResult;
use crate::row::MySqlRow;
use crate::statement::MySqlStatement;
use crate::value::{MySqlValue, MySqlValueFormat};

impl MySqlConnection {
    /// Start a text-protocol query and stream its results.
    pub async fn query<'c>(&'c mut self, sql: &str) -> Result<MySqlResultSet<'c>, Error> {
        log::debug!("query: {sql}");

        self.stream.wait_until_ready().await?;
        self.stream.send_packet(ComQuery { sql }).await?;
        self.stream.waiting.push_back(Waiting::Result);

        MySqlResultSet::read_head(self, MySqlValueFormat::Text).await
    }

    /// Run a query to completion, discarding any rows, and fold the
    /// summaries of every result set it produces.
    pub async fn execute(&mut self, sql: &str) -> Result<MySqlQueryResult, Error> {
        self.query(sql).await?.drain().await
    }

    /// Collect the rows of the first result set; later result sets are
    /// drained and discarded.
    pub async fn fetch_all(&mut self, sql: &str) -> Result<Vec<MySqlRow>, Error> {
        let mut results = self.query(sql).await?;

        let mut rows = Vec::new();
        while let Some(row) = results.next_row().await? {
            rows.push(row);
        }

        results.drain().await?;

        Ok(rows)
    }

    /// The first row of the first result set, if any.
    pub async fn fetch_optional(&mut self, sql: &str) -> Result<Option<MySqlRow>, Error> {
        let mut results = self.query(sql).await?;

        let row = results.next_row().await?;
        results.drain().await?;

        Ok(row)
    }

    /// The first row of the first result set, or [`Error::RowNotFound`].
    pub async fn fetch_one(&mut self, sql: &str) -> Result<MySqlRow, Error> {
        self.fetch_optional(sql).await?.ok_or(Error::RowNotFound)
    }

    /// Prepare a statement and read back its parameter and column metadata.
    pub async fn prepare(&mut self, sql: &str) -> Result<MySqlStatement, Error> {
        log::debug!("prepare: {sql}");

        self.stream.wait_until_ready().await?;
        self.stream.send_packet(ComStmtPrepare { sql }).await?;

        let ok: PrepareOk = self.stream.recv().await?;

        let parameters = self.recv_metadata(usize::from(ok.params)).await?;
        let columns = self.recv_metadata(usize::from(ok.columns)).await?;

        Ok(MySqlStatement {
            id: ok.statement_id,
            parameters,
            columns,
        })
    }

    /// Execute a prepared statement and stream its (binary-encoded) results.
    pub async fn query_statement<'c>(
        &'c mut self,
        statement: &MySqlStatement,
        params: &[MySqlValue<'_>],
    ) -> Result<MySqlResultSet<'c>, Error> {
        if params.len() != statement.parameters.len() {
            return Err(Error::WrongNumParams {
                expected: statement.parameters.len(),
                given: params.len(),
            });
        }

        log::debug!("execute statement {}", statement.id);

        self.stream.wait_until_ready().await?;
        self.stream
            .send_packet(ComStmtExecute {
                statement_id: statement.id,
                params,
            })
            .await?;
        self.stream.waiting.push_back(Waiting::Result);

        MySqlResultSet::read_head(self, MySqlValueFormat::Binary).await
    }

    /// Execute a prepared statement to completion, discarding any rows.
    pub async fn execute_statement(
        &mut self,
        statement: &MySqlStatement,
        params: &[MySqlValue<'_>],
    ) -> Result<MySqlQueryResult, Error> {
        self.query_statement(statement, params).await?.drain().await
    }

    /// Collect the rows of a prepared statement's first result set.
    pub async fn fetch_all_statement(
        &mut self,
        statement: &MySqlStatement,
        params: &[MySqlValue<'_>],
    ) -> Result<Vec<MySqlRow>, Error> {
        let mut results = self.query_statement(statement, params).await?;

        let mut rows = Vec::new();
        while let Some(row) = results.next_row().await? {
            rows.push(row);
        }

        results.drain().await?;

        Ok(rows)
    }

    /// Deallocate a prepared statement. The server sends no reply.
    pub async fn close_statement(&mut self, statement: &MySqlStatement) -> Result<(), Error> {
        self.stream.wait_until_ready().await?;
        self.stream
            .send_packet(ComStmtClose {
                statement_id: statement.id,
            })
            .await
    }

    async fn recv_metadata(&mut self, count: usize) -> Result<Vec<MySqlColumn>, Error> {
        let mut columns = Vec::with_capacity(count);

        for ordinal in 0..count {
            let def: ColumnDefinition = self.stream.recv_packet().await?.decode()?;
            columns.push(MySqlColumn::from_definition(ordinal, def)?);
        }

        if count > 0 {
            self.stream.maybe_recv_eof().await?;
        }

        Ok(columns)
    }
}

/// A result stream, held open on its connection.
///
/// Rows arrive lazily through [`next_row`](Self::next_row); when it returns
/// `None` the current result set is complete and its summary is available.
/// If the server signalled more results, [`next_result_set`](Self::next_result_set)
/// moves on to the next one.
///
/// Dropping this mid-stream is safe: the connection notes what is still
/// owed and drains it before its next command.
pub struct MySqlResultSet<'c> {
    conn: &'c mut MySqlConnection,
    format: MySqlValueFormat,
    columns: Arc<Vec<MySqlColumn>>,
    result: Option<MySqlQueryResult>,
}

impl<'c> MySqlResultSet<'c> {
    pub(crate) async fn read_head(
        conn: &'c mut MySqlConnection,
        format: MySqlValueFormat,
    ) -> Result<Self, Error> {
        let mut results = Self {
            conn,
            format,
            columns: Arc::new(Vec::new()),
            result: None,
        };

        results.read_result_head().await?;

        Ok(results)
    }

    // the reply to a command is an OK packet (no rows) or a column count
    // followed by that many column definitions
    async fn read_result_head(&mut self) -> Result<(), Error> {
        let stream = &mut self.conn.stream;
        let packet = stream.recv_packet().await?;

        if packet.first() == Some(&0x00) {
            let ok = packet.ok(stream.capabilities)?;
            stream.status = ok.status;

            if !ok.status.contains(Status::SERVER_MORE_RESULTS_EXISTS) {
                stream.waiting.pop_front();
            }

            self.columns = Arc::new(Vec::new());
            self.result = Some(ok.into());

            return Ok(());
        }

        let mut head = packet.0;
        let count = usize::try_from(head.get_uint_lenenc()?)
            .map_err(|_| err_protocol!("column count overflows usize"))?;

        if !head.is_empty() {
            return Err(Error::ExtraBytes);
        }

        if let Some(front) = stream.waiting.front_mut() {
            *front = Waiting::Row;
        }

        self.columns = Arc::new(self.conn.recv_metadata(count).await?);
        self.result = None;

        Ok(())
    }

    /// Metadata for the columns of the current result set.
    pub fn columns(&self) -> &[MySqlColumn] {
        &self.columns
    }

    /// The next row, or `None` once the current result set is complete.
    ///
    /// The returned row owns its storage and outlives the stream.
    pub async fn next_row(&mut self) -> Result<Option<MySqlRow>, Error> {
        if self.result.is_some() {
            return Ok(None);
        }

        let stream = &mut self.conn.stream;
        let packet = stream.recv_packet().await?;

        if stream.is_row_terminator(&packet) {
            let result: MySqlQueryResult =
                if stream.capabilities.contains(Capabilities::DEPRECATE_EOF) {
                    packet.ok(stream.capabilities)?.into()
                } else {
                    packet.eof(stream.capabilities)?.into()
                };

            stream.status = result.status;

            if result.more_results() {
                if let Some(front) = stream.waiting.front_mut() {
                    *front = Waiting::Result;
                }
            } else {
                stream.waiting.pop_front();
            }

            self.result = Some(result);

            return Ok(None);
        }

        let row = match self.format {
            MySqlValueFormat::Text => TextRow::decode_with(packet.0, self.columns.len())?.0,
            MySqlValueFormat::Binary => BinaryRow::decode_with(packet.0, &self.columns[..])?.0,
        };

        Ok(Some(MySqlRow {
            row,
            format: self.format,
            columns: Arc::clone(&self.columns),
        }))
    }

    /// The summary of the current result set, once its rows are exhausted.
    pub fn query_result(&self) -> Option<&MySqlQueryResult> {
        self.result.as_ref()
    }

    /// Whether the server announced another result set after this one.
    pub fn has_more_results(&self) -> bool {
        self.result.as_ref().is_some_and(MySqlQueryResult::more_results)
    }

    /// Advance to the next result set. Returns `false` when none remain.
    pub async fn next_result_set(&mut self) -> Result<bool, Error> {
        if !self.has_more_results() {
            return Ok(false);
        }

        self.read_result_head().await?;

        Ok(true)
    }

    /// Consume every remaining row and result set, folding the summaries.
    pub async fn drain(mut self) -> Result<MySqlQueryResult, Error> {
        let mut summary = MySqlQueryResult::default();

        loop {
            while self.next_row().await?.is_some() {}

            let result = self.result.clone().expect("result set just completed");
            let more = result.more_results();

            summary.merge(result);

            if !more {
                return Ok(summary);
            }

            self.read_result_head().await?;
        }
    }
}
