use std::fmt::{self, Debug, Formatter};

use crate::error::Error;
use crate::protocol::response::Status;
use crate::protocol::text::{ComPing, ComQuit, ComResetConnection};

mod auth;
mod establish;
mod executor;
pub(crate) mod stream;

pub use executor::MySqlResultSet;

pub(crate) use stream::MySqlStream;

/// A single connection to a MySQL or MariaDB server.
///
/// The protocol is strictly request/reply; every operation takes `&mut self`
/// so at most one command is ever in flight.
pub struct MySqlConnection {
    pub(crate) stream: MySqlStream,
}

impl MySqlConnection {
    /// Check that the server is still there and responsive.
    pub async fn ping(&mut self) -> Result<(), Error> {
        self.stream.wait_until_ready().await?;
        self.stream.send_packet(ComPing).await?;
        self.stream.recv_ok().await?;

        Ok(())
    }

    /// Wipe session state (user variables, temporary tables, prepared
    /// statements) without re-authenticating.
    pub async fn reset(&mut self) -> Result<(), Error> {
        self.stream.wait_until_ready().await?;
        self.stream.send_packet(ComResetConnection).await?;
        self.stream.recv_ok().await?;

        Ok(())
    }

    /// Announce the end of the session and close the stream.
    ///
    /// The shutdown after `COM_QUIT` is best-effort; MySQL does not reliably
    /// perform a graceful TLS close.
    pub async fn close(mut self) -> Result<(), Error> {
        self.stream.send_packet(ComQuit).await?;
        let _ = self.stream.shutdown().await;

        Ok(())
    }

    /// Close the stream without the `COM_QUIT` courtesy.
    pub async fn close_hard(mut self) -> Result<(), Error> {
        let _ = self.stream.shutdown().await;

        Ok(())
    }

    /// The server version as reported in its greeting.
    pub fn server_version(&self) -> (u16, u16, u16) {
        self.stream.server_version
    }

    /// Whether the session has an open transaction, per the status flags of
    /// the last reply.
    pub fn in_transaction(&self) -> bool {
        self.stream.status.contains(Status::SERVER_STATUS_IN_TRANS)
    }

    /// Release excess capacity held by the connection's buffers.
    pub fn shrink_buffers(&mut self) {
        self.stream.shrink_buffers();
    }

    // a connection is clean when the server owes it nothing
    pub(crate) fn is_clean(&self) -> bool {
        self.stream.waiting.is_empty() && self.stream.write_buffer().is_empty()
    }
}

impl Debug for MySqlConnection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("server_version", &self.stream.server_version)
            .finish()
    }
}
