use std::io;

use futures_core::future::BoxFuture;

use crate::net::Socket;

/// TLS session construction, supplied by the caller.
///
/// The driver decides *when* to switch to TLS (after the server greeting and
/// the SSL request packet); this collaborator performs the actual handshake
/// and hands back the wrapped stream. The returned socket should report
/// `is_tls() == true` so that cleartext authentication exchanges are
/// permitted over it.
pub trait TlsUpgrade: Send + Sync + 'static {
    fn upgrade(
        &self,
        socket: Box<dyn Socket>,
        host: String,
    ) -> BoxFuture<'static, io::Result<Box<dyn Socket>>>;
}
