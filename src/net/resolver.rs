use std::io;
use std::net::SocketAddr;

use futures_core::future::BoxFuture;

/// Name resolution as consumed by connection setup: `host:port` to an
/// ordered list of endpoints to try.
pub trait Resolve: Send + Sync + 'static {
    fn resolve(&self, host: &str, port: u16) -> BoxFuture<'static, io::Result<Vec<SocketAddr>>>;
}

/// The default resolver, backed by tokio's built-in `lookup_host` (which
/// defers to the system resolver on a blocking thread).
#[derive(Debug, Default, Clone, Copy)]
pub struct DnsResolver;

impl Resolve for DnsResolver {
    fn resolve(&self, host: &str, port: u16) -> BoxFuture<'static, io::Result<Vec<SocketAddr>>> {
        let authority = (host.to_owned(), port);

        Box::pin(async move { Ok(tokio::net::lookup_host(authority).await?.collect()) })
    }
}
