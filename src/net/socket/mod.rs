use std::future::Future;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::BytesMut;
use futures_core::ready;
use tokio::io::AsyncWrite;
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;

use crate::error::Error;
use crate::net::Resolve;

mod buffered;

pub(crate) use buffered::{BufferedSocket, WriteBuffer};

/// The byte-stream capability set consumed by a connection.
///
/// Implemented for tokio TCP and Unix streams; TLS-wrapped streams enter
/// through the [`TlsUpgrade`](crate::net::TlsUpgrade) collaborator and
/// report [`is_tls`](Self::is_tls).
pub trait Socket: Send + Unpin + 'static {
    fn try_read(&mut self, buf: &mut BytesMut) -> io::Result<usize>;

    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn poll_read_ready(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>>;

    fn poll_write_ready(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>>;

    fn poll_flush(&mut self, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        // `flush()` is a no-op for TCP/UDS
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>>;

    /// Whether this stream is TLS-wrapped; used to gate cleartext
    /// credential exchanges.
    fn is_tls(&self) -> bool {
        false
    }

    fn read<'a>(&'a mut self, buf: &'a mut BytesMut) -> Read<'a, Self>
    where
        Self: Sized,
    {
        Read { socket: self, buf }
    }

    fn write<'a>(&'a mut self, buf: &'a [u8]) -> Write<'a, Self>
    where
        Self: Sized,
    {
        Write { socket: self, buf }
    }

    fn flush(&mut self) -> Flush<'_, Self>
    where
        Self: Sized,
    {
        Flush { socket: self }
    }

    fn shutdown(&mut self) -> Shutdown<'_, Self>
    where
        Self: Sized,
    {
        Shutdown { socket: self }
    }
}

pub struct Read<'a, S: ?Sized> {
    socket: &'a mut S,
    buf: &'a mut BytesMut,
}

impl<'a, S: Socket + ?Sized> Future for Read<'a, S> {
    type Output = io::Result<usize>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;

        loop {
            match this.socket.try_read(this.buf) {
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    ready!(this.socket.poll_read_ready(cx))?;
                }
                ready => return Poll::Ready(ready),
            }
        }
    }
}

pub struct Write<'a, S: ?Sized> {
    socket: &'a mut S,
    buf: &'a [u8],
}

impl<'a, S: Socket + ?Sized> Future for Write<'a, S> {
    type Output = io::Result<usize>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;

        loop {
            match this.socket.try_write(this.buf) {
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    ready!(this.socket.poll_write_ready(cx))?;
                }
                ready => return Poll::Ready(ready),
            }
        }
    }
}

pub struct Flush<'a, S: ?Sized> {
    socket: &'a mut S,
}

impl<'a, S: Socket + ?Sized> Future for Flush<'a, S> {
    type Output = io::Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.socket.poll_flush(cx)
    }
}

pub struct Shutdown<'a, S: ?Sized> {
    socket: &'a mut S,
}

impl<'a, S: Socket + ?Sized> Future for Shutdown<'a, S> {
    type Output = io::Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.socket.poll_shutdown(cx)
    }
}

impl<S: Socket + ?Sized> Socket for Box<S> {
    fn try_read(&mut self, buf: &mut BytesMut) -> io::Result<usize> {
        (**self).try_read(buf)
    }

    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).try_write(buf)
    }

    fn poll_read_ready(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        (**self).poll_read_ready(cx)
    }

    fn poll_write_ready(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        (**self).poll_write_ready(cx)
    }

    fn poll_flush(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        (**self).poll_flush(cx)
    }

    fn poll_shutdown(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        (**self).poll_shutdown(cx)
    }

    fn is_tls(&self) -> bool {
        (**self).is_tls()
    }
}

impl Socket for TcpStream {
    fn try_read(&mut self, buf: &mut BytesMut) -> io::Result<usize> {
        self.try_read_buf(buf)
    }

    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        TcpStream::try_write(self, buf)
    }

    fn poll_read_ready(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        TcpStream::poll_read_ready(self, cx)
    }

    fn poll_write_ready(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        TcpStream::poll_write_ready(self, cx)
    }

    fn poll_shutdown(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(self).poll_shutdown(cx)
    }
}

#[cfg(unix)]
impl Socket for UnixStream {
    fn try_read(&mut self, buf: &mut BytesMut) -> io::Result<usize> {
        self.try_read_buf(buf)
    }

    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        UnixStream::try_write(self, buf)
    }

    fn poll_read_ready(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        UnixStream::poll_read_ready(self, cx)
    }

    fn poll_write_ready(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        UnixStream::poll_write_ready(self, cx)
    }

    fn poll_shutdown(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(self).poll_shutdown(cx)
    }
}

/// Placeholder that holds a connection's socket slot while the real stream
/// is being swapped for its TLS-wrapped replacement.
pub(crate) struct NullSocket;

impl NullSocket {
    fn err() -> io::Error {
        io::Error::new(io::ErrorKind::NotConnected, "socket detached for TLS upgrade")
    }
}

impl Socket for NullSocket {
    fn try_read(&mut self, _buf: &mut BytesMut) -> io::Result<usize> {
        Err(Self::err())
    }

    fn try_write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(Self::err())
    }

    fn poll_read_ready(&mut self, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(Self::err()))
    }

    fn poll_write_ready(&mut self, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(Self::err()))
    }

    fn poll_shutdown(&mut self, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(Self::err()))
    }
}

/// Resolve `host:port` and try each endpoint in order.
pub(crate) async fn connect_tcp(
    resolver: &dyn Resolve,
    host: &str,
    port: u16,
) -> Result<TcpStream, Error> {
    // IPv6 addresses in URLs are wrapped in brackets that the url crate
    // does not trim.
    let host = host.trim_matches(&['[', ']'][..]);

    let mut last_err = None;

    for endpoint in resolver.resolve(host, port).await? {
        match TcpStream::connect(endpoint).await {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }

    Err(match last_err {
        Some(err) => err.into(),
        None => io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "hostname did not resolve to any addresses",
        )
        .into(),
    })
}

/// Connect a Unix domain socket at the given path.
///
/// Returns an error if Unix domain sockets are not supported on this
/// platform.
#[cfg(unix)]
pub(crate) async fn connect_uds(path: impl AsRef<Path>) -> Result<UnixStream, Error> {
    Ok(UnixStream::connect(path).await?)
}

#[cfg(not(unix))]
pub(crate) async fn connect_uds(path: impl AsRef<Path>) -> Result<TcpStream, Error> {
    drop(path);

    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Unix domain sockets are not supported on this platform",
    )
    .into())
}
