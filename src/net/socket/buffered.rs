use std::io;

use bytes::BytesMut;

use crate::error::Error;
use crate::io::ProtocolEncode;
use crate::net::Socket;

// Tokio and std both use this as the default capacity for buffered I/O.
const DEFAULT_BUF_SIZE: usize = 8192;

/// A [`Socket`] paired with one reusable read buffer and one write buffer.
///
/// Both buffers belong exclusively to this socket; the read buffer is
/// compacted between messages by shuttling capacity between its consumed and
/// available halves.
pub(crate) struct BufferedSocket<S = Box<dyn Socket>> {
    socket: S,
    write_buf: WriteBuffer,
    read_buf: ReadBuffer,
}

pub(crate) struct WriteBuffer {
    buf: Vec<u8>,
    flushed: usize,
}

struct ReadBuffer {
    read: BytesMut,
    available: BytesMut,
}

impl<S: Socket> BufferedSocket<S> {
    pub(crate) fn new(socket: S) -> Self {
        BufferedSocket {
            socket,
            write_buf: WriteBuffer {
                buf: Vec::with_capacity(DEFAULT_BUF_SIZE),
                flushed: 0,
            },
            read_buf: ReadBuffer {
                read: BytesMut::new(),
                available: BytesMut::with_capacity(DEFAULT_BUF_SIZE),
            },
        }
    }

    /// Read exactly `len` bytes, suspending until they arrive.
    pub(crate) async fn read_buffered(&mut self, len: usize) -> io::Result<BytesMut> {
        self.read_buf.read(len, &mut self.socket).await?;
        Ok(self.read_buf.read.split_to(len))
    }

    #[inline(always)]
    pub(crate) fn write_with<'en, T, C>(&mut self, value: T, context: C) -> Result<(), Error>
    where
        T: ProtocolEncode<'en, C>,
    {
        value.encode_with(self.write_buf.buf_mut(), context)
    }

    pub(crate) fn write_buffer(&self) -> &WriteBuffer {
        &self.write_buf
    }

    #[allow(dead_code)]
    pub(crate) fn write_buffer_mut(&mut self) -> &mut WriteBuffer {
        &mut self.write_buf
    }

    pub(crate) async fn flush(&mut self) -> io::Result<()> {
        while !self.write_buf.is_empty() {
            let written = self.socket.write(self.write_buf.get()).await?;

            if written == 0 {
                return Err(io::ErrorKind::WriteZero.into());
            }

            self.write_buf.consume(written);
        }

        self.socket.flush().await?;

        Ok(())
    }

    pub(crate) async fn shutdown(&mut self) -> io::Result<()> {
        self.flush().await?;
        self.socket.shutdown().await
    }

    pub(crate) fn shrink_buffers(&mut self) {
        // Won't drop data still in either buffer.
        self.write_buf.shrink();
        self.read_buf.shrink();
    }

    pub(crate) fn socket(&self) -> &S {
        &self.socket
    }

    pub(crate) fn replace_socket(&mut self, socket: S) -> S {
        std::mem::replace(&mut self.socket, socket)
    }
}

impl WriteBuffer {
    /// The unwritten tail of the buffer, for callers that serialize in place
    /// before flushing.
    pub(crate) fn buf_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.flushed >= self.buf.len()
    }

    fn get(&self) -> &[u8] {
        &self.buf[self.flushed..]
    }

    fn consume(&mut self, amt: usize) {
        let flushed = self
            .flushed
            .checked_add(amt)
            .expect("self.flushed + amt overflowed");

        assert!(flushed <= self.buf.len());

        self.flushed = flushed;

        if self.flushed == self.buf.len() {
            self.buf.clear();
            self.flushed = 0;
        }
    }

    fn shrink(&mut self) {
        if self.is_empty() && self.buf.capacity() > DEFAULT_BUF_SIZE {
            self.buf.shrink_to(DEFAULT_BUF_SIZE);
        }
    }
}

impl ReadBuffer {
    async fn read(&mut self, len: usize, socket: &mut impl Socket) -> io::Result<()> {
        // Because of how `BytesMut` works, we should only be shifting capacity
        // back and forth between `read` and `available` unless we have to read
        // an oversize message.
        while self.read.len() < len {
            self.reserve(len - self.read.len());

            let read = socket.read(&mut self.available).await?;

            if read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "expected to read {} bytes, got {} bytes at EOF",
                        len,
                        self.read.len()
                    ),
                ));
            }

            self.advance(read);
        }

        Ok(())
    }

    fn reserve(&mut self, amt: usize) {
        if let Some(additional) = amt.checked_sub(self.available.capacity()) {
            self.available.reserve(additional);
        }
    }

    fn advance(&mut self, amt: usize) {
        self.read.unsplit(self.available.split_to(amt));
    }

    fn shrink(&mut self) {
        if self.available.capacity() > DEFAULT_BUF_SIZE {
            // `BytesMut` cannot shrink its capacity in place; `available` only
            // holds spare capacity, so replacing it is safe.
            self.available = BytesMut::with_capacity(DEFAULT_BUF_SIZE);
        }
    }
}
