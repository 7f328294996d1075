mod resolver;
mod socket;
mod tls;

pub use resolver::{DnsResolver, Resolve};
pub use socket::Socket;
pub use tls::TlsUpgrade;

pub(crate) use socket::{connect_tcp, connect_uds, BufferedSocket, NullSocket, WriteBuffer};
