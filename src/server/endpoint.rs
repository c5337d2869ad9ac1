use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
#[cfg(unix)]
use std::path::PathBuf;

/// Where a server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(SocketAddr),
    /// Unix domain socket path.
    #[cfg(unix)]
    Local(PathBuf),
}

impl Endpoint {
    /// Resolves `host:port` to the first matching socket address.
    pub fn tcp(host: &str, port: u16) -> std::io::Result<Self> {
        (host, port)
            .to_socket_addrs()?
            .next()
            .map(Endpoint::Tcp)
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    format!("no address for {}:{}", host, port),
                )
            })
    }

    /// Parses `host:port`.
    pub fn parse(addr: &str) -> std::io::Result<Self> {
        addr.to_socket_addrs()?
            .next()
            .map(Endpoint::Tcp)
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    format!("no address for {}", addr),
                )
            })
    }

    #[cfg(unix)]
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Endpoint::Local(path.into())
    }

    pub fn socket_addr(&self) -> Option<SocketAddr> {
        match self {
            Endpoint::Tcp(addr) => Some(*addr),
            #[cfg(unix)]
            Endpoint::Local(_) => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
            #[cfg(unix)]
            Endpoint::Local(path) => write!(f, "local://{}", path.display()),
        }
    }
}
