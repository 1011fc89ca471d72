use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

/// Opaque identity of a remote client.
///
/// Ownership of the cast session is decided by comparing identities for
/// equality. Today an identity is the peer's IP address, which is adequate
/// for the "same network origin" trust model; keeping the type opaque lets a
/// stronger scheme replace the comparison without touching the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientIdentity(IpAddr);

impl ClientIdentity {
    pub fn from_ip(ip: IpAddr) -> Self {
        Self(ip)
    }

    pub fn ip(&self) -> IpAddr {
        self.0
    }
}

impl From<SocketAddr> for ClientIdentity {
    fn from(addr: SocketAddr) -> Self {
        Self(addr.ip())
    }
}

impl From<IpAddr> for ClientIdentity {
    fn from(ip: IpAddr) -> Self {
        Self(ip)
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
