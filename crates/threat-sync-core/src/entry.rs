// # Network Entry
//
// The shared value type for a single IPv4/IPv6 address or CIDR block.
//
// Every entry is stored as a network (host bits cleared) with an explicit
// prefix length, so two inputs that denote the same network always render
// to the same canonical string:
//
// - `203.0.113.5`       -> `203.0.113.5/32`
// - `2001:db8::1`       -> `2001:db8::1/128`
// - `10.1.2.3/8`        -> `10.0.0.0/8`
// - `::ffff:192.0.2.1`  -> `192.0.2.1/32`
// - `::ffff:1.2.3.0/120` -> `1.2.3.0/24`

use crate::error::{Error, Result};
use ipnet::{IpNet, Ipv4Net};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Address family of a network entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Prefix length of a single host in this family
    pub fn host_prefix_len(self) -> u8 {
        match self {
            AddressFamily::V4 => 32,
            AddressFamily::V6 => 128,
        }
    }
}

/// A single IP address or CIDR block in canonical network form
///
/// Entries are immutable once constructed; the normalizer and the remote
/// client only ever read them (the latter as plain canonical strings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkEntry {
    net: IpNet,
}

impl NetworkEntry {
    /// Parse a bare IP address or a CIDR block
    ///
    /// Surrounding whitespace is ignored. Host bits of a CIDR are cleared.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if input.contains('/') {
            let net: IpNet = input
                .parse()
                .map_err(|_| Error::invalid_input(format!("invalid CIDR: {}", input)))?;
            return Ok(Self::from_net(net));
        }

        let ip: IpAddr = input
            .parse()
            .map_err(|_| Error::invalid_input(format!("invalid IP address: {}", input)))?;
        Ok(Self::from_ip(ip))
    }

    /// Build a single-host entry (`/32` or `/128`)
    pub fn from_ip(ip: IpAddr) -> Self {
        let ip = match ip {
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => IpAddr::V4(v4),
                None => IpAddr::V6(v6),
            },
            v4 => v4,
        };
        Self {
            net: IpNet::from(ip),
        }
    }

    /// Build an entry from a network, clearing host bits
    ///
    /// IPv4-mapped IPv6 networks with a prefix of at least 96 bits are
    /// rewritten as the IPv4 network they cover.
    pub fn from_net(net: IpNet) -> Self {
        let net = match net {
            IpNet::V6(v6) if v6.prefix_len() >= 96 => match v6.addr().to_ipv4_mapped() {
                Some(v4) => Ipv4Net::new(v4, v6.prefix_len() - 96)
                    .map(IpNet::V4)
                    .unwrap_or(net),
                None => net,
            },
            other => other,
        };
        Self { net: net.trunc() }
    }

    /// Address family of this entry
    pub fn family(&self) -> AddressFamily {
        match self.net {
            IpNet::V4(_) => AddressFamily::V4,
            IpNet::V6(_) => AddressFamily::V6,
        }
    }

    /// Network address
    pub fn network(&self) -> IpAddr {
        self.net.network()
    }

    /// Prefix length
    pub fn prefix_len(&self) -> u8 {
        self.net.prefix_len()
    }

    /// True if this entry covers exactly one address
    pub fn is_host(&self) -> bool {
        self.prefix_len() == self.family().host_prefix_len()
    }

    /// Underlying network value
    pub fn as_ipnet(&self) -> &IpNet {
        &self.net
    }

    /// Canonical textual form, used for equality, sorting and the remote side
    pub fn canonical(&self) -> String {
        self.net.to_string()
    }
}

impl fmt::Display for NetworkEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.net)
    }
}

impl FromStr for NetworkEntry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<IpAddr> for NetworkEntry {
    fn from(ip: IpAddr) -> Self {
        Self::from_ip(ip)
    }
}

impl From<IpNet> for NetworkEntry {
    fn from(net: IpNet) -> Self {
        Self::from_net(net)
    }
}
