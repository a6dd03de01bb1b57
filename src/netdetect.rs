use crate::error::{Result, SweepError};
use if_addrs::{get_if_addrs, IfAddr};
use ipnet::{IpAddrRange, IpNet, Ipv4AddrRange, Ipv4Net, Ipv6AddrRange};
use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

/// A contiguous block of addresses described by a base address and prefix length.
///
/// Host bits in the parsed input are cleared, so `10.0.0.5/30` describes
/// `10.0.0.4/30`. Every address of the block is swept, including the network
/// and broadcast addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressBlock {
    net: IpNet,
}

impl AddressBlock {
    /// Parse a CIDR string such as `192.168.1.0/24` or `fd00::/120`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let net = trimmed
            .parse::<IpNet>()
            .map_err(|e| SweepError::InvalidCidr {
                input: input.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::from(net))
    }

    pub fn network(&self) -> IpAddr {
        self.net.network()
    }

    pub fn last(&self) -> IpAddr {
        self.net.broadcast()
    }

    /// Number of addresses in the block. Saturates at `u128::MAX` for `::/0`.
    pub fn len(&self) -> u128 {
        let host_bits = u32::from(self.net.max_prefix_len() - self.net.prefix_len());
        1u128.checked_shl(host_bits).unwrap_or(u128::MAX)
    }

    /// Always false; a CIDR block holds at least one address.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.net.contains(addr)
    }

    /// Lazy iterator over every address of the block in ascending order.
    pub fn addresses(&self) -> IpAddrRange {
        match self.net {
            IpNet::V4(n4) => Ipv4AddrRange::new(n4.network(), n4.broadcast()).into(),
            IpNet::V6(n6) => Ipv6AddrRange::new(n6.network(), n6.broadcast()).into(),
        }
    }
}

impl From<IpNet> for AddressBlock {
    fn from(net: IpNet) -> Self {
        Self { net: net.trunc() }
    }
}

impl FromStr for AddressBlock {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for AddressBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.net)
    }
}

/// Detect local non-loopback IPv4 addresses and convert each to a default /24 block.
///
/// For example, an interface IP `192.168.1.42` becomes `192.168.1.0/24`.
/// Duplicates are removed.
pub fn detect_local_cidrs() -> Result<Vec<AddressBlock>> {
    let mut set = HashSet::<Ipv4Net>::new();
    for iface in get_if_addrs()? {
        if let IfAddr::V4(v4) = iface.addr {
            if v4.ip.is_loopback() {
                continue;
            }
            set.insert(ipv4_to_default_cidr(v4.ip));
        }
    }
    let mut nets: Vec<Ipv4Net> = set.into_iter().collect();
    // Sort for stable output
    nets.sort_by_key(|n| (u32::from(n.network()), n.prefix_len()));
    Ok(nets
        .into_iter()
        .map(|n| AddressBlock::from(IpNet::V4(n)))
        .collect())
}

/// Helper: convert an IPv4 address into its default /24 network.
pub fn ipv4_to_default_cidr(ip: Ipv4Addr) -> Ipv4Net {
    let o = ip.octets();
    let net = Ipv4Addr::new(o[0], o[1], o[2], 0);
    Ipv4Net::new(net, 24).expect("/24 is always valid")
}
