use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::errors::ScanError;

/// An IPv4 network block. Iterating it yields every address, network and
/// broadcast included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Cidr {
    network: u32,
    prefix: u8,
}

impl Ipv4Cidr {
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.network)
    }

    /// Number of addresses in the block.
    pub fn len(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix))
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Lazily walk the block. Can be called any number of times.
    pub fn hosts(&self) -> CidrHosts {
        let start = u64::from(self.network);
        CidrHosts { next: start, end: start + self.len() - 1 }
    }
}

fn mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

impl FromStr for Ipv4Cidr {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ScanError::InvalidCidr { cidr: s.to_string(), reason: reason.to_string() };

        let (addr, prefix) = s.split_once('/').ok_or_else(|| invalid("missing '/'"))?;
        let addr: Ipv4Addr = addr.parse().map_err(|_| invalid("invalid IPv4 address"))?;
        if prefix.is_empty() {
            return Err(invalid("missing prefix length"));
        }
        let prefix: u8 = prefix.parse().map_err(|_| invalid("invalid prefix length"))?;
        if prefix > 32 {
            return Err(invalid("prefix length must be at most 32"));
        }

        Ok(Self { network: u32::from(addr) & mask(prefix), prefix })
    }
}

#[derive(Debug, Clone)]
pub struct CidrHosts {
    next: u64,
    end: u64,
}

impl Iterator for CidrHosts {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Ipv4Addr> {
        if self.next > self.end {
            return None;
        }
        let ip = Ipv4Addr::from(self.next as u32);
        self.next += 1;
        Some(ip)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end + 1).saturating_sub(self.next);
        let n = usize::try_from(remaining).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_30_includes_network_and_broadcast() {
        let cidr: Ipv4Cidr = "10.0.0.0/30".parse().unwrap();
        let hosts: Vec<String> = cidr.hosts().map(|ip| ip.to_string()).collect();
        assert_eq!(hosts, vec!["10.0.0.0", "10.0.0.1", "10.0.0.2", "10.0.0.3"]);
    }

    #[test]
    fn test_host_bits_are_masked() {
        let cidr: Ipv4Cidr = "192.168.1.77/24".parse().unwrap();
        assert_eq!(cidr.network(), Ipv4Addr::new(192, 168, 1, 0));
        assert_eq!(cidr.len(), 256);
        assert_eq!(cidr.hosts().last(), Some(Ipv4Addr::new(192, 168, 1, 255)));
    }

    #[test]
    fn test_edges() {
        let single: Ipv4Cidr = "8.8.8.8/32".parse().unwrap();
        assert_eq!(single.hosts().collect::<Vec<_>>(), vec![Ipv4Addr::new(8, 8, 8, 8)]);

        let everything: Ipv4Cidr = "0.0.0.0/0".parse().unwrap();
        assert_eq!(everything.len(), 1 << 32);
        assert_eq!(everything.hosts().size_hint().0 as u64, 1 << 32);
        assert_eq!(everything.hosts().next(), Some(Ipv4Addr::new(0, 0, 0, 0)));

        let top: Ipv4Cidr = "255.255.255.254/31".parse().unwrap();
        assert_eq!(top.hosts().count(), 2);
    }

    #[test]
    fn test_malformed() {
        for bad in ["10.0.0.0/", "10.0.0.0/33", "10.0.0/24", "fe80::/64", "10.0.0.0/ab"] {
            assert!(bad.parse::<Ipv4Cidr>().is_err(), "{} should not parse", bad);
        }
    }
}
