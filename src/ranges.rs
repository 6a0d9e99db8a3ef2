//! Address range table and IP literal classification.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use crate::verdict::{Reason, Verdict};

/// A CIDR range tagged with the reason addresses inside it are refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    net: IpNet,
    reason: Reason,
}

impl AddressRange {
    pub fn new(net: IpNet, reason: Reason) -> Self {
        Self { net, reason }
    }

    const fn v4(addr: Ipv4Addr, prefix: u8, reason: Reason) -> Self {
        Self {
            net: IpNet::V4(Ipv4Net::new_assert(addr, prefix)),
            reason,
        }
    }

    const fn v6(addr: Ipv6Addr, prefix: u8, reason: Reason) -> Self {
        Self {
            net: IpNet::V6(Ipv6Net::new_assert(addr, prefix)),
            reason,
        }
    }

    pub fn net(&self) -> IpNet {
        self.net
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        self.net.contains(&ip)
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.net, self.reason.code())
    }
}

/// Built-in IPv4 rules, most specific first.
const IPV4_RANGES: &[AddressRange] = &[
    AddressRange::v4(Ipv4Addr::new(127, 0, 0, 0), 8, Reason::LoopbackAddress),
    AddressRange::v4(Ipv4Addr::UNSPECIFIED, 32, Reason::UnspecifiedAddress),
    // RFC 1918
    AddressRange::v4(Ipv4Addr::new(10, 0, 0, 0), 8, Reason::PrivateRangeAddress),
    AddressRange::v4(Ipv4Addr::new(172, 16, 0, 0), 12, Reason::PrivateRangeAddress),
    AddressRange::v4(Ipv4Addr::new(192, 168, 0, 0), 16, Reason::PrivateRangeAddress),
    // Cloud metadata endpoints live here
    AddressRange::v4(Ipv4Addr::new(169, 254, 0, 0), 16, Reason::LinkLocalAddress),
];

/// Built-in IPv6 rules. Loopback and unspecified precede `::/96`, which contains
/// both; the mapped forms precede `::/16`, which contains them all.
const IPV6_RANGES: &[AddressRange] = &[
    AddressRange::v6(Ipv6Addr::new(0x2001, 0, 0, 0, 0, 0, 0, 0), 32, Reason::TeredoAddress),
    AddressRange::v6(Ipv6Addr::LOCALHOST, 128, Reason::LoopbackAddress),
    AddressRange::v6(Ipv6Addr::UNSPECIFIED, 128, Reason::UnspecifiedAddress),
    AddressRange::v6(Ipv6Addr::new(0, 0, 0, 0, 0, 0xffff, 0, 0), 96, Reason::MappedAddress),
    // Deprecated IPv4-compatible form (::a.b.c.d)
    AddressRange::v6(Ipv6Addr::UNSPECIFIED, 96, Reason::MappedAddress),
    // Anything else spelled with a leading `::1` (::1:2:3, ::1234:5678:9abc, 0:1::)
    AddressRange::v6(Ipv6Addr::UNSPECIFIED, 16, Reason::LoopbackAddress),
    // RFC 4193
    AddressRange::v6(Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7, Reason::UniqueLocalAddress),
    AddressRange::v6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10, Reason::LinkLocalAddress),
];

/// An IP literal after the two-family parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpLiteral {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
    Unparseable,
}

impl IpLiteral {
    /// Try IPv4 first, then IPv6. Brackets around IPv6 literals are accepted.
    pub fn parse(hostname: &str) -> Self {
        if let Ok(v4) = hostname.parse::<Ipv4Addr>() {
            return IpLiteral::V4(v4);
        }
        let unbracketed = hostname
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(hostname);
        match unbracketed.parse::<Ipv6Addr>() {
            Ok(v6) => IpLiteral::V6(v6),
            Err(_) => IpLiteral::Unparseable,
        }
    }

    pub fn addr(self) -> Option<IpAddr> {
        match self {
            IpLiteral::V4(v4) => Some(IpAddr::V4(v4)),
            IpLiteral::V6(v6) => Some(IpAddr::V6(v6)),
            IpLiteral::Unparseable => None,
        }
    }
}

/// Ordered, immutable set of blocked ranges.
///
/// The first range containing an address decides its reason. Built-in
/// ranges always come first; configured extras are checked after them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRangeTable {
    ranges: Vec<AddressRange>,
}

impl Default for AddressRangeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AddressRangeTable {
    /// The built-in table.
    pub fn builtin() -> Self {
        Self {
            ranges: IPV4_RANGES.iter().chain(IPV6_RANGES).copied().collect(),
        }
    }

    /// The built-in table followed by `extra`.
    pub fn with_extra(extra: impl IntoIterator<Item = AddressRange>) -> Self {
        let mut table = Self::builtin();
        table.ranges.extend(extra);
        table
    }

    pub fn ranges(&self) -> &[AddressRange] {
        &self.ranges
    }

    /// Reason the address is blocked, or `None` if no range contains it.
    pub fn classify(&self, ip: IpAddr) -> Option<Reason> {
        self.ranges
            .iter()
            .find(|range| range.contains(ip))
            .map(AddressRange::reason)
    }

    /// Verdict for a hostname already known to be an IP literal.
    pub fn classify_literal(&self, hostname: &str) -> Verdict {
        let Some(ip) = IpLiteral::parse(hostname).addr() else {
            return Verdict::reject(Reason::MalformedUrl);
        };
        match self.classify(ip) {
            Some(reason) => Verdict::reject(reason),
            None => Verdict::accept(Reason::PublicAddress),
        }
    }
}

/// Whether an IPv4 address is in `127.0.0.0/8`.
pub fn is_loopback_v4(ip: Ipv4Addr) -> bool {
    ip.octets()[0] == 127
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason_of(host: &str) -> Option<Reason> {
        let verdict = AddressRangeTable::builtin().classify_literal(host);
        (!verdict.is_valid()).then(|| verdict.reason())
    }

    #[test]
    fn test_ip_literal_parse_order() {
        assert_eq!(
            IpLiteral::parse("127.0.0.1"),
            IpLiteral::V4(Ipv4Addr::LOCALHOST)
        );
        assert_eq!(IpLiteral::parse("::1"), IpLiteral::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(IpLiteral::parse("[::1]"), IpLiteral::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(IpLiteral::parse("example.com"), IpLiteral::Unparseable);
        assert_eq!(IpLiteral::parse("256.1.1.1"), IpLiteral::Unparseable);
        assert_eq!(IpLiteral::parse("1.2.3"), IpLiteral::Unparseable);
    }

    #[test]
    fn test_malformed_literal_rejected() {
        assert_eq!(reason_of("999.0.0.1"), Some(Reason::MalformedUrl));
        assert_eq!(reason_of("::g"), Some(Reason::MalformedUrl));
        assert_eq!(reason_of(""), Some(Reason::MalformedUrl));
    }

    // ==================== IPv4 ====================

    #[test]
    fn test_ipv4_loopback_full_range() {
        for host in ["127.0.0.0", "127.0.0.1", "127.1.2.3", "127.255.255.255"] {
            assert_eq!(reason_of(host), Some(Reason::LoopbackAddress), "{host}");
        }
    }

    #[test]
    fn test_ipv4_unspecified() {
        assert_eq!(reason_of("0.0.0.0"), Some(Reason::UnspecifiedAddress));
        // Only the single address is in the table
        assert_eq!(reason_of("0.0.0.1"), None);
    }

    #[test]
    fn test_ipv4_private_ranges() {
        for host in [
            "10.0.0.0",
            "10.255.255.255",
            "172.16.0.0",
            "172.20.1.1",
            "172.31.255.255",
            "192.168.0.0",
            "192.168.1.1",
            "192.168.255.255",
        ] {
            assert_eq!(reason_of(host), Some(Reason::PrivateRangeAddress), "{host}");
        }
    }

    #[test]
    fn test_ipv4_private_range_boundaries() {
        for host in [
            "9.255.255.255",
            "11.0.0.0",
            "172.15.255.255",
            "172.32.0.0",
            "192.167.255.255",
            "192.169.0.0",
        ] {
            assert_eq!(reason_of(host), None, "{host}");
        }
    }

    #[test]
    fn test_ipv4_link_local() {
        assert_eq!(reason_of("169.254.169.254"), Some(Reason::LinkLocalAddress));
        assert_eq!(reason_of("169.254.0.1"), Some(Reason::LinkLocalAddress));
    }

    #[test]
    fn test_ipv4_public_accepted() {
        let table = AddressRangeTable::builtin();
        for host in ["8.8.8.8", "93.184.216.34", "1.1.1.1", "128.0.0.1"] {
            let verdict = table.classify_literal(host);
            assert!(verdict.is_valid(), "{host}");
            assert_eq!(verdict.reason(), Reason::PublicAddress);
        }
    }

    // ==================== IPv6 ====================

    #[test]
    fn test_ipv6_loopback_variations() {
        for host in [
            "::1",
            "0:0:0:0:0:0:0:1",
            "0000:0000:0000:0000:0000:0000:0000:0001",
            "::1:0:0:0:0:0",
            "::1:2:3",
            "::1234:5678:9abc",
        ] {
            assert_eq!(reason_of(host), Some(Reason::LoopbackAddress), "{host}");
        }
    }

    #[test]
    fn test_ipv6_leading_zero_block_keeps_specific_reasons() {
        // ::/16 is checked after the narrower rules it contains
        assert_eq!(reason_of("::"), Some(Reason::UnspecifiedAddress));
        assert_eq!(reason_of("::ffff:8.8.8.8"), Some(Reason::MappedAddress));
        assert_eq!(reason_of("::8.8.8.8"), Some(Reason::MappedAddress));
        assert_eq!(reason_of("1::1"), None);
    }

    #[test]
    fn test_ipv6_unspecified() {
        assert_eq!(reason_of("::"), Some(Reason::UnspecifiedAddress));
    }

    #[test]
    fn test_ipv6_mapped() {
        for host in [
            "::ffff:127.0.0.1",
            "::ffff:7f00:1",
            "0:0:0:0:0:ffff:127.0.0.1",
            "::ffff:10.0.0.1",
            "::ffff:192.168.0.1",
            "::ffff:8.8.8.8",
            "::ffff:0:0",
        ] {
            assert_eq!(reason_of(host), Some(Reason::MappedAddress), "{host}");
        }
    }

    #[test]
    fn test_ipv6_ipv4_compatible() {
        assert_eq!(reason_of("::127.0.0.1"), Some(Reason::MappedAddress));
        assert_eq!(reason_of("::169.254.169.254"), Some(Reason::MappedAddress));
    }

    #[test]
    fn test_ipv6_teredo() {
        for host in [
            "2001::1",
            "2001:0:4136:e378:8000:63bf:3fff:fdd2",
            "2001:0000:ffff:ffff:ffff:ffff:ffff:ffff",
        ] {
            assert_eq!(reason_of(host), Some(Reason::TeredoAddress), "{host}");
        }
        // 2001:db8::/32 is not Teredo
        assert_ne!(reason_of("2001:db8::1"), Some(Reason::TeredoAddress));
    }

    #[test]
    fn test_ipv6_unique_local() {
        for host in [
            "fc00::1",
            "fd00::1",
            "fd12:3456:789a::1",
            "fdff:ffff:ffff:ffff:ffff:ffff:ffff:ffff",
        ] {
            assert_eq!(reason_of(host), Some(Reason::UniqueLocalAddress), "{host}");
        }
        assert_eq!(reason_of("fe00::1"), None);
    }

    #[test]
    fn test_ipv6_link_local() {
        assert_eq!(reason_of("fe80::1"), Some(Reason::LinkLocalAddress));
        assert_eq!(
            reason_of("fe80::ffff:ffff:ffff:ffff"),
            Some(Reason::LinkLocalAddress)
        );
    }

    #[test]
    fn test_ipv6_public_accepted() {
        for host in ["2001:db8::1", "2001:4860:4860::8888", "2606:4700:4700::1111", "[2a00:1450::1]"] {
            assert_eq!(reason_of(host), None, "{host}");
        }
    }

    // ==================== Table ====================

    #[test]
    fn test_extra_ranges_checked_after_builtin() {
        let extra = AddressRange::new(
            "100.64.0.0/10".parse().unwrap(),
            Reason::PrivateRangeAddress,
        );
        let shadowed = AddressRange::new("127.0.0.0/8".parse().unwrap(), Reason::PrivateRangeAddress);
        let table = AddressRangeTable::with_extra([extra, shadowed]);

        assert_eq!(
            table.classify("100.64.0.1".parse().unwrap()),
            Some(Reason::PrivateRangeAddress)
        );
        assert_eq!(
            table.classify("127.0.0.1".parse().unwrap()),
            Some(Reason::LoopbackAddress)
        );
        assert_eq!(table.ranges().len(), AddressRangeTable::builtin().ranges().len() + 2);
    }

    #[test]
    fn test_range_display() {
        let range = IPV4_RANGES[0];
        assert_eq!(range.to_string(), "127.0.0.0/8 (loopback-address)");
    }

    #[test]
    fn test_is_loopback_v4() {
        assert!(is_loopback_v4(Ipv4Addr::new(127, 0, 0, 1)));
        assert!(is_loopback_v4(Ipv4Addr::new(127, 9, 9, 9)));
        assert!(!is_loopback_v4(Ipv4Addr::new(128, 0, 0, 1)));
    }
}
