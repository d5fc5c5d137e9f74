use std::net::Ipv4Addr;

/// Inclusive range of addresses swept on one interface.
///
/// The range covers the whole subnet the interface address belongs to,
/// network and broadcast addresses included.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ScanRange {
    start: u32,
    end: u32,
}

impl ScanRange {
    /// Computes the subnet range of `ip` for the given prefix length.
    ///
    /// Prefix lengths above 32 are not rejected, they collapse into a
    /// single-address range holding `ip` itself.
    pub fn new(ip: Ipv4Addr, prefix: u8) -> Self {
        let ip = u32::from(ip);
        let host_bits = 32u32.saturating_sub(u32::from(prefix));
        let start = ip
            .checked_shr(host_bits)
            .and_then(|net| net.checked_shl(host_bits))
            .unwrap_or(0);
        let host_mask = u32::MAX.checked_shl(host_bits).map_or(u32::MAX, |mask| !mask);
        Self {
            start,
            end: start | host_mask,
        }
    }

    pub fn start(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.start)
    }

    pub fn end(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.end)
    }

    /// Number of addresses in the range, `2^32` for a `/0`.
    pub fn len(&self) -> u64 {
        u64::from(self.end - self.start) + 1
    }

    /// A range always holds at least the interface address.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        (self.start..=self.end).contains(&u32::from(ip))
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub(crate) enum CursorStep {
    Advanced,
    Exhausted,
}

/// Walks a [`ScanRange`] in increasing order, one address per step.
#[derive(Clone, Debug)]
pub(crate) struct ScanCursor {
    range: ScanRange,
    current: u32,
}

impl ScanCursor {
    pub(crate) fn new(range: ScanRange) -> Self {
        Self {
            range,
            current: range.start,
        }
    }

    pub(crate) fn current(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.current)
    }

    // never moves past `end`, so `start <= current <= end` always holds
    pub(crate) fn advance(&mut self) -> CursorStep {
        if self.current == self.range.end {
            return CursorStep::Exhausted;
        }
        self.current += 1;
        CursorStep::Advanced
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use ipnet::Ipv4Net;

    use super::{CursorStep, ScanCursor, ScanRange};

    #[test]
    fn test_range_class_c() {
        let range = ScanRange::new(Ipv4Addr::new(192, 168, 1, 10), 24);
        assert_eq!(range.start(), Ipv4Addr::new(192, 168, 1, 0));
        assert_eq!(range.end(), Ipv4Addr::new(192, 168, 1, 255));
        assert_eq!(range.len(), 256);
    }

    #[test]
    fn test_range_single_host() {
        let ip = Ipv4Addr::new(10, 20, 30, 40);
        let range = ScanRange::new(ip, 32);
        assert_eq!(range.start(), ip);
        assert_eq!(range.end(), ip);
        assert_eq!(range.len(), 1);
    }

    #[test]
    fn test_range_whole_space() {
        let range = ScanRange::new(Ipv4Addr::new(172, 16, 4, 1), 0);
        assert_eq!(range.start(), Ipv4Addr::UNSPECIFIED);
        assert_eq!(range.end(), Ipv4Addr::BROADCAST);
        assert_eq!(range.len(), 1 << 32);
    }

    #[test]
    fn test_range_oversized_prefix() {
        let ip = Ipv4Addr::new(10, 0, 0, 7);
        let range = ScanRange::new(ip, 40);
        assert_eq!(range.start(), ip);
        assert_eq!(range.end(), ip);
    }

    #[test]
    fn test_range_matches_ipnet() {
        let ip = Ipv4Addr::new(203, 0, 113, 77);
        for prefix in 0..=32 {
            let net = Ipv4Net::new(ip, prefix).unwrap();
            let range = ScanRange::new(ip, prefix);
            assert_eq!(range.start(), net.network(), "prefix /{}", prefix);
            assert_eq!(range.end(), net.broadcast(), "prefix /{}", prefix);
            assert!(range.contains(ip));
        }
    }

    #[test]
    fn test_cursor_walks_inclusive_range() {
        let range = ScanRange::new(Ipv4Addr::new(10, 1, 1, 1), 30);
        let mut cursor = ScanCursor::new(range);
        let mut visited = vec![cursor.current()];
        while cursor.advance() == CursorStep::Advanced {
            visited.push(cursor.current());
        }
        assert_eq!(
            visited,
            (0..4).map(|d| Ipv4Addr::new(10, 1, 1, d)).collect::<Vec<_>>()
        );
        assert_eq!(cursor.advance(), CursorStep::Exhausted);
        assert_eq!(cursor.current(), range.end());
    }

    #[test]
    fn test_cursor_stops_at_top_of_address_space() {
        let mut cursor = ScanCursor::new(ScanRange::new(Ipv4Addr::BROADCAST, 31));
        assert_eq!(cursor.current(), Ipv4Addr::new(255, 255, 255, 254));
        assert_eq!(cursor.advance(), CursorStep::Advanced);
        assert_eq!(cursor.advance(), CursorStep::Exhausted);
        assert_eq!(cursor.current(), Ipv4Addr::BROADCAST);
    }
}
