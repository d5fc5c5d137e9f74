pub(crate) const MAC_ADDR_LEN: u8 = 6;
pub(crate) const IP_V4_LEN: u8 = 4;

pub(crate) const ETH_HEADER_LEN: usize = 14;
pub(crate) const ARP_FIXED_HEADER_LEN: usize = 8;
pub(crate) const ARP_PACK_LEN: usize = 28;
pub(crate) const ETH_PACK_LEN: usize = ETH_HEADER_LEN + ARP_PACK_LEN;

// sender hw (6) + sender proto (4) + target hw (6), then the target proto address
pub(crate) const TARGET_PROTO_OFFSET: usize = ETH_HEADER_LEN + ARP_FIXED_HEADER_LEN + 16;

// large enough for a full Ethernet frame, ARP replies are padded to 60 bytes
pub(crate) const CAPTURE_BUF_LEN: usize = 1518;

pub(crate) const LOOPBACK_NAME: &str = "lo";
pub(crate) const ANY_INTERFACE: &str = "any";

// classic BPF `ret #0`, accepts no frame
pub(crate) const DISCARD_ALL: (u16, u8, u8, u32) = (0x06, 0, 0, 0);
