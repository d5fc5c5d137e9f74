use std::{io, net::Ipv4Addr};

use afpacket::tokio::RawPacketStream;
use pnet::{
    datalink::{self, NetworkInterface},
    ipnetwork::IpNetwork,
    util::MacAddr,
};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::constants::DISCARD_ALL;
use crate::error::{Error, Result};
use crate::range::ScanRange;

/// A system interface eligible for scanning.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Interface {
    pub name: String,
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
    pub prefix: u8,
    pub loopback: bool,
}

impl Interface {
    /// Addresses swept when scanning this interface.
    pub fn range(&self) -> ScanRange {
        ScanRange::new(self.ip, self.prefix)
    }

    /// Takes the first IPv4 address of a datalink interface.
    ///
    /// Returns `None` for interfaces without a hardware address or IPv4 address.
    pub fn from_datalink(interface: &NetworkInterface) -> Option<Self> {
        let mac = interface.mac?;
        let net = interface.ips.iter().find_map(|net| match net {
            IpNetwork::V4(net) => Some(*net),
            IpNetwork::V6(_) => None,
        })?;
        Some(Self {
            name: interface.name.clone(),
            mac,
            ip: net.ip(),
            prefix: net.prefix(),
            loopback: interface.is_loopback(),
        })
    }
}

/// Access to the link layer: interface enumeration, frame sending and capture.
///
/// Every read from an [`Link::Rx`] yields exactly one frame, every write to a
/// [`Link::Tx`] sends exactly one frame.
pub trait Link {
    type Tx: AsyncWrite + Unpin;
    type Rx: AsyncRead + Unpin;

    fn interfaces(&self) -> Result<Vec<Interface>>;

    /// Opens one handle on `interface`, used both to send and to capture.
    fn open(&self, interface: &Interface) -> Result<(Self::Tx, Self::Rx)>;

    /// Opens a handle on `interface` that is only ever written to.
    fn open_tx(&self, interface: &Interface) -> Result<Self::Tx>;
}

/// [`Link`] backed by Linux `AF_PACKET` sockets.
///
/// Opening streams requires a running tokio runtime and `CAP_NET_RAW`.
#[derive(Copy, Clone, Default, Debug)]
pub struct AfPacketLink;

impl AfPacketLink {
    fn bind(interface: &Interface, discard: bool) -> io::Result<RawPacketStream> {
        let mut stream = RawPacketStream::new()?;
        if discard {
            // the socket sees every frame on the host until it is bound
            stream.set_bpf_filter(vec![DISCARD_ALL])?;
        }
        stream.bind(&interface.name)?;
        if discard {
            stream.drain();
        }
        Ok(stream)
    }

    fn open_stream(interface: &Interface, discard: bool) -> Result<RawPacketStream> {
        Self::bind(interface, discard).map_err(|source| Error::Open {
            interface: interface.name.clone(),
            source,
        })
    }
}

impl Link for AfPacketLink {
    type Tx = RawPacketStream;
    type Rx = RawPacketStream;

    fn interfaces(&self) -> Result<Vec<Interface>> {
        Ok(datalink::interfaces()
            .iter()
            .filter_map(Interface::from_datalink)
            .collect())
    }

    fn open(&self, interface: &Interface) -> Result<(Self::Tx, Self::Rx)> {
        let stream = Self::open_stream(interface, false)?;
        Ok((stream.clone(), stream))
    }

    /// The returned socket drops everything it would receive, so frames seen
    /// on the interface are not queued for a reader that never comes.
    fn open_tx(&self, interface: &Interface) -> Result<Self::Tx> {
        Self::open_stream(interface, true)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::{
        cell::{Cell, RefCell},
        collections::HashMap,
        io,
        net::Ipv4Addr,
        pin::Pin,
        rc::Rc,
        task::{ready, Context, Poll},
    };

    use pnet::{
        packet::{arp::ArpPacket, ethernet::EthernetPacket, Packet},
        util::MacAddr,
    };
    use tokio::{
        io::{AsyncRead, AsyncWrite, ReadBuf},
        sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
        time::Instant,
    };

    use super::{Interface, Link};
    use crate::error::{Error, Result};

    pub(crate) fn interface(name: &str, ip: Ipv4Addr, prefix: u8) -> Interface {
        let last = ip.octets()[3];
        Interface {
            name: name.into(),
            mac: MacAddr::new(0x02, 0, 0, 0, 0, last),
            ip,
            prefix,
            loopback: false,
        }
    }

    #[derive(Clone, Debug)]
    pub(crate) struct SentFrame {
        pub(crate) interface: String,
        pub(crate) bytes: Vec<u8>,
        pub(crate) at: Instant,
    }

    impl SentFrame {
        pub(crate) fn target_ip(&self) -> Ipv4Addr {
            let eth_packet = EthernetPacket::new(&self.bytes).unwrap();
            ArpPacket::new(eth_packet.payload())
                .unwrap()
                .get_target_proto_addr()
        }
    }

    #[derive(Copy, Clone, Eq, PartialEq, Debug)]
    pub(crate) enum Handle {
        /// One handle serving both sending and capture.
        Paired,
        SendOnly,
    }

    /// Shared record of everything that crossed the fake wire.
    #[derive(Default, Debug)]
    pub(crate) struct Wire {
        pub(crate) sent: RefCell<Vec<SentFrame>>,
        pub(crate) opened: RefCell<Vec<(String, Handle)>>,
        pub(crate) tx_released: Cell<usize>,
        pub(crate) rx_released: Cell<usize>,
        /// Writes stay pending while set.
        pub(crate) stalled: Cell<bool>,
    }

    pub(crate) struct MockTx {
        interface: String,
        wire: Rc<Wire>,
    }

    impl AsyncWrite for MockTx {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.wire.stalled.get() {
                return Poll::Pending;
            }
            self.wire.sent.borrow_mut().push(SentFrame {
                interface: self.interface.clone(),
                bytes: buf.to_vec(),
                at: Instant::now(),
            });
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    impl Drop for MockTx {
        fn drop(&mut self) {
            self.wire.tx_released.set(self.wire.tx_released.get() + 1);
        }
    }

    pub(crate) struct MockRx {
        frames: UnboundedReceiver<Vec<u8>>,
        wire: Rc<Wire>,
        failing: bool,
    }

    impl MockRx {
        pub(crate) fn new(wire: Rc<Wire>) -> (UnboundedSender<Vec<u8>>, Self) {
            let (sender, frames) = mpsc::unbounded_channel();
            let rx = Self {
                frames,
                wire,
                failing: false,
            };
            (sender, rx)
        }
    }

    impl AsyncRead for MockRx {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.failing {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::NetworkDown,
                    "interface went away",
                )));
            }
            if let Some(frame) = ready!(self.frames.poll_recv(cx)) {
                let len = frame.len().min(buf.remaining());
                buf.put_slice(&frame[..len]);
            }
            Poll::Ready(Ok(()))
        }
    }

    impl Drop for MockRx {
        fn drop(&mut self) {
            self.wire.rx_released.set(self.wire.rx_released.get() + 1);
        }
    }

    #[derive(Default)]
    pub(crate) struct MockLink {
        pub(crate) interfaces: Vec<Interface>,
        pub(crate) wire: Rc<Wire>,
        pub(crate) broken: Option<String>,
        pub(crate) failing_capture: Option<String>,
        injectors: RefCell<HashMap<String, UnboundedSender<Vec<u8>>>>,
    }

    impl MockLink {
        pub(crate) fn new(interfaces: Vec<Interface>) -> Self {
            Self {
                interfaces,
                ..Default::default()
            }
        }

        /// Interface whose send handle cannot be opened.
        pub(crate) fn with_broken(mut self, name: &str) -> Self {
            self.broken = Some(name.into());
            self
        }

        /// Interface whose capture fails on the first read.
        pub(crate) fn with_failing_capture(mut self, name: &str) -> Self {
            self.failing_capture = Some(name.into());
            self
        }

        /// Feeds frames into the capture tap opened for `name`.
        pub(crate) fn injector(&self, name: &str) -> UnboundedSender<Vec<u8>> {
            self.injectors.borrow()[name].clone()
        }

        /// Closes the capture tap of `name`, its reader sees end of stream.
        pub(crate) fn disconnect(&self, name: &str) {
            self.injectors.borrow_mut().remove(name);
        }

        pub(crate) fn sent(&self) -> Vec<SentFrame> {
            self.wire.sent.borrow().clone()
        }

        pub(crate) fn opened(&self) -> Vec<(String, Handle)> {
            self.wire.opened.borrow().clone()
        }

        fn tx(&self, interface: &Interface) -> Result<MockTx> {
            if self.broken.as_deref() == Some(interface.name.as_str()) {
                return Err(Error::Open {
                    interface: interface.name.clone(),
                    source: io::Error::new(io::ErrorKind::PermissionDenied, "no CAP_NET_RAW"),
                });
            }
            Ok(MockTx {
                interface: interface.name.clone(),
                wire: Rc::clone(&self.wire),
            })
        }
    }

    impl Link for MockLink {
        type Tx = MockTx;
        type Rx = MockRx;

        fn interfaces(&self) -> Result<Vec<Interface>> {
            Ok(self.interfaces.clone())
        }

        fn open(&self, interface: &Interface) -> Result<(Self::Tx, Self::Rx)> {
            let tx = self.tx(interface)?;
            let (sender, mut rx) = MockRx::new(Rc::clone(&self.wire));
            rx.failing = self.failing_capture.as_deref() == Some(interface.name.as_str());
            self.injectors
                .borrow_mut()
                .insert(interface.name.clone(), sender);
            self.wire
                .opened
                .borrow_mut()
                .push((interface.name.clone(), Handle::Paired));
            Ok((tx, rx))
        }

        fn open_tx(&self, interface: &Interface) -> Result<Self::Tx> {
            let tx = self.tx(interface)?;
            self.wire
                .opened
                .borrow_mut()
                .push((interface.name.clone(), Handle::SendOnly));
            Ok(tx)
        }
    }
}
