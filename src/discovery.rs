use std::net::Ipv4Addr;

use pnet::util::MacAddr;
use tokio::sync::mpsc::UnboundedSender;

/// A host that answered one of the scan requests.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct DiscoveredHost {
    /// Interface the reply was captured on, `None` when the capture is
    /// shared across interfaces.
    pub interface: Option<String>,
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
}

/// Receives the outcome of a scan.
///
/// Both methods are invoked from within [`crate::Session::run`]; they should
/// return quickly since no probe is sent while they execute.
pub trait ScanHandler {
    /// Called once per accepted reply, duplicates included.
    fn on_discover(&mut self, host: DiscoveredHost);

    /// Called exactly once, when every interface is swept and the final wait
    /// has elapsed. Never called for an aborted scan.
    fn on_done(&mut self);
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ScanEvent {
    Discovered(DiscoveredHost),
    Done,
}

/// Forwards the scan outcome to a channel, e.g. to consume it from another task.
impl ScanHandler for UnboundedSender<ScanEvent> {
    fn on_discover(&mut self, host: DiscoveredHost) {
        // a dropped receiver only means nobody is listening anymore
        let _ = self.send(ScanEvent::Discovered(host));
    }

    fn on_done(&mut self) {
        let _ = self.send(ScanEvent::Done);
    }
}
