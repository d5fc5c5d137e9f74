use log::warn;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::time::delay_queue::Key;

use crate::error::Result;
use crate::link::Interface;
use crate::range::{CursorStep, ScanCursor, ScanRange};
use crate::request::RequestTemplate;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum Tick {
    /// More addresses remain, the scanner wants another tick.
    Rearm,
    /// The last address of the range was probed.
    Finished,
}

/// Sweeps the subnet of a single interface, one address per tick.
pub(crate) struct Scanner<W> {
    interface: String,
    range: ScanRange,
    tx: W,
    template: RequestTemplate,
    cursor: ScanCursor,
    /// Pending tick, if any.
    pub(crate) timer: Option<Key>,
}

impl<W: AsyncWrite + Unpin> Scanner<W> {
    pub(crate) fn new(interface: &Interface, tx: W) -> Result<Self> {
        let range = interface.range();
        Ok(Self {
            interface: interface.name.clone(),
            range,
            tx,
            template: RequestTemplate::new(interface.mac, interface.ip)?,
            cursor: ScanCursor::new(range),
            timer: None,
        })
    }

    pub(crate) fn interface(&self) -> &str {
        &self.interface
    }

    pub(crate) fn range(&self) -> ScanRange {
        self.range
    }

    /// Probes the current address `send_repeat` times and moves on.
    ///
    /// Send failures are logged and otherwise ignored, the sweep always
    /// progresses.
    pub(crate) async fn tick(&mut self, send_repeat: u32) -> Tick {
        let target_ip = self.cursor.current();
        self.template.set_target(target_ip);
        for _ in 0..send_repeat {
            if let Err(err) = self.tx.write_all(self.template.as_bytes()).await {
                warn!(
                    "{}: failed to send request for {}, reason: {}",
                    self.interface, target_ip, err
                );
            }
        }
        match self.cursor.advance() {
            CursorStep::Advanced => Tick::Rearm,
            CursorStep::Exhausted => Tick::Finished,
        }
    }
}
