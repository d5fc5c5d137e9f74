use std::{collections::BTreeMap, time::Duration};

use futures::future::poll_fn;
use log::trace;
use tokio::time::Instant;
use tokio_util::{sync::CancellationToken, time::DelayQueue};

use crate::capture::{Capture, FrameRef, Tap};
use crate::config::ScanConfig;
use crate::constants::LOOPBACK_NAME;
use crate::discovery::{DiscoveredHost, ScanHandler};
use crate::error::{Error, Result};
use crate::link::Link;
use crate::response::parse_arp_reply;
use crate::scanner::{Scanner, Tick};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
struct ScannerId(usize);

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SessionState {
    /// At least one interface is still being swept.
    Active,
    /// Every interface is swept, late replies are still collected.
    Draining,
    /// The scan completed, was aborted or the session was closed.
    Done,
}

/// An ARP scan over one or more local interfaces.
///
/// The session sweeps the subnet of every selected interface, sending one
/// broadcast request per address and pacing requests according to the
/// configured [`crate::Harshness`]. Replies are reported through a
/// [`ScanHandler`] while [`Session::run`] is polled.
///
/// # Example
/// ```no_run
/// use async_arpscan::{
///     AfPacketLink, DiscoveredHost, ScanConfigBuilder, ScanHandler, Session,
/// };
///
/// struct Printer;
///
/// impl ScanHandler for Printer {
///     fn on_discover(&mut self, host: DiscoveredHost) {
///         println!("{} is at {}", host.ip, host.mac);
///     }
///
///     fn on_done(&mut self) {
///         println!("scan finished");
///     }
/// }
///
/// tokio_test::block_on(async {
///     let config = ScanConfigBuilder::new("eth0").build().unwrap();
///     let mut session = Session::new(&AfPacketLink, config, None).unwrap();
///     session.run(&mut Printer).await.unwrap();
/// })
/// ```
pub struct Session<'c, L: Link> {
    config: ScanConfig,
    scanners: BTreeMap<ScannerId, Scanner<L::Tx>>,
    timers: DelayQueue<ScannerId>,
    capture: Capture<'c, L::Rx>,
    done_at: Option<Instant>,
    state: SessionState,
    cancel: CancellationToken,
}

impl<'c, L: Link> Session<'c, L> {
    /// Creates a session scanning every interface of `link` matching the
    /// configured selector. Loopback interfaces are never scanned.
    ///
    /// Replies are read from `capture` when given, the session then borrows
    /// it and cannot tell which interface a reply arrived on. Otherwise a
    /// capture is opened on each scanned interface and released with the
    /// session.
    ///
    /// The first request of every interface goes out one pacing interval
    /// after this call. Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns [`Error::NoInterface`] if no interface matched, or the error
    /// of the first send or capture handle that could not be opened. Nothing
    /// acquired up to that point is kept.
    pub fn new(link: &L, config: ScanConfig, capture: Option<&'c mut L::Rx>) -> Result<Self> {
        let pacing = config.harshness.pacing_interval();
        let mut scanners = BTreeMap::new();
        let mut timers = DelayQueue::new();
        let mut taps = Vec::new();

        for (idx, interface) in link.interfaces()?.into_iter().enumerate() {
            if interface.loopback || interface.name == LOOPBACK_NAME {
                verbose!(config.verbose, "skipping loopback interface {}", interface.name);
                continue;
            }
            if !config.selector.matches(&interface.name) {
                continue;
            }

            let range = interface.range();
            verbose!(
                config.verbose,
                "{}: scanning {} - {} from {}/{} ({} addresses)",
                interface.name,
                range.start(),
                range.end(),
                interface.ip,
                interface.prefix,
                range.len()
            );
            let tx = if capture.is_none() {
                let (tx, rx) = link.open(&interface)?;
                taps.push(Tap::new(Some(interface.name.clone()), rx));
                tx
            } else {
                link.open_tx(&interface)?
            };
            let mut scanner = Scanner::new(&interface, tx)?;

            let id = ScannerId(idx);
            scanner.timer = Some(timers.insert(id, pacing));
            scanners.insert(id, scanner);
        }

        if scanners.is_empty() {
            return Err(Error::NoInterface(config.selector.to_string()));
        }

        let capture = match capture {
            Some(shared) => Capture::Shared(Tap::new(None, shared)),
            None => Capture::owned(taps),
        };
        Ok(Self {
            config,
            scanners,
            timers,
            capture,
            done_at: None,
            state: SessionState::Active,
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of interfaces still being swept.
    pub fn active_scanners(&self) -> usize {
        self.scanners.len()
    }

    /// Token aborting the scan when cancelled.
    ///
    /// An aborted [`Session::run`] returns without calling the handler again,
    /// [`ScanHandler::on_done`] included.
    pub fn abort_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drives the scan until it completes or is aborted.
    ///
    /// Every accepted reply is passed to [`ScanHandler::on_discover`]. Once
    /// the last interface is swept and the final wait has elapsed,
    /// [`ScanHandler::on_done`] is called and this returns. Returns
    /// immediately on a session that is already done.
    ///
    /// The returned future may be dropped before it completes, for example
    /// when raced against a timeout. A request interrupted that way is sent
    /// again by the next call.
    ///
    /// # Errors
    /// Returns [`Error::Capture`] if reading captured traffic fails, the
    /// session is closed in that case.
    pub async fn run<H: ScanHandler>(&mut self, handler: &mut H) -> Result<()> {
        self.rearm_interrupted();
        let cancel = self.cancel.clone();
        while self.state != SessionState::Done {
            let done_at = self.done_at;
            tokio::select! {
                // an abort wins over anything else that is ready
                biased;

                _ = cancel.cancelled() => {
                    verbose!(self.config.verbose, "scan aborted");
                    self.close();
                }
                Some(expired) = poll_fn(|cx| self.timers.poll_expired(cx)), if !self.timers.is_empty() => {
                    self.tick(expired.into_inner()).await;
                }
                frame = poll_fn(|cx| self.capture.poll_frame(cx)) => match frame {
                    Ok(frame) => self.handle_frame(frame, handler),
                    Err(err) => {
                        self.close();
                        return Err(Error::Capture(err));
                    }
                },
                _ = sleep_until(done_at), if done_at.is_some() => {
                    verbose!(self.config.verbose, "scan done");
                    self.close();
                    handler.on_done();
                }
            }
        }
        Ok(())
    }

    /// Releases every scanner and the capture if the session opened it.
    ///
    /// No callback is invoked afterwards. Calling it again has no effect.
    pub fn close(&mut self) {
        for scanner in self.scanners.values_mut() {
            if let Some(key) = scanner.timer.take() {
                self.timers.try_remove(&key);
            }
        }
        self.scanners.clear();
        self.capture.release();
        self.done_at = None;
        self.state = SessionState::Done;
    }

    // a scanner loses its timer while ticking, if the tick never finished
    // nothing would wake it again
    fn rearm_interrupted(&mut self) {
        for (id, scanner) in self.scanners.iter_mut() {
            if scanner.timer.is_none() {
                verbose!(self.config.verbose, "{}: resuming sweep", scanner.interface());
                scanner.timer = Some(self.timers.insert(*id, Duration::ZERO));
            }
        }
    }

    async fn tick(&mut self, id: ScannerId) {
        let Some(scanner) = self.scanners.get_mut(&id) else {
            return;
        };
        scanner.timer = None;
        let outcome = scanner.tick(self.config.send_repeat).await;
        match outcome {
            Tick::Rearm => {
                let pacing = self.config.harshness.pacing_interval();
                scanner.timer = Some(self.timers.insert(id, pacing));
            }
            Tick::Finished => self.retire(id),
        }
    }

    fn retire(&mut self, id: ScannerId) {
        if let Some(scanner) = self.scanners.remove(&id) {
            verbose!(
                self.config.verbose,
                "{}: swept {} addresses",
                scanner.interface(),
                scanner.range().len()
            );
        }
        if self.scanners.is_empty() {
            verbose!(
                self.config.verbose,
                "all interfaces swept, waiting {:?} for late replies",
                self.config.final_wait
            );
            self.done_at = Some(Instant::now() + self.config.final_wait);
            self.state = SessionState::Draining;
        }
    }

    fn handle_frame<H: ScanHandler>(&self, frame: FrameRef, handler: &mut H) {
        let (interface, bytes) = self.capture.frame(frame);
        match parse_arp_reply(bytes) {
            Ok(reply) => handler.on_discover(DiscoveredHost {
                interface: interface.map(str::to_owned),
                ip: reply.sender_ip,
                mac: reply.sender_mac,
            }),
            Err(rejection) if rejection.is_background() => {
                if self.config.verbose {
                    trace!("ignoring frame: {}", rejection);
                }
            }
            Err(rejection) => {
                verbose!(self.config.verbose, "dropping frame: {}", rejection);
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
