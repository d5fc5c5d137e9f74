//! Discovers live hosts on local Ethernet segments by sweeping the subnet of
//! each selected interface with ARP requests and collecting the replies.
//!
//! ## Example
//! Following example scans every non-loopback interface (or the one given with
//! `--iface`) and prints each host that answers.
//! ```rust,no_run
#![doc = include_str!("../demos/scan.rs")]
//! ```
//! Replies can also be consumed from another task by passing an
//! [`tokio::sync::mpsc::UnboundedSender<ScanEvent>`] as the handler.

macro_rules! verbose {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            log::debug!($($arg)+);
        }
    };
}

pub mod config;
pub mod discovery;
pub mod error;
pub mod link;
pub mod range;
pub mod request;
pub mod response;
pub mod session;

pub(crate) mod capture;
pub(crate) mod constants;
pub(crate) mod scanner;

pub use config::{Harshness, InterfaceSelector, ScanConfig, ScanConfigBuilder};
pub use discovery::{DiscoveredHost, ScanEvent, ScanHandler};
pub use error::{ConfigError, Error, Result};
pub use link::{AfPacketLink, Interface, Link};
pub use range::ScanRange;
pub use session::{Session, SessionState};
