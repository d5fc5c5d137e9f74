use std::{fmt, num::NonZeroU32, str::FromStr, time::Duration};

use crate::constants::ANY_INTERFACE;
use crate::error::ConfigError;

/// Probe rate of a scan, the inverse of the delay between two probes on one
/// interface.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Harshness(NonZeroU32);

impl Harshness {
    pub const SLOW: Harshness = Harshness(NonZeroU32::MIN);
    pub const NORMAL: Harshness = Harshness(match NonZeroU32::new(20) {
        Some(value) => value,
        None => unreachable!(),
    });
    pub const FAST: Harshness = Harshness(match NonZeroU32::new(100) {
        Some(value) => value,
        None => unreachable!(),
    });
    pub const MAX: Harshness = Harshness(match NonZeroU32::new(1_000_000) {
        Some(value) => value,
        None => unreachable!(),
    });

    pub fn new(value: u32) -> Result<Self, ConfigError> {
        NonZeroU32::new(value)
            .map(Self)
            .ok_or(ConfigError::ZeroHarshness)
    }

    pub fn get(&self) -> u32 {
        self.0.get()
    }

    /// Delay between two consecutive probes of one interface.
    ///
    /// Values above [`Harshness::MAX`] yield a zero interval. Timers have
    /// millisecond resolution, so anything below a millisecond is rounded up
    /// by the runtime.
    pub fn pacing_interval(&self) -> Duration {
        Duration::from_micros(u64::from(1_000_000 / self.get()))
    }
}

impl Default for Harshness {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl FromStr for Harshness {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "slow" => Ok(Self::SLOW),
            "normal" => Ok(Self::NORMAL),
            "fast" => Ok(Self::FAST),
            "max" => Ok(Self::MAX),
            _ => s
                .parse::<u32>()
                .map_err(|_| ConfigError::UnknownHarshness(s.into()))
                .and_then(Self::new),
        }
    }
}

/// Which interfaces a scan runs on.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum InterfaceSelector {
    /// Every interface except loopback.
    Any,
    Named(String),
}

impl InterfaceSelector {
    pub fn matches(&self, interface_name: &str) -> bool {
        match self {
            InterfaceSelector::Any => true,
            InterfaceSelector::Named(name) => name == interface_name,
        }
    }
}

impl From<&str> for InterfaceSelector {
    fn from(name: &str) -> Self {
        if name == ANY_INTERFACE {
            InterfaceSelector::Any
        } else {
            InterfaceSelector::Named(name.into())
        }
    }
}

impl fmt::Display for InterfaceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceSelector::Any => f.write_str(ANY_INTERFACE),
            InterfaceSelector::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub selector: InterfaceSelector,
    pub harshness: Harshness,
    /// How many times each request is sent back-to-back.
    pub send_repeat: u32,
    /// Grace period for late replies once every interface is swept.
    pub final_wait: Duration,
    /// Enables diagnostic logging, has no effect on the scan itself.
    pub verbose: bool,
}

impl ScanConfig {
    pub const SEND_ONCE: u32 = 1;
    pub const SEND_TWICE: u32 = 2;
    pub const FINAL_WAIT_2SEC: Duration = Duration::from_secs(2);
}

#[derive(Debug, Clone)]
pub struct ScanConfigBuilder {
    selector: InterfaceSelector,
    harshness: Harshness,
    send_repeat: u32,
    final_wait: Duration,
    verbose: bool,
}

impl ScanConfigBuilder {
    pub fn new(selector: impl Into<InterfaceSelector>) -> Self {
        Self {
            selector: selector.into(),
            harshness: Harshness::NORMAL,
            send_repeat: ScanConfig::SEND_ONCE,
            final_wait: ScanConfig::FINAL_WAIT_2SEC,
            verbose: false,
        }
    }

    pub fn with_harshness(mut self, harshness: Harshness) -> Self {
        self.harshness = harshness;
        self
    }

    pub fn with_send_repeat(mut self, send_repeat: u32) -> Self {
        self.send_repeat = send_repeat;
        self
    }

    pub fn with_final_wait(mut self, final_wait: Duration) -> Self {
        self.final_wait = final_wait;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn build(self) -> Result<ScanConfig, ConfigError> {
        if self.send_repeat == 0 {
            return Err(ConfigError::ZeroSendRepeat);
        }
        Ok(ScanConfig {
            selector: self.selector,
            harshness: self.harshness,
            send_repeat: self.send_repeat,
            final_wait: self.final_wait,
            verbose: self.verbose,
        })
    }
}
