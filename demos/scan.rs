use std::io::Write;
use std::time::Duration;

use async_arpscan::{
    AfPacketLink, DiscoveredHost, Harshness, ScanConfig, ScanConfigBuilder, ScanHandler, Session,
};
use clap::Parser;

/// Simple example to show ARP scanning capabilities
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Network interface to scan, `any` scans every non-loopback interface
    #[arg(short, long, default_value = "any")]
    iface: String,

    /// Probe rate: slow, normal, fast, max or requests per second
    #[arg(long, default_value = "max")]
    harshness: Harshness,

    /// How many times each request is sent
    #[arg(short, long, default_value_t = ScanConfig::SEND_ONCE)]
    repeat: u32,

    /// Seconds to wait for late replies once the sweep is over
    #[arg(short, long, default_value_t = 2)]
    final_wait: u64,

    /// Log scanner diagnostics
    #[arg(short, long)]
    verbose: bool,
}

struct Printer;

impl ScanHandler for Printer {
    fn on_discover(&mut self, host: DiscoveredHost) {
        let mut stdout = std::io::stdout().lock();
        writeln!(
            stdout,
            "{}: {} ({})",
            host.interface.as_deref().unwrap_or("-"),
            host.ip,
            host.mac
        )
        .unwrap();
    }

    fn on_done(&mut self) {}
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    let config = ScanConfigBuilder::new(args.iface.as_str())
        .with_harshness(args.harshness)
        .with_send_repeat(args.repeat)
        .with_final_wait(Duration::from_secs(args.final_wait))
        .with_verbose(args.verbose)
        .build()
        .unwrap();

    let mut session = Session::new(&AfPacketLink, config, None).unwrap();
    session.run(&mut Printer).await.unwrap();
}
