// Licensed under the Apache-2.0 license

use std::process::ExitCode;
use std::time::Duration;

use accel_config::emulator::{DEFAULT_TEST_CONFIG, EMULATOR_MEMORY_MAP};
use accel_config::AccelTestConfig;
use anyhow::Context;
use clap::{Parser, ValueEnum};
use clap_num::maybe_hex;
use emulator_periph::{EmulatedSoc, Invert, Passthrough, StreamTransform};
use log::{debug, LevelFilter};
use poll_common::{PollBudget, WallClock};
use simple_logger::SimpleLogger;
use tests_accel_stream::{run_emulated, TickDeadline, VerificationReport};

/// Accelerator placed on the stream by the emulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Transform {
    /// Bitwise inverter, the design under test
    Invert,
    /// Loopback that leaves the data unmodified
    Passthrough,
}

impl Transform {
    fn build(self) -> Box<dyn StreamTransform> {
        match self {
            Transform::Invert => Box::new(Invert),
            Transform::Passthrough => Box::new(Passthrough),
        }
    }
}

/// Streams a known pattern through the AXI-Stream accelerator and checks
/// that every word comes back inverted.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// DMA engine device id
    #[arg(long, default_value_t = DEFAULT_TEST_CONFIG.dma_device_id)]
    device_id: u32,

    /// TX buffer base address
    #[arg(long, value_parser=maybe_hex::<u32>, default_value_t = DEFAULT_TEST_CONFIG.tx_base)]
    tx_base: u32,

    /// RX buffer base address
    #[arg(long, value_parser=maybe_hex::<u32>, default_value_t = DEFAULT_TEST_CONFIG.rx_base)]
    rx_base: u32,

    /// Transfer length in bytes
    #[arg(long, value_parser=maybe_hex::<u32>, default_value_t = DEFAULT_TEST_CONFIG.length as u32)]
    length: u32,

    /// Give up after this many status polls. Unbounded when not set.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    poll_budget: Option<u64>,

    /// Give up after this many emulated clock ticks
    #[arg(long, default_value_t = 1_000_000)]
    tick_timeout: u64,

    /// Give up after this many milliseconds of host time
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,

    /// Run on hardware through this UIO device instead of the emulator
    #[cfg(feature = "fpga_realtime")]
    #[arg(long)]
    uio: Option<usize>,

    /// UIO mapping index of the DMA register window
    #[cfg(feature = "fpga_realtime")]
    #[arg(long, default_value_t = 0)]
    uio_dma_mapping: usize,

    /// UIO mapping index of the DDR region holding the buffers
    #[cfg(feature = "fpga_realtime")]
    #[arg(long, default_value_t = 1)]
    uio_ddr_mapping: usize,

    /// Physical base of the DDR mapping
    #[cfg(feature = "fpga_realtime")]
    #[arg(long, value_parser=maybe_hex::<u32>, default_value_t = DEFAULT_TEST_CONFIG.tx_base)]
    uio_ddr_base: u32,

    /// Size of the DDR mapping in bytes
    #[cfg(feature = "fpga_realtime")]
    #[arg(long, value_parser=maybe_hex::<u32>, default_value_t = 0x0020_0000)]
    uio_ddr_size: u32,

    #[arg(long, value_enum, default_value_t = Transform::Invert)]
    transform: Transform,

    /// off, error, warn, info, debug or trace
    #[arg(long, value_parser = parse_level_filter, default_value = "info")]
    log_level: LevelFilter,

    /// Exit with status 2 when verification finds mismatches
    #[arg(long, default_value_t = false)]
    fail_on_mismatch: bool,
}

fn parse_level_filter(s: &str) -> Result<LevelFilter, String> {
    s.parse().map_err(|_| format!("unknown log level: {}", s))
}

fn run(args: &Args) -> anyhow::Result<VerificationReport> {
    let config = AccelTestConfig {
        dma_device_id: args.device_id,
        tx_base: args.tx_base,
        rx_base: args.rx_base,
        length: args.length as usize,
    };
    let budget = match args.poll_budget {
        Some(polls) => PollBudget::new(polls),
        None => PollBudget::unbounded(),
    };
    let wall = WallClock::from_now(Duration::from_millis(args.timeout_ms));

    #[cfg(feature = "fpga_realtime")]
    if let Some(device) = args.uio {
        use accel_config::emulator::EMULATOR_DMA_CONFIG_TABLE;
        use accel_config::PlatformMemoryMap;
        use tests_accel_stream::fpga::{run_uio, UioLayout};

        let layout = UioLayout {
            device,
            dma_mapping: args.uio_dma_mapping,
            ddr_mapping: args.uio_ddr_mapping,
        };
        let map = PlatformMemoryMap {
            ddr_offset: args.uio_ddr_base,
            ddr_size: args.uio_ddr_size,
            ..EMULATOR_MEMORY_MAP
        };
        return run_uio(
            layout,
            &map,
            EMULATOR_DMA_CONFIG_TABLE,
            &config,
            &mut (budget, wall),
        )
        .context("accelerator test aborted on hardware");
    }

    let soc = EmulatedSoc::new(&EMULATOR_MEMORY_MAP, args.transform.build());
    let mut deadline = (budget, (TickDeadline::new(&soc, args.tick_timeout), wall));
    run_emulated(&soc, &config, &mut deadline).context("accelerator test aborted")
}

/// 0 once the test ran to completion, 2 for mismatches when asked to fail on
/// them, 1 when the run was cut short. The error itself is already logged.
fn exit_status(result: &anyhow::Result<VerificationReport>, fail_on_mismatch: bool) -> u8 {
    match result {
        Ok(report) if fail_on_mismatch && !report.passed() => 2,
        Ok(_) => 0,
        Err(_) => 1,
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = SimpleLogger::new().with_level(args.log_level).init() {
        eprintln!("failed to install logger: {}", e);
        return ExitCode::FAILURE;
    }

    let result = run(&args);
    if let Err(e) = &result {
        debug!("{:?}", e);
    }
    ExitCode::from(exit_status(&result, args.fail_on_mismatch))
}

#[cfg(test)]
mod test {
    use super::*;
    use tests_accel_stream::{verify, AccelTestError};

    fn report(transform: impl Fn(u32) -> u32) -> VerificationReport {
        let tx: Vec<u32> = (0..32).collect();
        let rx: Vec<u32> = tx.iter().map(|&w| transform(w)).collect();
        verify(&tx, &rx, 128)
    }

    #[test]
    fn test_exit_status() {
        let passed = Ok(report(|w| !w));
        let mismatched = Ok(report(|w| w));
        let aborted: anyhow::Result<VerificationReport> =
            Err(AccelTestError::ConfigNotFound(3)).context("accelerator test aborted");

        assert_eq!(exit_status(&passed, false), 0);
        assert_eq!(exit_status(&passed, true), 0);
        assert_eq!(exit_status(&mismatched, false), 0);
        assert_eq!(exit_status(&mismatched, true), 2);
        assert_eq!(exit_status(&aborted, false), 1);
        assert_eq!(exit_status(&aborted, true), 1);
    }

    #[test]
    fn test_emulated_run_exit_status() {
        let args = Args::parse_from(["accel-stream-test", "--transform", "passthrough"]);
        let result = run(&args);
        assert_eq!(exit_status(&result, false), 0);
        assert_eq!(exit_status(&result, true), 2);

        let args = Args::parse_from(["accel-stream-test", "--device-id", "5"]);
        let result = run(&args);
        assert_eq!(exit_status(&result, false), 1);
        assert_eq!(
            result.unwrap_err().downcast_ref::<AccelTestError>(),
            Some(&AccelTestError::ConfigNotFound(5))
        );
    }

    #[test]
    fn test_zero_poll_budget_is_rejected() {
        assert!(Args::try_parse_from(["accel-stream-test", "--poll-budget", "0"]).is_err());
        assert!(Args::try_parse_from(["accel-stream-test", "--poll-budget", "1"]).is_ok());
    }
}
