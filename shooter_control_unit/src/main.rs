//! # Shooter Control Unit
//!
//! Receives target datagrams over UDP, runs the incremental PID and r-axis
//! state machine once per datagram and drives the motor channels through a
//! HAL driver selected by name.

use clap::Parser;
use shooter_common::consts::DEFAULT_CONFIG_PATH;
use shooter_common::control_unit::config::ControlUnitConfig;
use shooter_control_unit::config::{ConfigSource, Overrides, load_config};
use shooter_control_unit::cycle::{CycleRunner, rt_setup};
use shooter_control_unit::timer::MonotonicTimer;
use shooter_control_unit::transport::UdpCommandChannel;
use shooter_hal::DriverRegistry;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Shooter Control Unit: command-driven motor control loop
#[derive(Parser, Debug)]
#[command(name = "shooter_control_unit")]
#[command(version)]
#[command(about = "Command-driven PID and limit-switch control for the shooting conveyor")]
struct Args {
    /// Path to the control unit configuration TOML.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override `network.bind_addr`.
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// Override `network.receive_port`.
    #[arg(long)]
    port: Option<u16>,

    /// Override `hal.driver`.
    #[arg(long)]
    driver: Option<String>,

    /// CPU core to pin the control thread to (default: 1).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (default: 80).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let overrides = Overrides {
        bind_addr: args.bind.clone(),
        receive_port: args.port,
        driver: args.driver.clone(),
    };
    let loaded = match load_config(&args.config, &overrides) {
        Ok(loaded) => loaded,
        Err(e) => {
            setup_tracing(&args, "info");
            error!("FATAL: {e}");
            process::exit(1);
        }
    };
    setup_tracing(&args, loaded.cu_config.shared.log_level.as_directive());

    info!(
        "Shooter Control Unit v{} starting...",
        env!("CARGO_PKG_VERSION")
    );
    match &loaded.source {
        ConfigSource::File(path) => info!("Config loaded from {}", path.display()),
        ConfigSource::Defaults(path) => {
            warn!("Config {} not found, using built-in defaults", path.display())
        }
    }

    if let Err(e) = run(&args, loaded.cu_config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Shooter Control Unit shutdown complete");
}

fn run(args: &Args, cfg: ControlUnitConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Config OK: service={}, driver={}, pwm_limit={}, gains kp={} ki={} kd={}",
        cfg.shared.service_name,
        cfg.hal.driver,
        cfg.control.pwm_limit,
        cfg.gains.kp,
        cfg.gains.ki,
        cfg.gains.kd,
    );

    let registry = DriverRegistry::with_builtin();
    let hal = registry.create_driver(&cfg.hal.driver).inspect_err(|_| {
        error!("Available drivers: {:?}", registry.list_drivers());
    })?;

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(
        "RT setup complete (cpu_core={}, priority={})",
        args.cpu_core, args.rt_priority
    );

    let channel = UdpCommandChannel::bind(&cfg.network.bind_addr, cfg.network.receive_port)?;
    info!(
        "Listening for commands on {}:{}",
        cfg.network.bind_addr, cfg.network.receive_port
    );

    let mut runner = CycleRunner::new(&cfg, channel, hal, MonotonicTimer::new())?;

    let running = runner.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    if let Err(e) = runner.run() {
        error!("Control loop error: {e}");
        return Err(Box::new(e));
    }

    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, default_directive: &str) {
    let directive = if args.verbose {
        "debug"
    } else {
        default_directive
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
