//! regsim request replay tool
//!
//! Builds a device from a JSON configuration and replays a JSON array of
//! requests against it, printing one JSON response per line. Without
//! `--requests` the configuration is only validated.

use std::path::PathBuf;
use std::time::Instant;

use tracing_subscriber::EnvFilter;

use regsim::{Device, DeviceConfig, RegisterStore, Request, StaticModules};

/// Tool configuration
struct Config {
    /// Device configuration file
    config: Option<PathBuf>,
    /// Request script to replay
    requests: Option<PathBuf>,
    /// tracing filter directive
    log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config: None,
            requests: None,
            log: "regsim=info".to_string(),
        }
    }
}

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config.config = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("error: --config requires a value");
                    std::process::exit(1);
                }
            }
            "--requests" | "-r" => {
                if i + 1 < args.len() {
                    config.requests = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("error: --requests requires a value");
                    std::process::exit(1);
                }
            }
            "--log" | "-l" => {
                if i + 1 < args.len() {
                    config.log.clone_from(&args[i + 1]);
                    i += 2;
                } else {
                    eprintln!("error: --log requires a value");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                println!("regsim - register device simulator");
                println!();
                println!("USAGE:");
                println!("    regsim --config <FILE> [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -c, --config <FILE>       Device configuration (JSON)");
                println!("    -r, --requests <FILE>     JSON array of requests to replay");
                println!("    -l, --log <FILTER>        Log filter [default: regsim=info]");
                println!("    -h, --help                Print help information");
                std::process::exit(0);
            }
            arg => {
                eprintln!("error: unknown argument: {arg}");
                std::process::exit(1);
            }
        }
    }

    config
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log)?)
        .with_writer(std::io::stderr)
        .init();

    let Some(config_path) = args.config else {
        eprintln!("error: --config is required");
        std::process::exit(1);
    };

    let config = DeviceConfig::from_path(&config_path)?;
    let device = Device::from_config(&config, &StaticModules::standard())?;
    let bound_cells = device.with_store(RegisterStore::bound_cells)?;
    tracing::info!(
        config = %config_path.display(),
        actions = device.registry().len(),
        bound_cells,
        policy = ?device.hook_failure_policy(),
        "device ready"
    );

    let Some(requests_path) = args.requests else {
        println!("configuration ok: {} actions, {bound_cells} bound cells", device.registry().len());
        return Ok(());
    };

    let requests: Vec<Request> = serde_json::from_str(&std::fs::read_to_string(&requests_path)?)?;
    for request in &requests {
        let started = Instant::now();
        let response = device.handle(request);
        tracing::info!(
            function_code = %request.function_code(),
            elapsed_ms = started.elapsed().as_millis(),
            exception = response.is_exception(),
            "request handled"
        );
        println!("{}", serde_json::to_string(&response)?);
    }

    Ok(())
}
