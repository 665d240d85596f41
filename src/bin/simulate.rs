use std::path::PathBuf;

use clap::Parser;

use ctrv_ukf::config::UkfConfig;
use ctrv_ukf::dataset::save_dataset;
use ctrv_ukf::simulate::{generate, Scenario};

/// Generate a synthetic CTRV lidar/radar dataset
#[derive(Parser, Debug)]
struct Args {
    /// Output path; a .gz extension compresses the file
    #[arg(long)]
    output: PathBuf,

    /// JSON filter configuration supplying the sensor noise levels
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of measurements
    #[arg(long, default_value = "500")]
    steps: usize,

    /// Interval between measurements [us]
    #[arg(long, default_value = "50000")]
    step_us: u64,

    /// Initial speed [m/s]
    #[arg(long, default_value = "4.0")]
    speed: f64,

    /// Initial heading [rad]
    #[arg(long, default_value = "0.4")]
    yaw: f64,

    /// Constant turn rate [rad/s]
    #[arg(long, default_value = "0.1")]
    yaw_rate: f64,

    /// Random seed (0 = entropy)
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Add CTRV process noise to the true trajectory
    #[arg(long, default_value_t = false)]
    process_noise: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => UkfConfig::from_json_file(path)?,
        None => UkfConfig::default(),
    };

    let defaults = Scenario::default();
    let scenario = Scenario {
        initial: [
            defaults.initial[0],
            defaults.initial[1],
            args.speed,
            args.yaw,
            args.yaw_rate,
        ],
        step_us: args.step_us,
        steps: args.steps,
        seed: args.seed,
        process_noise: args.process_noise,
        ..defaults
    };

    let records = generate(&scenario, &config);

    save_dataset(&args.output, &records)?;

    log::info!(
        "Wrote {} measurements ({} s) to {}",
        records.len(),
        records.len() as f64 * args.step_us as f64 / 1.0e6,
        args.output.display()
    );
    Ok(())
}
