use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;

use ctrv_ukf::config::UkfConfig;
use ctrv_ukf::dataset::load_dataset;
use ctrv_ukf::report::{run, write_rows};

#[derive(Parser, Debug)]
#[command(name = "ukf_tracker")]
#[command(about = "CTRV unscented Kalman filter over a lidar/radar measurement file", long_about = None)]
struct Args {
    /// Measurement file (.txt or .txt.gz)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// JSON filter configuration (defaults apply to missing fields)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ignore lidar updates (measurements still advance the prediction)
    #[arg(long)]
    disable_lidar: bool,

    /// Ignore radar updates (measurements still advance the prediction)
    #[arg(long)]
    disable_radar: bool,

    /// Output directory
    #[arg(long, default_value = "ukf_sessions")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => UkfConfig::from_json_file(path)?,
        None => UkfConfig::default(),
    };
    if args.disable_lidar {
        config.lidar.enabled = false;
    }
    if args.disable_radar {
        config.radar.enabled = false;
    }
    config.validate()?;

    log::info!("UKF tracker starting");
    log::info!("  Input: {}", args.input.display());
    log::info!(
        "  Lidar: {}  Radar: {}",
        if config.lidar.enabled { "on" } else { "off" },
        if config.radar.enabled { "on" } else { "off" }
    );
    log::info!("  Output Dir: {}", args.output_dir.display());

    let records = load_dataset(&args.input)?;
    log::info!("Loaded {} measurements", records.len());

    let report = run(&records, &config);

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    let stamp = ts_now_clean();

    let rows_path = args.output_dir.join(format!("estimates_{}.txt", stamp));
    let file = File::create(&rows_path).with_context(|| format!("creating {}", rows_path.display()))?;
    write_rows(BufWriter::new(file), &report.rows)?;

    let summary_path = args.output_dir.join(format!("summary_{}.json", stamp));
    let json = serde_json::to_string_pretty(&report.summary)?;
    fs::write(&summary_path, json).with_context(|| format!("writing {}", summary_path.display()))?;

    log::info!("Wrote {} rows to {}", report.rows.len(), rows_path.display());
    log::info!("Wrote summary to {}", summary_path.display());

    let summary = &report.summary;
    println!("\n=== Final Stats ===");
    println!("Measurements: {}", summary.stats.total_measurements);
    println!(
        "Updates: lidar={} radar={} skipped={} rejected={} resets={}",
        summary.stats.lidar_updates,
        summary.stats.radar_updates,
        summary.stats.skipped_updates,
        summary.stats.rejected_measurements,
        summary.stats.resets
    );
    log::info!(
        "RMSE px={:.4} py={:.4} vx={:.4} vy={:.4}",
        summary.rmse[0], summary.rmse[1], summary.rmse[2], summary.rmse[3]
    );
    log::info!("NIS {}", summary.nis.format_status());

    Ok(())
}

fn ts_now_clean() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}
