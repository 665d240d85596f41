use std::io::Write;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::UkfConfig;
use crate::dataset::Record;
use crate::filters::{NisMonitor, ProcessOutcome, Ukf};
use crate::tools::calculate_rmse;
use crate::types::{Estimate, GroundTruth, KinematicVec, SensorKind};

/// Filter output after one measurement
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputRow {
    pub timestamp: u64,
    pub sensor: SensorKind,
    /// [px, py, v, yaw, yaw_rate]
    pub state: [f64; 5],
    pub estimate: Estimate,
    /// NIS of this measurement's update, if one ran
    pub nis: Option<f64>,
    /// Measurement converted to Cartesian position
    pub measured_position: (f64, f64),
    pub ground_truth: GroundTruth,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Stats {
    pub total_measurements: usize,
    pub initializations: usize,
    pub lidar_updates: usize,
    pub radar_updates: usize,
    pub skipped_updates: usize,
    pub rejected_measurements: usize,
    /// Filter resets after numerical failures
    pub resets: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Summary {
    pub generated_at: String,
    pub config: UkfConfig,
    /// RMSE of [px, py, vx, vy]
    pub rmse: [f64; 4],
    pub nis: NisMonitor,
    pub stats: Stats,
}

pub struct RunReport {
    pub rows: Vec<OutputRow>,
    pub summary: Summary,
}

impl RunReport {
    pub fn estimations(&self) -> Vec<KinematicVec> {
        self.rows.iter().map(|r| r.estimate.to_vector()).collect()
    }

    pub fn ground_truth(&self) -> Vec<KinematicVec> {
        self.rows.iter().map(|r| r.ground_truth.to_vector()).collect()
    }
}

/// Feed every record through a fresh filter, in file order
///
/// Out-of-order measurements are dropped. A numerical failure discards the
/// filter and the next measurement initializes a new one.
pub fn run(records: &[Record], config: &UkfConfig) -> RunReport {
    let mut ukf = Ukf::new(*config);
    let mut nis = NisMonitor::new();
    let mut stats = Stats::default();
    let mut rows = Vec::with_capacity(records.len());

    for record in records {
        stats.total_measurements += 1;
        let kind = record.kind();

        let outcome = match ukf.process_measurement(&record.package) {
            Ok(outcome) => outcome,
            Err(e) if e.is_numerical() => {
                log::error!(
                    "[RUN] t={} us: {}; resetting filter",
                    record.package.timestamp,
                    e
                );
                ukf = Ukf::new(*config);
                stats.resets += 1;
                continue;
            }
            Err(e) => {
                log::warn!("[RUN] t={} us: dropping measurement: {}", record.package.timestamp, e);
                stats.rejected_measurements += 1;
                continue;
            }
        };

        let update_nis = match outcome {
            ProcessOutcome::Initialized => {
                stats.initializations += 1;
                None
            }
            ProcessOutcome::UpdateSkipped(_) => {
                stats.skipped_updates += 1;
                None
            }
            ProcessOutcome::Updated(kind) => {
                match kind {
                    SensorKind::Lidar => stats.lidar_updates += 1,
                    SensorKind::Radar => stats.radar_updates += 1,
                }
                let value = ukf.nis(kind);
                if let Some(v) = value {
                    nis.record(kind, v);
                }
                value
            }
        };

        let (Some(x), Some(estimate)) = (ukf.state(), ukf.estimate()) else {
            continue;
        };
        rows.push(OutputRow {
            timestamp: record.package.timestamp,
            sensor: kind,
            state: [x[0], x[1], x[2], x[3], x[4]],
            estimate,
            nis: update_nis,
            measured_position: record.package.measurement.cartesian_position(),
            ground_truth: record.ground_truth,
        });
    }

    let mut report = RunReport {
        rows,
        summary: Summary {
            generated_at: Utc::now().to_rfc3339(),
            config: *config,
            rmse: [0.0; 4],
            nis,
            stats,
        },
    };
    let rmse = calculate_rmse(&report.estimations(), &report.ground_truth());
    report.summary.rmse = [rmse[0], rmse[1], rmse[2], rmse[3]];
    report
}

const OUTPUT_HEADER: &str = "time_us\tsensor\tpx\tpy\tv\tyaw\tyaw_rate\tvx\tvy\tnis\tmeas_px\tmeas_py\tgt_px\tgt_py\tgt_vx\tgt_vy";

/// Write one tab-separated row per processed measurement
pub fn write_rows<W: Write>(mut writer: W, rows: &[OutputRow]) -> anyhow::Result<()> {
    writeln!(writer, "{}", OUTPUT_HEADER)?;
    for row in rows {
        let nis = row.nis.map(|v| format!("{:.6}", v)).unwrap_or_else(|| "-".to_string());
        writeln!(
            writer,
            "{}\t{}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}",
            row.timestamp,
            row.sensor.tag(),
            row.state[0],
            row.state[1],
            row.state[2],
            row.state[3],
            row.state[4],
            row.estimate.vx,
            row.estimate.vy,
            nis,
            row.measured_position.0,
            row.measured_position.1,
            row.ground_truth.px,
            row.ground_truth.py,
            row.ground_truth.vx,
            row.ground_truth.vy,
        )?;
    }
    writer.flush()?;
    Ok(())
}
