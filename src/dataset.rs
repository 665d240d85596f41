//! Measurement dataset files
//!
//! One measurement per line, whitespace separated:
//!
//! ```text
//! L  px  py  timestamp  gt_px gt_py gt_vx gt_vy [gt_yaw gt_yaw_rate]
//! R  rho phi rho_dot timestamp  gt_px gt_py gt_vx gt_vy [gt_yaw gt_yaw_rate]
//! ```
//!
//! Blank lines and `#` comments are skipped. `.gz` files are decompressed on the fly.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::Context;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::DatasetError;
use crate::types::{GroundTruth, Measurement, MeasurementPackage, SensorKind};

/// Ground truth fields that must follow the timestamp
const REQUIRED_TRUTH_FIELDS: usize = 4;

/// One dataset line: the measurement and the reference state at its timestamp
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub package: MeasurementPackage,
    pub ground_truth: GroundTruth,
}

fn parse_f64(field: &str, line: usize) -> Result<f64, DatasetError> {
    match field.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(DatasetError::InvalidNumber {
            line,
            value: field.to_string(),
        }),
    }
}

/// Timestamps may be written in exponent notation by some generators
fn parse_timestamp(field: &str, line: usize) -> Result<u64, DatasetError> {
    if let Ok(ts) = field.parse::<u64>() {
        return Ok(ts);
    }
    let value = parse_f64(field, line)?;
    if value < 0.0 || value.fract() != 0.0 {
        return Err(DatasetError::InvalidNumber {
            line,
            value: field.to_string(),
        });
    }
    Ok(value as u64)
}

/// Parse a single non-empty dataset line (`line` is 1-based, for error messages)
pub fn parse_line(text: &str, line: usize) -> Result<Record, DatasetError> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    let tag = fields.first().copied().unwrap_or_default();
    let kind = match tag {
        "L" => SensorKind::Lidar,
        "R" => SensorKind::Radar,
        other => {
            return Err(DatasetError::UnknownSensor {
                line,
                tag: other.to_string(),
            })
        }
    };

    let n_meas = kind.measurement_dim();
    let expected = 1 + n_meas + 1 + REQUIRED_TRUTH_FIELDS;
    if fields.len() < expected {
        return Err(DatasetError::MissingFields {
            line,
            expected,
            actual: fields.len(),
        });
    }

    let values = fields[1..=n_meas]
        .iter()
        .map(|f| parse_f64(f, line))
        .collect::<Result<Vec<_>, _>>()?;
    let timestamp = parse_timestamp(fields[1 + n_meas], line)?;
    let package = MeasurementPackage::from_raw(kind, &values, timestamp).map_err(|_| {
        DatasetError::MissingFields {
            line,
            expected,
            actual: fields.len(),
        }
    })?;

    let truth_start = 2 + n_meas;
    let truth = fields[truth_start..]
        .iter()
        .map(|f| parse_f64(f, line))
        .collect::<Result<Vec<_>, _>>()?;
    let ground_truth = GroundTruth {
        px: truth[0],
        py: truth[1],
        vx: truth[2],
        vy: truth[3],
        yaw: truth.get(4).copied(),
        yaw_rate: truth.get(5).copied(),
    };

    Ok(Record {
        package,
        ground_truth,
    })
}

/// Parse every record from a reader
pub fn read_records<R: BufRead>(reader: R) -> anyhow::Result<Vec<Record>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        records.push(parse_line(trimmed, idx + 1)?);
    }
    Ok(records)
}

/// Load a dataset file, transparently decompressing `.gz`
pub fn load_dataset(path: &Path) -> anyhow::Result<Vec<Record>> {
    let file = File::open(path).with_context(|| format!("opening dataset {}", path.display()))?;
    let reader: Box<dyn Read> = if is_gzip(path) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    read_records(BufReader::new(reader)).with_context(|| format!("parsing dataset {}", path.display()))
}

/// Format a record in the dataset line format
pub fn format_record(record: &Record) -> String {
    let mut fields: Vec<String> = vec![record.package.kind().tag().to_string()];
    fields.extend(record.package.measurement.values().iter().map(|v| format!("{:e}", v)));
    fields.push(record.package.timestamp.to_string());

    let gt = &record.ground_truth;
    fields.extend([gt.px, gt.py, gt.vx, gt.vy].iter().map(|v| format!("{:e}", v)));
    // Positional: a yaw rate is only representable after a yaw
    if let Some(yaw) = gt.yaw {
        fields.push(format!("{:e}", yaw));
        if let Some(yaw_rate) = gt.yaw_rate {
            fields.push(format!("{:e}", yaw_rate));
        }
    }
    fields.join("\t")
}

pub fn write_records<W: Write>(mut writer: W, records: &[Record]) -> anyhow::Result<()> {
    for record in records {
        writeln!(writer, "{}", format_record(record))?;
    }
    writer.flush()?;
    Ok(())
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

/// Write a dataset file, compressing when the path ends in `.gz`
pub fn save_dataset(path: &Path, records: &[Record]) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating dataset {}", path.display()))?;
    if is_gzip(path) {
        let mut encoder = GzEncoder::new(file, Compression::default());
        write_records(BufWriter::new(&mut encoder), records)?;
        encoder
            .finish()
            .with_context(|| format!("finalizing compressed dataset {}", path.display()))?;
    } else {
        write_records(BufWriter::new(file), records)?;
    }
    Ok(())
}

impl Record {
    pub fn kind(&self) -> SensorKind {
        self.package.kind()
    }

    pub fn is_lidar(&self) -> bool {
        matches!(self.package.measurement, Measurement::Lidar { .. })
    }
}
