use ctrv_ukf::config::UkfConfig;
use ctrv_ukf::dataset::{format_record, parse_line};
use ctrv_ukf::filters::nis::chi2_95_bound;
use ctrv_ukf::report::run;
use ctrv_ukf::simulate::{generate, Scenario};
use ctrv_ukf::tools::calculate_rmse;
use ctrv_ukf::{Measurement, SensorKind, Ukf};

#[test]
fn test_converges_on_simulated_turn() {
    let config = UkfConfig::default();
    let records = generate(&Scenario::default(), &config);
    let report = run(&records, &config);

    assert_eq!(report.summary.stats.resets, 0);
    assert_eq!(report.summary.stats.rejected_measurements, 0);
    assert_eq!(report.rows.len(), records.len());

    // Skip the convergence transient
    let half = report.rows.len() / 2;
    let est = report.estimations();
    let gt = report.ground_truth();
    let rmse = calculate_rmse(&est[half..], &gt[half..]);
    assert!(rmse[0] < 0.3, "px rmse {}", rmse[0]);
    assert!(rmse[1] < 0.3, "py rmse {}", rmse[1]);
    assert!(rmse[2] < 1.0, "vx rmse {}", rmse[2]);
    assert!(rmse[3] < 1.0, "vy rmse {}", rmse[3]);
}

/// Second-half RMSE plus the NIS fraction above the 95% bound per sensor
fn run_scenario(scenario: &Scenario) -> ([f64; 4], [f64; 2], Vec<ctrv_ukf::dataset::Record>) {
    let config = UkfConfig::default();
    let records = generate(scenario, &config);
    let report = run(&records, &config);
    assert_eq!(report.summary.stats.resets, 0);

    let half = report.rows.len() / 2;
    let rmse = calculate_rmse(&report.estimations()[half..], &report.ground_truth()[half..]);

    let mut fractions = [0.0; 2];
    for (slot, kind) in [SensorKind::Lidar, SensorKind::Radar].into_iter().enumerate() {
        let stats = report.summary.nis.stats(kind);
        fractions[slot] = stats.fraction_above().unwrap_or(1.0);
    }
    ([rmse[0], rmse[1], rmse[2], rmse[3]], fractions, records)
}

fn assert_tracked(rmse: [f64; 4], nis_above: [f64; 2]) {
    assert!(rmse[0] < 0.3 && rmse[1] < 0.3, "position rmse {:?}", rmse);
    assert!(rmse[2] < 1.0 && rmse[3] < 1.0, "velocity rmse {:?}", rmse);
    assert!(nis_above[0] < 0.25, "lidar NIS above bound: {:.2}", nis_above[0]);
    assert!(nis_above[1] < 0.25, "radar NIS above bound: {:.2}", nis_above[1]);
}

fn radar_bearings(records: &[ctrv_ukf::dataset::Record]) -> Vec<f64> {
    records
        .iter()
        .filter_map(|r| match r.package.measurement {
            Measurement::Radar { phi, .. } => Some(phi),
            _ => None,
        })
        .collect()
}

#[test]
fn test_heading_and_bearing_wrap_behind_sensor() {
    // Heading crosses +pi after ~1.4 s, then the track crosses the negative x axis
    let scenario = Scenario {
        initial: [-20.0, 2.0, 4.0, 3.0, 0.1],
        process_noise: true,
        seed: 11,
        ..Scenario::default()
    };
    let (rmse, nis_above, records) = run_scenario(&scenario);

    let yaws: Vec<f64> = records.iter().filter_map(|r| r.ground_truth.yaw).collect();
    assert!(yaws.iter().any(|&y| y > 3.0) && yaws.iter().any(|&y| y < -3.0));
    let bearings = radar_bearings(&records);
    assert!(bearings.iter().any(|&p| p > 3.0) && bearings.iter().any(|&p| p < -3.0));

    assert_tracked(rmse, nis_above);
}

#[test]
fn test_repeated_wraps_circling_sensor() {
    // Radius 10 m around the sensor, one lap every ~12.6 s
    let scenario = Scenario {
        initial: [10.0, 0.0, 5.0, 1.5, 0.5],
        seed: 3,
        ..Scenario::default()
    };
    let (rmse, nis_above, records) = run_scenario(&scenario);

    let wraps = radar_bearings(&records)
        .windows(2)
        .filter(|w| (w[1] - w[0]).abs() > std::f64::consts::PI)
        .count();
    assert!(wraps >= 2, "bearing wrapped {} times", wraps);

    assert_tracked(rmse, nis_above);
}

#[test]
fn test_nis_within_chi2_bounds() {
    let config = UkfConfig::default();
    let scenario = Scenario {
        process_noise: true,
        seed: 7,
        ..Scenario::default()
    };
    let report = run(&generate(&scenario, &config), &config);

    for kind in [SensorKind::Lidar, SensorKind::Radar] {
        let above = report
            .rows
            .iter()
            .skip(20)
            .filter(|r| r.sensor == kind)
            .filter_map(|r| r.nis)
            .filter(|&nis| nis > chi2_95_bound(kind))
            .count();
        let total = report
            .rows
            .iter()
            .skip(20)
            .filter(|r| r.sensor == kind && r.nis.is_some())
            .count();
        assert!(total > 100);
        let fraction = above as f64 / total as f64;
        assert!(fraction < 0.25, "{} NIS above bound: {:.2}", kind, fraction);
    }
}

#[test]
fn test_covariance_stays_symmetric() {
    let config = UkfConfig::default();
    let records = generate(
        &Scenario {
            steps: 200,
            ..Scenario::default()
        },
        &config,
    );
    let mut ukf = Ukf::new(config);
    for record in &records {
        ukf.process_measurement(&record.package).unwrap();
        let p = ukf.covariance().unwrap();
        assert!((p - p.transpose()).amax() < 1e-9);
        assert!(p.diagonal().iter().all(|&d| d > 0.0));
    }
}

#[test]
fn test_single_sensor_runs() {
    let records = generate(&Scenario::default(), &UkfConfig::default());

    let mut lidar_only = UkfConfig::default();
    lidar_only.radar.enabled = false;
    let report = run(&records, &lidar_only);
    assert_eq!(report.summary.stats.radar_updates, 0);
    assert_eq!(report.summary.stats.skipped_updates, records.len() / 2);
    assert!(report.summary.rmse[0] < 0.5);

    let mut radar_only = UkfConfig::default();
    radar_only.lidar.enabled = false;
    let report = run(&records, &radar_only);
    assert_eq!(report.summary.stats.lidar_updates, 0);
    assert!(report.summary.stats.radar_updates > 200);
}

#[test]
fn test_dataset_text_survives_reparse() {
    let records = generate(
        &Scenario {
            steps: 10,
            ..Scenario::default()
        },
        &UkfConfig::default(),
    );
    for (i, record) in records.iter().enumerate() {
        let parsed = parse_line(&format_record(record), i + 1).unwrap();
        assert_eq!(parsed.package.timestamp, record.package.timestamp);
        assert_eq!(parsed.kind(), record.kind());
    }
}
