mod common;

use chrono::{TimeZone, Utc};
use fishsoop_core::stats::{DeploymentStats, PlotStatistics};

use common::sample;

#[test]
fn depths_follow_the_extreme_temperatures() {
    let stats = DeploymentStats::compute(&[12.0, 15.5, 9.8], &[10.0, 20.0, 30.0]).unwrap();

    assert_eq!(stats.temp_min, 9.8);
    assert_eq!(stats.temp_max, 15.5);
    assert_eq!(stats.depth_at_temp_min, 30.0);
    assert_eq!(stats.depth_at_temp_max, 20.0);
    assert_eq!(format!("{:.2}", stats.temp_avg), "12.43");
    assert_eq!(format!("{:.1}", stats.depth_avg), "20.0");
    assert_eq!(stats.depth_min, 10.0);
    assert_eq!(stats.depth_max, 30.0);
}

#[test]
fn nan_values_are_ignored() {
    let stats =
        DeploymentStats::compute(&[f64::NAN, 14.0, 11.0, 14.0], &[5.0, 15.0, f64::NAN, 25.0])
            .unwrap();

    assert_eq!(stats.temp_max, 14.0);
    assert_eq!(stats.depth_at_temp_max, 15.0, "first maximum wins");
    assert!(stats.depth_at_temp_min.is_nan());
    assert_eq!(stats.depth_avg, 15.0);
    assert!(DeploymentStats::compute(&[f64::NAN], &[1.0]).is_none());
    assert!(DeploymentStats::compute(&[], &[]).is_none());
}

#[test]
fn plot_statistics_prefer_bottom_phase() {
    let samples = vec![
        sample(0, 18.0, 2.0, Some("A")),
        sample(5, 14.123, 50.0, Some("D")),
        sample(10, 13.877, 60.2, Some("D")),
        sample(15, 17.0, 3.0, Some("U")),
    ];
    let stats = PlotStatistics::from_samples(&samples).unwrap();

    assert_eq!(stats.mean_temp, 14.0);
    assert_eq!(stats.mean_depth, 55.1);
    assert_eq!(stats.max_temp, 14.12);
    assert_eq!(stats.min_temp, 13.88);
    assert_eq!(stats.time_min, Utc.with_ymd_and_hms(2024, 1, 10, 6, 0, 0).unwrap());
    assert_eq!(stats.time_max, Utc.with_ymd_and_hms(2024, 1, 10, 6, 15, 0).unwrap());
}

#[test]
fn plot_statistics_fall_back_to_all_samples() {
    let samples = vec![sample(0, 10.0, 4.0, None), sample(5, 12.0, 6.0, None)];
    let stats = PlotStatistics::from_samples(&samples).unwrap();

    assert_eq!(stats.mean_temp, 11.0);
    assert_eq!(stats.mean_depth, 5.0);
    assert!(PlotStatistics::from_samples(&[]).is_none());
}
