//! Window transform tests across all extractors

use super::layout::feature_index;
use super::*;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

fn window(counts: &[f32], hour: u32, day: u32) -> FeatureWindow {
    let time = TimeContext::new(hour, day).unwrap();
    engineer_window(counts, &time, &TimeWindows::default()).unwrap()
}

#[test]
fn test_one_row_per_position() {
    let features = window(&[1.0; 12], 12, 2);
    assert_eq!(features.len(), 12);
    assert_eq!(features.version, FEATURE_VERSION);
    assert_eq!(features.layout_hash, layout_hash());
    assert_eq!(features.flatten().len(), 12 * FEATURE_COUNT);
}

#[test]
fn test_first_position_falls_back_to_first_value() {
    let features = window(&[10.0, 20.0, 30.0, 40.0, 50.0], 8, 5);

    for name in ["ma_2", "ma_4", "ma_8", "lag_1", "lag_2", "lag_4"] {
        assert_eq!(features.get_by_name(0, name), Some(10.0), "{name}");
    }
    for name in ["std_2", "std_4", "std_8", "diff_1", "diff_4"] {
        assert_eq!(features.get_by_name(0, name), Some(0.0), "{name}");
    }
}

#[test]
fn test_rolling_stats_use_padded_series() {
    let features = window(&[10.0, 20.0, 30.0, 40.0, 50.0], 8, 5);

    assert_eq!(features.get_by_name(1, "ma_2"), Some(15.0));
    assert_eq!(features.get_by_name(1, "std_2"), Some(5.0));
    assert_eq!(features.get_by_name(1, "ma_4"), Some(12.5));
    assert!(approx(features.get_by_name(1, "std_4").unwrap(), 18.75f32.sqrt()));

    assert_eq!(features.get_by_name(4, "ma_2"), Some(45.0));
    assert_eq!(features.get_by_name(4, "ma_4"), Some(35.0));
    assert_eq!(features.get_by_name(4, "ma_8"), Some(22.5));
}

#[test]
fn test_differences_and_lags() {
    let features = window(&[10.0, 20.0, 30.0, 40.0, 50.0], 8, 5);

    assert_eq!(features.get_by_name(1, "diff_1"), Some(10.0));
    assert_eq!(features.get_by_name(1, "diff_4"), Some(10.0));
    assert_eq!(features.get_by_name(4, "diff_1"), Some(10.0));
    assert_eq!(features.get_by_name(4, "diff_4"), Some(40.0));

    assert_eq!(features.get_by_name(4, "lag_1"), Some(40.0));
    assert_eq!(features.get_by_name(4, "lag_2"), Some(30.0));
    assert_eq!(features.get_by_name(4, "lag_4"), Some(10.0));
    assert_eq!(features.get_by_name(2, "lag_4"), Some(10.0));
}

#[test]
fn test_time_features_repeat_on_every_row() {
    let features = window(&[5.0, 6.0, 7.0], 8, 5);
    let morning = feature_index("is_morning_rush").unwrap();
    let weekend = feature_index("is_weekend").unwrap();
    let night = feature_index("is_night").unwrap();

    for row in &features.rows {
        assert_eq!(row[morning], 1.0);
        assert_eq!(row[weekend], 1.0);
        assert_eq!(row[night], 0.0);
        assert!(approx(row[1], (2.0 * std::f32::consts::PI * 8.0 / 24.0).sin()));
    }
}

#[test]
fn test_night_indicator_follows_windows() {
    let time = TimeContext::new(5, 1).unwrap();
    let night = feature_index("is_night").unwrap();

    let default = engineer_window(&[1.0], &time, &TimeWindows::default()).unwrap();
    assert_eq!(default.rows[0][night], 0.0);

    let late = TimeWindows { night_end: 6, ..Default::default() };
    let features = engineer_window(&[1.0], &time, &late).unwrap();
    assert_eq!(features.rows[0][night], 1.0);
}

#[test]
fn test_transform_is_deterministic() {
    let counts = [3.0, 9.0, 4.0, 12.0, 7.0, 30.0];
    assert_eq!(window(&counts, 17, 3), window(&counts, 17, 3));
}

#[test]
fn test_invalid_windows() {
    let time = TimeContext::new(0, 0).unwrap();
    let windows = TimeWindows::default();

    assert_eq!(engineer_window(&[], &time, &windows), Err(FeatureError::EmptyWindow));
    assert_eq!(
        engineer_window(&[1.0, f32::NAN], &time, &windows),
        Err(FeatureError::NonFiniteCount(1))
    );
}

#[test]
fn test_window_stats() {
    let stats = WindowStats::from_counts(&[4.0, 10.0, 1.0]).unwrap();
    assert_eq!(stats.avg, 5.0);
    assert_eq!(stats.min, 1.0);
    assert_eq!(stats.max, 10.0);
    assert!(WindowStats::from_counts(&[]).is_none());
}

#[test]
fn test_huge_counts_stay_finite() {
    let counts = [3e38f32; 12];
    let features = window(&counts, 8, 1);
    for row in &features.rows {
        assert!(row.iter().all(|v| v.is_finite()), "{row:?}");
    }
    assert!(approx(features.get_by_name(11, "std_8").unwrap(), 0.0));

    let stats = WindowStats::from_counts(&counts).unwrap();
    assert!(stats.avg.is_finite());
    assert!((stats.avg / 3e38 - 1.0).abs() < 1e-6);
}

#[test]
fn test_log_entry_names_last_row() {
    let entry = window(&[2.0, 4.0], 12, 0).to_log_entry();
    assert_eq!(entry["positions"], 2);
    assert_eq!(entry["last"]["count"], 4.0);
}
