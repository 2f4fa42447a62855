use std::collections::BTreeMap;

use tracing::debug;

use crate::aggregate::group_by;
use crate::calendar::PeriodCalendar;
use crate::error::Result;
use crate::models::{percent_change, round2, ScoreRecord, TrendDirection, YearChange};

pub fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for (index, value) in values.iter().enumerate() {
        let x = index as f64;
        sum_x += x;
        sum_y += value;
        sum_xy += x * value;
        sum_x2 += x * x;
    }

    let n = n as f64;
    (n * sum_xy - sum_x * sum_y) / (n * sum_x2 - sum_x * sum_x)
}

fn chronological<'a>(
    records: Vec<&'a ScoreRecord>,
    calendar: &dyn PeriodCalendar,
) -> Result<Vec<&'a ScoreRecord>> {
    let mut keyed = Vec::with_capacity(records.len());
    for record in records {
        record.checked_score()?;
        keyed.push((calendar.chronological_key(record)?, record));
    }
    keyed.sort_by_key(|(key, _)| *key);
    Ok(keyed.into_iter().map(|(_, record)| record).collect())
}

pub fn detect_trend(
    records: &[ScoreRecord],
    site_id: &str,
    calendar: &dyn PeriodCalendar,
    slope_threshold: f64,
) -> Result<TrendDirection> {
    let series = chronological(
        records.iter().filter(|record| record.site_id == site_id).collect(),
        calendar,
    )?;

    if series.len() < 2 {
        return Ok(TrendDirection::Stable);
    }

    let values: Vec<f64> = series.iter().map(|record| record.composite_score).collect();
    let slope = linear_slope(&values);
    debug!(site_id, points = values.len(), slope, "fitted score trend");

    Ok(if slope > slope_threshold {
        TrendDirection::Increasing
    } else if slope < -slope_threshold {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    })
}

pub fn year_over_year(
    records: &[ScoreRecord],
    calendar: &dyn PeriodCalendar,
) -> Result<BTreeMap<String, Vec<YearChange>>> {
    let mut changes_by_site = BTreeMap::new();

    for (site_id, members) in group_by(records, |record| record.site_id.clone()) {
        let series = chronological(members, calendar)?;
        let changes: Vec<YearChange> = series
            .windows(2)
            .filter(|pair| pair[0].year.checked_add(1) == Some(pair[1].year))
            .map(|pair| {
                let (previous, current) = (pair[0], pair[1]);
                let change = current.composite_score - previous.composite_score;
                YearChange {
                    year: current.year,
                    previous_year: previous.year,
                    change: round2(change),
                    percent_change: round2(percent_change(change, previous.composite_score)),
                }
            })
            .collect();

        if !changes.is_empty() {
            changes_by_site.insert(site_id, changes);
        }
    }

    Ok(changes_by_site)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::FrenchCalendar;
    use crate::config::TREND_SLOPE_THRESHOLD;
    use crate::error::HwiError;

    const MONTHS: [&str; 6] = ["Janvier", "Février", "Mars", "Avril", "Mai", "Juin"];

    fn series(site_id: &str, scores: &[f64]) -> Vec<ScoreRecord> {
        scores
            .iter()
            .zip(MONTHS.iter())
            .map(|(score, month)| ScoreRecord::new(site_id, *month, 2024, *score))
            .collect()
    }

    fn trend(records: &[ScoreRecord], site_id: &str) -> TrendDirection {
        detect_trend(records, site_id, &FrenchCalendar, TREND_SLOPE_THRESHOLD).unwrap()
    }

    #[test]
    fn slope_of_known_series() {
        assert!((linear_slope(&[20.0, 30.0, 45.0, 60.0]) - 13.5).abs() < 1e-9);
        assert_eq!(linear_slope(&[5.0]), 0.0);
    }

    #[test]
    fn flat_series_is_stable() {
        assert_eq!(trend(&series("A", &[40.0, 40.0, 40.0, 40.0]), "A"), TrendDirection::Stable);
        assert_eq!(trend(&series("A", &[40.0, 40.0]), "A"), TrendDirection::Stable);
    }

    #[test]
    fn rising_series_is_increasing() {
        assert_eq!(trend(&series("A", &[20.0, 30.0, 45.0, 60.0]), "A"), TrendDirection::Increasing);
    }

    #[test]
    fn falling_series_is_decreasing() {
        assert_eq!(trend(&series("A", &[70.0, 60.0, 52.0, 41.0]), "A"), TrendDirection::Decreasing);
    }

    #[test]
    fn gentle_slope_stays_stable() {
        assert_eq!(trend(&series("A", &[30.0, 31.0, 32.0, 33.0]), "A"), TrendDirection::Stable);
    }

    #[test]
    fn fewer_than_two_points_is_stable() {
        let records = series("A", &[10.0, 90.0]);
        assert_eq!(trend(&records, "missing"), TrendDirection::Stable);
        assert_eq!(trend(&records[..1], "A"), TrendDirection::Stable);
    }

    #[test]
    fn sorts_by_calendar_not_input_order() {
        let mut records = series("A", &[20.0, 30.0, 45.0, 60.0]);
        records.reverse();
        assert_eq!(trend(&records, "A"), TrendDirection::Increasing);
    }

    #[test]
    fn other_sites_are_ignored() {
        let mut records = series("A", &[20.0, 30.0, 45.0, 60.0]);
        records.extend(series("B", &[90.0, 10.0, 90.0, 10.0]));
        assert_eq!(trend(&records, "A"), TrendDirection::Increasing);
    }

    #[test]
    fn unknown_month_is_an_error() {
        let mut records = series("A", &[20.0, 30.0]);
        records.push(ScoreRecord::new("A", "Saison sèche", 2024, 50.0));
        let result = detect_trend(&records, "A", &FrenchCalendar, TREND_SLOPE_THRESHOLD);
        assert!(matches!(result, Err(HwiError::UnknownPeriod(_))));
    }

    #[test]
    fn non_finite_point_is_an_error() {
        let records = series("A", &[20.0, f64::NAN, 45.0]);
        let result = detect_trend(&records, "A", &FrenchCalendar, TREND_SLOPE_THRESHOLD);
        assert!(matches!(result, Err(HwiError::NonFiniteScore { .. })));
    }

    #[test]
    fn year_over_year_pairs_consecutive_years() {
        let records = vec![
            ScoreRecord::new("A", "Mars", 2022, 40.0),
            ScoreRecord::new("A", "Mars", 2023, 50.0),
            ScoreRecord::new("A", "Mars", 2025, 10.0),
            ScoreRecord::new("B", "Mars", 2023, 0.0),
            ScoreRecord::new("B", "Mars", 2024, 12.0),
            ScoreRecord::new("C", "Mars", 2024, 12.0),
        ];
        let changes = year_over_year(&records, &FrenchCalendar).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes["A"],
            vec![YearChange { year: 2023, previous_year: 2022, change: 10.0, percent_change: 25.0 }]
        );
        assert_eq!(changes["B"][0].percent_change, 0.0);
        assert!(!changes.contains_key("C"));
    }

    #[test]
    fn year_over_year_handles_the_last_representable_year() {
        let records = vec![
            ScoreRecord::new("A", "Janvier", i32::MAX - 1, 20.0),
            ScoreRecord::new("A", "Janvier", i32::MAX, 30.0),
            ScoreRecord::new("A", "Mars", i32::MAX, 35.0),
        ];
        let changes = year_over_year(&records, &FrenchCalendar).unwrap();
        assert_eq!(changes["A"].len(), 1);
        assert_eq!(changes["A"][0].year, i32::MAX);
        assert_eq!(changes["A"][0].change, 10.0);
    }
}
