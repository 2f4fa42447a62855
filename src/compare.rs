use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::models::{percent_change, round2, ComparisonRow, ScoreRecord, TrendDirection};

/// Pairs sites present in both windows, in order of first appearance in `current`.
///
/// When a site appears more than once in a window its first record is used.
pub fn compare_periods(
    current: &[ScoreRecord],
    previous: &[ScoreRecord],
    change_threshold: f64,
) -> Result<Vec<ComparisonRow>> {
    let mut baseline: HashMap<&str, &ScoreRecord> = HashMap::new();
    for record in previous {
        baseline.entry(record.site_id.as_str()).or_insert(record);
    }

    let mut seen = HashSet::new();
    let mut rows = Vec::new();

    for record in current {
        if !seen.insert(record.site_id.as_str()) {
            continue;
        }
        let Some(prior) = baseline.get(record.site_id.as_str()) else {
            continue;
        };

        let current_score = record.checked_score()?;
        let previous_score = prior.checked_score()?;
        let change = current_score - previous_score;

        let trend = if change > change_threshold {
            TrendDirection::Increasing
        } else if change < -change_threshold {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };

        rows.push(ComparisonRow {
            site_id: record.site_id.clone(),
            current_score,
            previous_score,
            change: round2(change),
            percent_change: round2(percent_change(change, previous_score)),
            trend,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CHANGE_THRESHOLD;
    use crate::error::HwiError;

    fn window(period: &str, scores: &[(&str, f64)]) -> Vec<ScoreRecord> {
        scores
            .iter()
            .map(|(site_id, score)| ScoreRecord::new(*site_id, period, 2024, *score))
            .collect()
    }

    #[test]
    fn pairs_only_sites_in_both_windows() {
        let current = window("Avril", &[("A", 30.0), ("B", 40.0), ("C", 50.0)]);
        let previous = window("Mars", &[("C", 48.0), ("A", 20.0), ("D", 10.0)]);
        let rows = compare_periods(&current, &previous, CHANGE_THRESHOLD).unwrap();

        let sites: Vec<&str> = rows.iter().map(|row| row.site_id.as_str()).collect();
        assert_eq!(sites, vec!["A", "C"]);
        assert_eq!(rows[0].change, 10.0);
        assert_eq!(rows[0].percent_change, 50.0);
        assert_eq!(rows[0].trend, TrendDirection::Increasing);
        assert_eq!(rows[1].trend, TrendDirection::Stable);
    }

    #[test]
    fn zero_baseline_yields_zero_percent() {
        let rows = compare_periods(
            &window("Avril", &[("A", 5.0)]),
            &window("Mars", &[("A", 0.0)]),
            CHANGE_THRESHOLD,
        )
        .unwrap();
        assert_eq!(rows[0].percent_change, 0.0);
        assert_eq!(rows[0].change, 5.0);
        assert_eq!(rows[0].trend, TrendDirection::Stable);
    }

    #[test]
    fn large_drop_is_decreasing() {
        let rows = compare_periods(
            &window("Avril", &[("A", 20.0)]),
            &window("Mars", &[("A", 30.0)]),
            CHANGE_THRESHOLD,
        )
        .unwrap();
        assert_eq!(rows[0].trend, TrendDirection::Decreasing);
        assert_eq!(rows[0].percent_change, -33.33);
    }

    #[test]
    fn duplicate_sites_use_first_records() {
        let current = window("Avril", &[("A", 30.0), ("A", 99.0)]);
        let previous = window("Mars", &[("A", 29.0), ("A", 0.0)]);
        let rows = compare_periods(&current, &previous, CHANGE_THRESHOLD).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].change, 1.0);
    }

    #[test]
    fn non_finite_scores_fail() {
        let result = compare_periods(
            &window("Avril", &[("A", f64::NAN)]),
            &window("Mars", &[("A", 10.0)]),
            CHANGE_THRESHOLD,
        );
        assert!(matches!(result, Err(HwiError::NonFiniteScore { .. })));
    }
}
