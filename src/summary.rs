use tracing::debug;

use crate::aggregate::alert_counts;
use crate::config::AlertThresholds;
use crate::error::Result;
use crate::models::{round2, ComponentAverages, ScoreRecord, SummaryStats};

/// Missing component scores count as zero and stay in the denominator.
pub fn summarize(records: &[ScoreRecord], thresholds: &AlertThresholds) -> Result<SummaryStats> {
    if records.is_empty() {
        return Ok(SummaryStats::default());
    }

    let mut scores = records
        .iter()
        .map(ScoreRecord::checked_score)
        .collect::<Result<Vec<f64>>>()?;
    scores.sort_by(f64::total_cmp);

    let n = scores.len();
    let count = n as f64;
    let mean = scores.iter().sum::<f64>() / count;
    let median = if n % 2 == 0 {
        (scores[n / 2 - 1] + scores[n / 2]) / 2.0
    } else {
        scores[n / 2]
    };
    let variance = scores.iter().map(|score| (score - mean).powi(2)).sum::<f64>() / count;

    let mut component_sums = [0.0; 7];
    for record in records {
        for (sum, value) in component_sums
            .iter_mut()
            .zip(record.component_scores.values_or_zero())
        {
            *sum += value;
        }
    }
    let [workforce, child, womens, empowerment, nutrition, chronic, acute] =
        component_sums.map(|sum| round2(sum / count));

    debug!(count = n, mean, "summarized score records");

    Ok(SummaryStats {
        count: n,
        mean: round2(mean),
        median: round2(median),
        min: round2(scores[0]),
        max: round2(scores[n - 1]),
        std_dev: round2(variance.sqrt()),
        alert_distribution: alert_counts(records, thresholds)?,
        component_averages: ComponentAverages {
            workforce_health: workforce,
            child_welfare: child,
            womens_health: womens,
            womens_empowerment: empowerment,
            nutrition,
            chronic_illness: chronic,
            acute_illness: acute,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HwiError;
    use crate::models::{AlertCounts, ComponentScores};

    fn cross_section(scores: &[f64]) -> Vec<ScoreRecord> {
        scores
            .iter()
            .enumerate()
            .map(|(index, score)| ScoreRecord::new(format!("S{index}"), "Mars", 2024, *score))
            .collect()
    }

    #[test]
    fn empty_input_is_all_zero() {
        let stats = summarize(&[], &AlertThresholds::default()).unwrap();
        assert_eq!(
            stats,
            SummaryStats {
                count: 0,
                mean: 0.0,
                median: 0.0,
                min: 0.0,
                max: 0.0,
                std_dev: 0.0,
                alert_distribution: AlertCounts { green: 0, yellow: 0, red: 0, black: 0 },
                component_averages: ComponentAverages::default(),
            }
        );
    }

    #[test]
    fn odd_sample_statistics() {
        let stats = summarize(&cross_section(&[20.0, 30.0, 45.0, 60.0, 21.0]), &AlertThresholds::default()).unwrap();
        assert_eq!(stats.count, 5);
        assert_eq!(stats.mean, 35.2);
        assert_eq!(stats.median, 30.0);
        assert_eq!(stats.min, 20.0);
        assert_eq!(stats.max, 60.0);
        assert_eq!(stats.std_dev, 15.3);
        assert_eq!(
            stats.alert_distribution,
            AlertCounts { green: 2, yellow: 2, red: 1, black: 0 }
        );
    }

    #[test]
    fn even_sample_median_averages_the_middle() {
        let stats = summarize(&cross_section(&[40.0, 10.0, 30.0, 20.0]), &AlertThresholds::default()).unwrap();
        assert_eq!(stats.median, 25.0);
        assert_eq!(stats.std_dev, 11.18);
    }

    #[test]
    fn missing_components_stay_in_the_denominator() {
        let mut records = cross_section(&[10.0, 20.0]);
        records[0] = records[0].clone().with_components(ComponentScores {
            workforce_health: Some(80.0),
            nutrition: Some(10.0),
            ..ComponentScores::default()
        });
        records[1] = records[1].clone().with_components(ComponentScores {
            workforce_health: Some(20.0),
            ..ComponentScores::default()
        });

        let stats = summarize(&records, &AlertThresholds::default()).unwrap();
        assert_eq!(stats.component_averages.workforce_health, 50.0);
        assert_eq!(stats.component_averages.nutrition, 5.0);
        assert_eq!(stats.component_averages.acute_illness, 0.0);
        assert!(records[1].component_scores.nutrition.is_none());
    }

    #[test]
    fn input_order_is_untouched() {
        let records = cross_section(&[60.0, 20.0, 40.0]);
        summarize(&records, &AlertThresholds::default()).unwrap();
        assert_eq!(records[0].composite_score, 60.0);
    }

    #[test]
    fn non_finite_scores_fail() {
        let records = cross_section(&[10.0, f64::INFINITY]);
        assert!(matches!(
            summarize(&records, &AlertThresholds::default()),
            Err(HwiError::NonFiniteScore { .. })
        ));
    }
}
