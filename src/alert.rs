use tracing::warn;

use crate::config::AlertThresholds;
use crate::error::Result;
use crate::models::{AlertLevel, ScoreRecord};

/// Classifies a score under the default 25 / 50 / 75 bands.
pub fn classify(score: f64) -> Result<AlertLevel> {
    AlertThresholds::default().classify(score)
}

impl AlertLevel {
    pub fn description(&self) -> &'static str {
        match self {
            AlertLevel::Green => "Normal conditions - routine monitoring",
            AlertLevel::Yellow => "Elevated stress - increase surveillance",
            AlertLevel::Red => "Crisis conditions - activate response mechanisms",
            AlertLevel::Black => "Severe crisis - emergency intervention required",
        }
    }

    pub fn recommended_actions(&self) -> &'static [&'static str] {
        match self {
            AlertLevel::Green => &[
                "Continue routine health monitoring",
                "Maintain existing health programs",
                "Document baseline conditions",
            ],
            AlertLevel::Yellow => &[
                "Increase monitoring frequency",
                "Activate existing health programs",
                "Engage with cooperative leadership",
                "Assess specific household needs",
            ],
            AlertLevel::Red => &[
                "Emergency cost-of-living adjustments",
                "Deploy mobile health clinics",
                "Provide direct household support",
                "Coordinate with health authorities",
                "Implement targeted interventions",
            ],
            AlertLevel::Black => &[
                "Supply chain intervention required",
                "Route purchases through health-infrastructure cooperatives",
                "Emergency humanitarian assistance",
                "Multi-stakeholder crisis response",
                "Consider supply chain suspension pending improvement",
            ],
        }
    }
}

/// Records whose stored alert level disagrees with the level their score maps to.
pub fn alert_mismatches<'a>(
    records: &'a [ScoreRecord],
    thresholds: &AlertThresholds,
) -> Result<Vec<&'a ScoreRecord>> {
    let mut mismatches = Vec::new();

    for record in records {
        let Some(stored) = record.alert_level else {
            continue;
        };
        let recomputed = record.recomputed_alert_level(thresholds)?;
        if stored != recomputed {
            warn!(
                site_id = %record.site_id,
                period = %record.period_label,
                year = record.year,
                %stored,
                %recomputed,
                "stored alert level disagrees with score"
            );
            mismatches.push(record);
        }
    }

    Ok(mismatches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HwiError;
    use proptest::prelude::*;

    #[test]
    fn band_boundaries_are_inclusive_below() {
        assert_eq!(classify(24.999).unwrap(), AlertLevel::Green);
        assert_eq!(classify(25.0).unwrap(), AlertLevel::Yellow);
        assert_eq!(classify(49.999).unwrap(), AlertLevel::Yellow);
        assert_eq!(classify(50.0).unwrap(), AlertLevel::Red);
        assert_eq!(classify(74.999).unwrap(), AlertLevel::Red);
        assert_eq!(classify(75.0).unwrap(), AlertLevel::Black);
    }

    #[test]
    fn negative_and_large_scores_still_classify() {
        assert_eq!(classify(-40.0).unwrap(), AlertLevel::Green);
        assert_eq!(classify(1_000.0).unwrap(), AlertLevel::Black);
    }

    #[test]
    fn non_finite_scores_fail_fast() {
        assert!(matches!(classify(f64::NAN), Err(HwiError::InvalidScore(_))));
        assert!(matches!(
            classify(f64::INFINITY),
            Err(HwiError::InvalidScore(_))
        ));
        assert!(classify(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn custom_thresholds_shift_bands() {
        let thresholds = AlertThresholds {
            yellow: 10.0,
            red: 20.0,
            black: 30.0,
        };
        assert_eq!(thresholds.classify(15.0).unwrap(), AlertLevel::Yellow);
        assert_eq!(thresholds.classify(30.0).unwrap(), AlertLevel::Black);
    }

    #[test]
    fn every_level_has_guidance() {
        for level in AlertLevel::ALL {
            assert!(!level.description().is_empty());
            assert!(level.recommended_actions().len() >= 3);
        }
    }

    #[test]
    fn mismatches_only_consider_stored_levels() {
        let records = vec![
            ScoreRecord::new("A", "Mars", 2024, 10.0).with_alert_level(AlertLevel::Green),
            ScoreRecord::new("B", "Mars", 2024, 60.0).with_alert_level(AlertLevel::Yellow),
            ScoreRecord::new("C", "Mars", 2024, 90.0),
        ];
        let mismatches = alert_mismatches(&records, &AlertThresholds::default()).unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].site_id, "B");
    }

    proptest! {
        #[test]
        fn classification_is_monotonic(a in -1_000.0f64..1_000.0, b in -1_000.0f64..1_000.0) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(classify(low).unwrap() <= classify(high).unwrap());
        }

        #[test]
        fn every_finite_score_maps_to_a_level(score in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
            let level = classify(score).unwrap();
            prop_assert!(AlertLevel::ALL.contains(&level));
        }
    }
}
