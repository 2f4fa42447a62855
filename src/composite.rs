use serde::{Deserialize, Serialize};

use crate::config::AlertThresholds;
use crate::error::Result;
use crate::models::{round2, ComponentScores, ScoreRecord};

#[derive(Debug, Clone, Copy)]
pub struct CategoryWeight {
    pub weight: f64,
    /// Share of sales treated as a severe-crisis level.
    pub max_share: f64,
}

pub const ANTIMALARIAL: CategoryWeight = CategoryWeight { weight: 0.25, max_share: 0.35 };
pub const PEDIATRIC_ORS_ZINC: CategoryWeight = CategoryWeight { weight: 0.20, max_share: 0.15 };
pub const PRENATAL_VITAMINS: CategoryWeight = CategoryWeight { weight: 0.15, max_share: 0.08 };
pub const CONTRACEPTIVES: CategoryWeight = CategoryWeight { weight: 0.15, max_share: 0.05 };
pub const MICRONUTRIENTS: CategoryWeight = CategoryWeight { weight: 0.10, max_share: 0.12 };
pub const ARV: CategoryWeight = CategoryWeight { weight: 0.10, max_share: 0.08 };
pub const ANTIBIOTICS: CategoryWeight = CategoryWeight { weight: 0.05, max_share: 0.20 };

/// Weights in component column order.
pub const WEIGHTS: [CategoryWeight; 7] = [
    ANTIMALARIAL,
    PEDIATRIC_ORS_ZINC,
    PRENATAL_VITAMINS,
    CONTRACEPTIVES,
    MICRONUTRIENTS,
    ARV,
    ANTIBIOTICS,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryShares {
    pub antimalarial: f64,
    pub pediatric_ors_zinc: f64,
    pub prenatal_vitamins: f64,
    pub contraceptives: f64,
    pub micronutrients: f64,
    pub arv: f64,
    pub antibiotics: f64,
}

impl CategoryShares {
    fn values(&self) -> [f64; 7] {
        [
            self.antimalarial,
            self.pediatric_ors_zinc,
            self.prenatal_vitamins,
            self.contraceptives,
            self.micronutrients,
            self.arv,
            self.antibiotics,
        ]
    }
}

pub fn component_score(share: f64, category: CategoryWeight) -> f64 {
    (share / category.max_share * 100.0).min(100.0)
}

pub fn component_scores(shares: &CategoryShares) -> ComponentScores {
    let values = shares.values();
    let [workforce, child, womens, empowerment, nutrition, chronic, acute]: [f64; 7] =
        std::array::from_fn(|index| component_score(values[index], WEIGHTS[index]));

    ComponentScores {
        workforce_health: Some(workforce),
        child_welfare: Some(child),
        womens_health: Some(womens),
        womens_empowerment: Some(empowerment),
        nutrition: Some(nutrition),
        chronic_illness: Some(chronic),
        acute_illness: Some(acute),
    }
}

/// Weighted sum of the components, rounded to two decimals and capped at 100.
pub fn composite_score(components: &ComponentScores) -> f64 {
    let score: f64 = components
        .values_or_zero()
        .iter()
        .zip(WEIGHTS.iter())
        .map(|(value, category)| value * category.weight)
        .sum();
    round2(score).min(100.0)
}

impl ScoreRecord {
    pub fn from_shares(
        site_id: &str,
        period_label: &str,
        year: i32,
        shares: &CategoryShares,
        total_quantity: f64,
        thresholds: &AlertThresholds,
    ) -> Result<Self> {
        let components = component_scores(shares);
        let composite = composite_score(&components);
        let level = thresholds.classify(composite)?;

        let mut record = ScoreRecord::new(site_id, period_label, year, composite)
            .with_components(components)
            .with_alert_level(level);
        record.total_quantity = total_quantity;
        Ok(record)
    }
}
