use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::AlertThresholds;
use crate::error::{HwiError, Result};

/// Severity bands, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Green,
    Yellow,
    Red,
    Black,
}

impl AlertLevel {
    pub const ALL: [AlertLevel; 4] = [
        AlertLevel::Green,
        AlertLevel::Yellow,
        AlertLevel::Red,
        AlertLevel::Black,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Green => "green",
            AlertLevel::Yellow => "yellow",
            AlertLevel::Red => "red",
            AlertLevel::Black => "black",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertLevel {
    type Err = HwiError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "green" => Ok(AlertLevel::Green),
            "yellow" => Ok(AlertLevel::Yellow),
            "red" => Ok(AlertLevel::Red),
            "black" => Ok(AlertLevel::Black),
            _ => Err(HwiError::UnknownAlertLevel(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    /// Scores rising, i.e. conditions worsening.
    Increasing,
    /// Scores falling, i.e. conditions improving.
    Decreasing,
    Stable,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
        };
        f.write_str(label)
    }
}

/// The seven named sub-scores. Any of them may be missing upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub workforce_health: Option<f64>,
    pub child_welfare: Option<f64>,
    pub womens_health: Option<f64>,
    pub womens_empowerment: Option<f64>,
    pub nutrition: Option<f64>,
    pub chronic_illness: Option<f64>,
    pub acute_illness: Option<f64>,
}

impl ComponentScores {
    pub fn values_or_zero(&self) -> [f64; 7] {
        [
            self.workforce_health.unwrap_or(0.0),
            self.child_welfare.unwrap_or(0.0),
            self.womens_health.unwrap_or(0.0),
            self.womens_empowerment.unwrap_or(0.0),
            self.nutrition.unwrap_or(0.0),
            self.chronic_illness.unwrap_or(0.0),
            self.acute_illness.unwrap_or(0.0),
        ]
    }

    fn named(&self) -> [(&'static str, Option<f64>); 7] {
        [
            ("workforce_health", self.workforce_health),
            ("child_welfare", self.child_welfare),
            ("womens_health", self.womens_health),
            ("womens_empowerment", self.womens_empowerment),
            ("nutrition", self.nutrition),
            ("chronic_illness", self.chronic_illness),
            ("acute_illness", self.acute_illness),
        ]
    }
}

/// One site, one period, one composite welfare score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub site_id: String,
    #[serde(default)]
    pub departement: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    pub period_label: String,
    pub year: i32,
    pub composite_score: f64,
    #[serde(default)]
    pub component_scores: ComponentScores,
    #[serde(default)]
    pub alert_level: Option<AlertLevel>,
    #[serde(default)]
    pub total_quantity: f64,
}

impl ScoreRecord {
    pub fn new(
        site_id: impl Into<String>,
        period_label: impl Into<String>,
        year: i32,
        composite_score: f64,
    ) -> Self {
        Self {
            site_id: site_id.into(),
            departement: None,
            region: None,
            period_label: period_label.into(),
            year,
            composite_score,
            component_scores: ComponentScores::default(),
            alert_level: None,
            total_quantity: 0.0,
        }
    }

    pub fn with_location(mut self, departement: &str, region: Option<&str>) -> Self {
        self.departement = Some(departement.to_string());
        self.region = region.map(str::to_string);
        self
    }

    pub fn with_components(mut self, components: ComponentScores) -> Self {
        self.component_scores = components;
        self
    }

    pub fn with_alert_level(mut self, level: AlertLevel) -> Self {
        self.alert_level = Some(level);
        self
    }

    /// The composite score, or an error naming the record if it is NaN or infinite.
    pub fn checked_score(&self) -> Result<f64> {
        if self.composite_score.is_finite() {
            Ok(self.composite_score)
        } else {
            Err(HwiError::NonFiniteScore {
                site_id: self.site_id.clone(),
                period_label: self.period_label.clone(),
                year: self.year,
                value: self.composite_score,
            })
        }
    }

    /// Checks the composite score, every present component and the total quantity.
    pub fn check_finite(&self) -> Result<()> {
        self.checked_score()?;

        let quantity = ("total_quantity", Some(self.total_quantity));
        for (field, value) in self.component_scores.named().into_iter().chain([quantity]) {
            if let Some(value) = value.filter(|value| !value.is_finite()) {
                return Err(HwiError::NonFiniteField {
                    site_id: self.site_id.clone(),
                    period_label: self.period_label.clone(),
                    year: self.year,
                    field,
                    value,
                });
            }
        }
        Ok(())
    }

    /// Stored level when upstream supplied one, otherwise derived from the score.
    pub fn resolved_alert_level(&self, thresholds: &AlertThresholds) -> Result<AlertLevel> {
        let score = self.checked_score()?;
        match self.alert_level {
            Some(level) => Ok(level),
            None => thresholds.classify(score),
        }
    }

    pub fn recomputed_alert_level(&self, thresholds: &AlertThresholds) -> Result<AlertLevel> {
        thresholds.classify(self.checked_score()?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertShare {
    pub level: AlertLevel,
    pub count: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertCounts {
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
    pub black: usize,
}

impl AlertCounts {
    pub fn record(&mut self, level: AlertLevel) {
        match level {
            AlertLevel::Green => self.green += 1,
            AlertLevel::Yellow => self.yellow += 1,
            AlertLevel::Red => self.red += 1,
            AlertLevel::Black => self.black += 1,
        }
    }

    pub fn get(&self, level: AlertLevel) -> usize {
        match level {
            AlertLevel::Green => self.green,
            AlertLevel::Yellow => self.yellow,
            AlertLevel::Red => self.red,
            AlertLevel::Black => self.black,
        }
    }

    pub fn total(&self) -> usize {
        self.green + self.yellow + self.red + self.black
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ComponentAverages {
    pub workforce_health: f64,
    pub child_welfare: f64,
    pub womens_health: f64,
    pub womens_empowerment: f64,
    pub nutrition: f64,
    pub chronic_illness: f64,
    pub acute_illness: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    pub alert_distribution: AlertCounts,
    pub component_averages: ComponentAverages,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub site_id: String,
    pub current_score: f64,
    pub previous_score: f64,
    pub change: f64,
    pub percent_change: f64,
    pub trend: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearChange {
    pub year: i32,
    pub previous_year: i32,
    pub change: f64,
    pub percent_change: f64,
}

/// Two-decimal rounding with halves rounded toward positive infinity.
pub fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// `change / baseline * 100`, or zero when the baseline is not positive.
pub fn percent_change(change: f64, baseline: f64) -> f64 {
    if baseline > 0.0 {
        change / baseline * 100.0
    } else {
        0.0
    }
}
