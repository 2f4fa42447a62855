use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HwiError, Result};
use crate::models::AlertLevel;

/// Lower bound of the yellow band.
pub const GREEN_UPPER: f64 = 25.0;
/// Lower bound of the red band.
pub const YELLOW_UPPER: f64 = 50.0;
/// Lower bound of the black band.
pub const RED_UPPER: f64 = 75.0;
pub const TREND_SLOPE_THRESHOLD: f64 = 2.0;
pub const CHANGE_THRESHOLD: f64 = 5.0;
pub const IQR_MULTIPLIER: f64 = 1.5;
pub const MIN_OUTLIER_SAMPLE: usize = 4;

/// Inclusive lower bounds of the yellow, red and black bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub yellow: f64,
    pub red: f64,
    pub black: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            yellow: GREEN_UPPER,
            red: YELLOW_UPPER,
            black: RED_UPPER,
        }
    }
}

impl AlertThresholds {
    pub fn classify(&self, score: f64) -> Result<AlertLevel> {
        if !score.is_finite() {
            return Err(HwiError::InvalidScore(score));
        }

        let level = if score >= self.black {
            AlertLevel::Black
        } else if score >= self.red {
            AlertLevel::Red
        } else if score >= self.yellow {
            AlertLevel::Yellow
        } else {
            AlertLevel::Green
        };
        Ok(level)
    }

    fn validate(&self) -> Result<()> {
        let bounds = [self.yellow, self.red, self.black];
        if bounds.iter().any(|bound| !bound.is_finite()) {
            return Err(HwiError::InvalidConfig(
                "alert thresholds must be finite".to_string(),
            ));
        }
        if !(self.yellow < self.red && self.red < self.black) {
            return Err(HwiError::InvalidConfig(format!(
                "alert thresholds must ascend, got {} / {} / {}",
                self.yellow, self.red, self.black
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub alert: AlertThresholds,
    /// Fitted slope beyond which a series counts as trending.
    pub trend_slope_threshold: f64,
    /// Raw score delta beyond which a period comparison counts as trending.
    pub change_threshold: f64,
    pub iqr_multiplier: f64,
    pub min_outlier_sample: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            alert: AlertThresholds::default(),
            trend_slope_threshold: TREND_SLOPE_THRESHOLD,
            change_threshold: CHANGE_THRESHOLD,
            iqr_multiplier: IQR_MULTIPLIER,
            min_outlier_sample: MIN_OUTLIER_SAMPLE,
        }
    }
}

impl AnalysisConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.alert.validate()?;

        for (name, value) in [
            ("trend_slope_threshold", self.trend_slope_threshold),
            ("change_threshold", self.change_threshold),
            ("iqr_multiplier", self.iqr_multiplier),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(HwiError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }

        if self.min_outlier_sample < 2 {
            return Err(HwiError::InvalidConfig(format!(
                "min_outlier_sample must be at least 2, got {}",
                self.min_outlier_sample
            )));
        }

        Ok(())
    }
}
