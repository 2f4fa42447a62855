use thiserror::Error;

pub type Result<T> = std::result::Result<T, HwiError>;

#[derive(Debug, Error)]
pub enum HwiError {
    #[error("score {0} is not a finite number")]
    InvalidScore(f64),

    #[error("site {site_id} ({period_label} {year}) has non-finite composite score {value}")]
    NonFiniteScore {
        site_id: String,
        period_label: String,
        year: i32,
        value: f64,
    },

    #[error("site {site_id} ({period_label} {year}) has non-finite {field} {value}")]
    NonFiniteField {
        site_id: String,
        period_label: String,
        year: i32,
        field: &'static str,
        value: f64,
    },

    #[error("period label '{0}' does not name a known month")]
    UnknownPeriod(String),

    #[error("unknown alert level '{0}'")]
    UnknownAlertLevel(String),

    #[error("invalid analysis config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
