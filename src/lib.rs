pub mod aggregate;
pub mod alert;
pub mod calendar;
pub mod compare;
pub mod composite;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod outlier;
pub mod report;
pub mod summary;
pub mod trend;

pub use alert::classify;
pub use calendar::{EnglishCalendar, FrenchCalendar, MonthTable, PeriodCalendar};
pub use config::{AlertThresholds, AnalysisConfig};
pub use error::{HwiError, Result};
pub use models::{
    AlertCounts, AlertLevel, AlertShare, ComparisonRow, ComponentAverages, ComponentScores,
    ScoreRecord, SummaryStats, TrendDirection, YearChange,
};
