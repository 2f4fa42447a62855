use std::io::Read;

use serde::Deserialize;

use crate::error::Result;
use crate::models::{AlertLevel, ComponentScores, ScoreRecord};

pub const CSV_HEADERS: [&str; 15] = [
    "Site ID",
    "Departement",
    "Region",
    "Period",
    "Year",
    "HWI Score",
    "Alert Level",
    "Workforce Health",
    "Child Welfare",
    "Women's Health",
    "Women's Empowerment",
    "Nutrition",
    "Chronic Illness",
    "Acute Illness",
    "Total Quantity",
];

/// Empty input gives an empty string, not a lone header.
pub fn to_csv(records: &[ScoreRecord]) -> Result<String> {
    if records.is_empty() {
        return Ok(String::new());
    }

    for record in records {
        record.check_finite()?;
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADERS)?;

    for record in records {
        let mut row = vec![
            record.site_id.clone(),
            record.departement.clone().unwrap_or_default(),
            record.region.clone().unwrap_or_default(),
            record.period_label.clone(),
            record.year.to_string(),
            format!("{:.2}", record.composite_score),
            record
                .alert_level
                .map(|level| level.to_string())
                .unwrap_or_default(),
        ];
        row.extend(
            record
                .component_scores
                .values_or_zero()
                .iter()
                .map(|value| format!("{value:.2}")),
        );
        row.push(record.total_quantity.to_string());
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| err.into_error())?;
    let mut output = String::from_utf8_lossy(&bytes).into_owned();
    if output.ends_with('\n') {
        output.pop();
    }
    Ok(output)
}

pub fn to_json(records: &[ScoreRecord]) -> Result<String> {
    for record in records {
        record.check_finite()?;
    }
    Ok(serde_json::to_string_pretty(records)?)
}

pub fn from_json(raw: &str) -> Result<Vec<ScoreRecord>> {
    Ok(serde_json::from_str(raw)?)
}

#[derive(Deserialize)]
struct CsvRow {
    #[serde(rename = "Site ID")]
    site_id: String,
    #[serde(rename = "Departement")]
    departement: Option<String>,
    #[serde(rename = "Region")]
    region: Option<String>,
    #[serde(rename = "Period")]
    period_label: String,
    #[serde(rename = "Year")]
    year: i32,
    #[serde(rename = "HWI Score")]
    composite_score: f64,
    #[serde(rename = "Alert Level")]
    alert_level: Option<String>,
    #[serde(rename = "Workforce Health")]
    workforce_health: Option<f64>,
    #[serde(rename = "Child Welfare")]
    child_welfare: Option<f64>,
    #[serde(rename = "Women's Health")]
    womens_health: Option<f64>,
    #[serde(rename = "Women's Empowerment")]
    womens_empowerment: Option<f64>,
    #[serde(rename = "Nutrition")]
    nutrition: Option<f64>,
    #[serde(rename = "Chronic Illness")]
    chronic_illness: Option<f64>,
    #[serde(rename = "Acute Illness")]
    acute_illness: Option<f64>,
    #[serde(rename = "Total Quantity")]
    total_quantity: Option<f64>,
}

impl CsvRow {
    fn into_record(self) -> Result<ScoreRecord> {
        let alert_level = self
            .alert_level
            .filter(|level| !level.trim().is_empty())
            .map(|level| level.parse::<AlertLevel>())
            .transpose()?;

        Ok(ScoreRecord {
            site_id: self.site_id,
            departement: self.departement.filter(|value| !value.is_empty()),
            region: self.region.filter(|value| !value.is_empty()),
            period_label: self.period_label,
            year: self.year,
            composite_score: self.composite_score,
            component_scores: ComponentScores {
                workforce_health: self.workforce_health,
                child_welfare: self.child_welfare,
                womens_health: self.womens_health,
                womens_empowerment: self.womens_empowerment,
                nutrition: self.nutrition,
                chronic_illness: self.chronic_illness,
                acute_illness: self.acute_illness,
            },
            alert_level,
            total_quantity: self.total_quantity.unwrap_or(0.0),
        })
    }
}

/// Parses CSV in the layout written by [`to_csv`].
pub fn from_csv_reader<R: Read>(reader: R) -> Result<Vec<ScoreRecord>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();

    for row in reader.deserialize::<CsvRow>() {
        records.push(row?.into_record()?);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HwiError;
    use proptest::prelude::*;

    fn sample_records() -> Vec<ScoreRecord> {
        vec![
            ScoreRecord::new("PH-001", "Mars", 2024, 42.5)
                .with_location("Abidjan", Some("Lagunes"))
                .with_components(ComponentScores {
                    workforce_health: Some(80.0),
                    child_welfare: Some(12.25),
                    ..ComponentScores::default()
                })
                .with_alert_level(AlertLevel::Yellow),
            ScoreRecord {
                total_quantity: 310.0,
                ..ScoreRecord::new("PH-002", "Avril", 2024, 77.0)
            },
        ]
    }

    #[test]
    fn empty_csv_is_empty_string() {
        assert_eq!(to_csv(&[]).unwrap(), "");
    }

    #[test]
    fn csv_has_header_and_formatted_rows() {
        let csv = to_csv(&sample_records()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Site ID,Departement,Region,Period,Year,HWI Score"));
        assert_eq!(
            lines[1],
            "PH-001,Abidjan,Lagunes,Mars,2024,42.50,yellow,80.00,12.25,0.00,0.00,0.00,0.00,0.00,0"
        );
        assert_eq!(
            lines[2],
            "PH-002,,,Avril,2024,77.00,,0.00,0.00,0.00,0.00,0.00,0.00,0.00,310"
        );
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn csv_quotes_fields_with_commas() {
        let records = vec![ScoreRecord::new("PH-003", "Mai", 2024, 10.0).with_location("Bas-Sassandra, Sud", None)];
        let csv = to_csv(&records).unwrap();
        assert!(csv.contains("\"Bas-Sassandra, Sud\""));
    }

    #[test]
    fn csv_reads_back_its_own_layout() {
        let csv = to_csv(&sample_records()).unwrap();
        let parsed = from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].departement.as_deref(), Some("Abidjan"));
        assert_eq!(parsed[0].alert_level, Some(AlertLevel::Yellow));
        assert_eq!(parsed[0].component_scores.child_welfare, Some(12.25));
        assert_eq!(parsed[1].alert_level, None);
        assert_eq!(parsed[1].region, None);
        assert_eq!(parsed[1].total_quantity, 310.0);
    }

    #[test]
    fn json_round_trips_field_for_field() {
        let records = sample_records();
        let json = to_json(&records).unwrap();
        assert!(json.contains("\n  {"));
        assert!(json.contains("\"composite_score\": 42.5"));
        assert_eq!(from_json(&json).unwrap(), records);
    }

    #[test]
    fn exports_reject_non_finite_values() {
        let records = vec![ScoreRecord::new("PH-004", "Mai", 2024, f64::NAN)];
        assert!(matches!(to_json(&records), Err(HwiError::NonFiniteScore { .. })));
        assert!(matches!(to_csv(&records), Err(HwiError::NonFiniteScore { .. })));

        let records = vec![ScoreRecord::new("PH-005", "Mai", 2024, 20.0).with_components(ComponentScores {
            nutrition: Some(f64::INFINITY),
            ..ComponentScores::default()
        })];
        assert!(matches!(
            to_json(&records),
            Err(HwiError::NonFiniteField { field: "nutrition", .. })
        ));
    }

    proptest! {
        #[test]
        fn json_round_trips_arbitrary_scores(
            values in proptest::collection::vec(
                (0.0f64..100.0, proptest::option::of(0.0f64..100.0), 0.0f64..1e6),
                1..50,
            )
        ) {
            let records: Vec<ScoreRecord> = values
                .iter()
                .enumerate()
                .map(|(index, (score, component, quantity))| ScoreRecord {
                    total_quantity: *quantity,
                    ..ScoreRecord::new(format!("S{index}"), "Juin", 2024, *score).with_components(
                        ComponentScores {
                            workforce_health: *component,
                            acute_illness: Some(*score / 3.0),
                            ..ComponentScores::default()
                        },
                    )
                })
                .collect();
            let json = to_json(&records).unwrap();
            prop_assert_eq!(from_json(&json).unwrap(), records);
        }
    }
}
