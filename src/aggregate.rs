use std::collections::HashMap;
use std::hash::Hash;

use tracing::debug;

use crate::config::AlertThresholds;
use crate::error::Result;
use crate::models::{round2, AlertCounts, AlertLevel, AlertShare, ScoreRecord};

pub fn group_by<'a, K, F>(records: &'a [ScoreRecord], key: F) -> HashMap<K, Vec<&'a ScoreRecord>>
where
    K: Eq + Hash,
    F: Fn(&ScoreRecord) -> K,
{
    let mut groups: HashMap<K, Vec<&ScoreRecord>> = HashMap::new();
    for record in records {
        groups.entry(key(record)).or_default().push(record);
    }
    groups
}

pub fn average_by_group<K, F>(records: &[ScoreRecord], key: F) -> Result<HashMap<K, f64>>
where
    K: Eq + Hash,
    F: Fn(&ScoreRecord) -> K,
{
    let groups = group_by(records, key);
    let mut averages = HashMap::with_capacity(groups.len());

    for (group, members) in groups {
        let mut sum = 0.0;
        for record in &members {
            sum += record.checked_score()?;
        }
        averages.insert(group, round2(sum / members.len() as f64));
    }

    debug!(groups = averages.len(), "averaged scores by group");
    Ok(averages)
}

pub fn alert_counts(records: &[ScoreRecord], thresholds: &AlertThresholds) -> Result<AlertCounts> {
    let mut counts = AlertCounts::default();
    for record in records {
        counts.record(record.resolved_alert_level(thresholds)?);
    }
    Ok(counts)
}

/// Count and rounded percentage for all four levels, or nothing for an empty input.
pub fn alert_distribution(
    records: &[ScoreRecord],
    thresholds: &AlertThresholds,
) -> Result<Vec<AlertShare>> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let counts = alert_counts(records, thresholds)?;
    let total = counts.total() as f64;

    Ok(AlertLevel::ALL
        .iter()
        .map(|&level| {
            let count = counts.get(level);
            AlertShare {
                level,
                count,
                percentage: (count as f64 / total * 100.0).round() as u32,
            }
        })
        .collect())
}

#[derive(Debug, Clone, Default)]
pub struct ScoreFilter {
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub alert_levels: Option<Vec<AlertLevel>>,
    pub departements: Option<Vec<String>>,
    pub years: Option<Vec<i32>>,
    pub site_ids: Option<Vec<String>>,
}

impl ScoreFilter {
    pub fn matches(&self, record: &ScoreRecord) -> Result<bool> {
        let score = record.checked_score()?;
        if self.min_score.is_some_and(|min| score < min) {
            return Ok(false);
        }
        if self.max_score.is_some_and(|max| score > max) {
            return Ok(false);
        }
        if let Some(levels) = &self.alert_levels {
            match record.alert_level {
                Some(level) if levels.contains(&level) => {}
                _ => return Ok(false),
            }
        }
        if let Some(departements) = &self.departements {
            match &record.departement {
                Some(departement) if departements.contains(departement) => {}
                _ => return Ok(false),
            }
        }
        if let Some(years) = &self.years {
            if !years.contains(&record.year) {
                return Ok(false);
            }
        }
        if let Some(site_ids) = &self.site_ids {
            if !site_ids.contains(&record.site_id) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

pub fn filter_scores<'a>(
    records: &'a [ScoreRecord],
    filter: &ScoreFilter,
) -> Result<Vec<&'a ScoreRecord>> {
    let mut matched = Vec::new();
    for record in records {
        if filter.matches(record)? {
            matched.push(record);
        }
    }
    Ok(matched)
}

pub fn scores_above_threshold(records: &[ScoreRecord], threshold: f64) -> Result<Vec<&ScoreRecord>> {
    let mut matched = Vec::new();
    for record in records {
        if record.checked_score()? >= threshold {
            matched.push(record);
        }
    }
    Ok(matched)
}

fn sorted_by_score(records: &[ScoreRecord], descending: bool) -> Result<Vec<&ScoreRecord>> {
    for record in records {
        record.checked_score()?;
    }
    let mut sorted: Vec<&ScoreRecord> = records.iter().collect();
    if descending {
        sorted.sort_by(|a, b| b.composite_score.total_cmp(&a.composite_score));
    } else {
        sorted.sort_by(|a, b| a.composite_score.total_cmp(&b.composite_score));
    }
    Ok(sorted)
}

/// The `n` highest scores, highest first. Ties keep input order.
pub fn top_scores(records: &[ScoreRecord], n: usize) -> Result<Vec<&ScoreRecord>> {
    Ok(sorted_by_score(records, true)?.into_iter().take(n).collect())
}

pub fn bottom_scores(records: &[ScoreRecord], n: usize) -> Result<Vec<&ScoreRecord>> {
    Ok(sorted_by_score(records, false)?.into_iter().take(n).collect())
}
