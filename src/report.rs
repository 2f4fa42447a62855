use std::collections::BTreeSet;
use std::fmt::Write;

use chrono::Utc;

use crate::aggregate::{alert_distribution, group_by, top_scores};
use crate::calendar::PeriodCalendar;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::models::{ScoreRecord, TrendDirection};
use crate::outlier::tukey_fences;
use crate::summary::summarize;
use crate::trend::detect_trend;

/// Outliers of each period's cross-section, in chronological order.
fn outliers_by_period<'a>(
    records: &'a [ScoreRecord],
    config: &AnalysisConfig,
    calendar: &dyn PeriodCalendar,
) -> Result<Vec<&'a ScoreRecord>> {
    let mut periods = Vec::new();
    for (_, members) in group_by(records, |record| (record.year, record.period_label.clone())) {
        let key = calendar.chronological_key(members[0])?;
        periods.push((key, members[0].period_label.clone(), members));
    }
    periods.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));

    let mut outliers = Vec::new();
    for (_, _, members) in periods {
        let scores = members
            .iter()
            .map(|record| record.checked_score())
            .collect::<Result<Vec<f64>>>()?;
        if let Some(fences) = tukey_fences(&scores, config.iqr_multiplier, config.min_outlier_sample) {
            outliers.extend(
                members
                    .into_iter()
                    .filter(|record| !fences.contains(record.composite_score)),
            );
        }
    }
    Ok(outliers)
}

pub fn build_report(
    scope: Option<&str>,
    records: &[ScoreRecord],
    config: &AnalysisConfig,
    calendar: &dyn PeriodCalendar,
) -> Result<String> {
    let stats = summarize(records, &config.alert)?;
    let distribution = alert_distribution(records, &config.alert)?;
    let highest = top_scores(records, 10)?;
    let outliers = outliers_by_period(records, config, calendar)?;

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all sites");

    let _ = writeln!(output, "# Household Welfare Index Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        scope_label,
        Utc::now().date_naive()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");

    if stats.count == 0 {
        let _ = writeln!(output, "No scores recorded for this scope.");
        return Ok(output);
    }

    let _ = writeln!(output, "- Records: {}", stats.count);
    let _ = writeln!(
        output,
        "- Mean {:.2}, median {:.2}, min {:.2}, max {:.2}, std dev {:.2}",
        stats.mean, stats.median, stats.min, stats.max, stats.std_dev
    );
    let averages = stats.component_averages;
    let _ = writeln!(
        output,
        "- Component averages: workforce {:.2}, child {:.2}, women's health {:.2}, \
         empowerment {:.2}, nutrition {:.2}, chronic {:.2}, acute {:.2}",
        averages.workforce_health,
        averages.child_welfare,
        averages.womens_health,
        averages.womens_empowerment,
        averages.nutrition,
        averages.chronic_illness,
        averages.acute_illness
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Alert Levels");
    for share in distribution.iter() {
        let _ = writeln!(
            output,
            "- {}: {} sites ({}%) - {}",
            share.level,
            share.count,
            share.percentage,
            share.level.description()
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Scores");
    for record in highest.iter() {
        let _ = writeln!(
            output,
            "- {} ({} {}) score {:.2} [{}]",
            record.site_id,
            record.period_label,
            record.year,
            record.composite_score,
            record.resolved_alert_level(&config.alert)?
        );
    }

    let sites: BTreeSet<&str> = records.iter().map(|record| record.site_id.as_str()).collect();
    let mut moving = Vec::new();
    for site_id in sites {
        let trend = detect_trend(records, site_id, calendar, config.trend_slope_threshold)?;
        if trend != TrendDirection::Stable {
            moving.push((site_id, trend));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Trends");
    if moving.is_empty() {
        let _ = writeln!(output, "All sites stable.");
    } else {
        for (site_id, trend) in moving {
            let label = match trend {
                TrendDirection::Increasing => "worsening",
                _ => "improving",
            };
            let _ = writeln!(output, "- {site_id}: {trend} ({label})");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Outliers");
    if outliers.is_empty() {
        let _ = writeln!(output, "No outliers detected.");
    } else {
        for record in outliers.iter() {
            let _ = writeln!(
                output,
                "- {} ({} {}) score {:.2}",
                record.site_id, record.period_label, record.year, record.composite_score
            );
        }
    }

    Ok(output)
}
