use tracing::debug;

use crate::error::Result;
use crate::models::ScoreRecord;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fences {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Fences {
    pub fn contains(&self, score: f64) -> bool {
        score >= self.lower && score <= self.upper
    }
}

// Positional quartiles at floor(n / 4) and floor(3n / 4), no interpolation.
pub fn tukey_fences(scores: &[f64], multiplier: f64, min_sample: usize) -> Option<Fences> {
    if scores.len() < min_sample || scores.is_empty() {
        return None;
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let q1 = sorted[n / 4];
    let q3 = sorted[(n * 3) / 4];
    let iqr = q3 - q1;

    Some(Fences {
        q1,
        q3,
        lower: q1 - multiplier * iqr,
        upper: q3 + multiplier * iqr,
    })
}

/// Records whose score falls strictly outside the fences, in input order.
pub fn find_outliers<'a>(
    records: &'a [ScoreRecord],
    multiplier: f64,
    min_sample: usize,
) -> Result<Vec<&'a ScoreRecord>> {
    let scores = records
        .iter()
        .map(ScoreRecord::checked_score)
        .collect::<Result<Vec<f64>>>()?;

    let Some(fences) = tukey_fences(&scores, multiplier, min_sample) else {
        return Ok(Vec::new());
    };
    debug!(?fences, sample = scores.len(), "computed outlier fences");

    Ok(records
        .iter()
        .filter(|record| !fences.contains(record.composite_score))
        .collect())
}
