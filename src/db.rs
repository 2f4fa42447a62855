use anyhow::Context;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use hwi_monitor::composite::CategoryShares;
use hwi_monitor::export::from_csv_reader;
use hwi_monitor::{AlertLevel, AlertThresholds, ComponentScores, ScoreRecord};

const SELECT_SCORES: &str = "SELECT site_id, departement, region, period_label, year, hwi_score, \
     workforce_health_score, child_welfare_score, womens_health_score, \
     womens_empowerment_score, nutrition_score, chronic_illness_score, \
     acute_illness_score, alert_level, total_quantity \
     FROM hwi.household_welfare_index WHERE TRUE";

#[derive(Debug, Clone, Default)]
pub struct ScoreQuery {
    pub year: Option<i32>,
    pub period_label: Option<String>,
    pub departement: Option<String>,
    pub site_id: Option<String>,
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool, thresholds: &AlertThresholds) -> anyhow::Result<usize> {
    let sites = [
        ("PH-ABJ-001", "Abidjan", "Lagunes", 0.08),
        ("PH-BKE-002", "Bouake", "Gbeke", 0.14),
        ("PH-SPE-003", "San-Pedro", "San-Pedro", 0.22),
        ("PH-DAL-004", "Daloa", "Haut-Sassandra", 0.30),
    ];
    let months = ["Janvier", "Février", "Mars", "Avril", "Mai", "Juin"];

    let mut written = 0usize;
    for (site_id, departement, region, base_share) in sites {
        for (step, month) in months.iter().enumerate() {
            let drift = step as f64 * 0.01;
            let shares = CategoryShares {
                antimalarial: base_share + drift,
                pediatric_ors_zinc: base_share * 0.4,
                prenatal_vitamins: 0.02,
                contraceptives: 0.01,
                micronutrients: base_share * 0.3,
                arv: 0.01,
                antibiotics: base_share * 0.5,
            };
            let record = ScoreRecord::from_shares(
                site_id,
                month,
                2024,
                &shares,
                1_000.0 + step as f64 * 75.0,
                thresholds,
            )?
            .with_location(departement, Some(region));

            if upsert_score(pool, &record).await? {
                written += 1;
            }
        }
    }

    Ok(written)
}

fn record_from_row(row: &PgRow) -> anyhow::Result<ScoreRecord> {
    let alert_level = row
        .get::<Option<String>, _>("alert_level")
        .map(|level| level.parse::<AlertLevel>())
        .transpose()?;

    Ok(ScoreRecord {
        site_id: row.get("site_id"),
        departement: row.get("departement"),
        region: row.get("region"),
        period_label: row.get("period_label"),
        year: row.get("year"),
        composite_score: row.get("hwi_score"),
        component_scores: ComponentScores {
            workforce_health: row.get("workforce_health_score"),
            child_welfare: row.get("child_welfare_score"),
            womens_health: row.get("womens_health_score"),
            womens_empowerment: row.get("womens_empowerment_score"),
            nutrition: row.get("nutrition_score"),
            chronic_illness: row.get("chronic_illness_score"),
            acute_illness: row.get("acute_illness_score"),
        },
        alert_level,
        total_quantity: row.get("total_quantity"),
    })
}

pub async fn fetch_scores(pool: &PgPool, query: &ScoreQuery) -> anyhow::Result<Vec<ScoreRecord>> {
    let mut builder = QueryBuilder::<Postgres>::new(SELECT_SCORES);

    if let Some(year) = query.year {
        builder.push(" AND year = ").push_bind(year);
    }
    if let Some(period_label) = &query.period_label {
        builder.push(" AND period_label = ").push_bind(period_label.clone());
    }
    if let Some(departement) = &query.departement {
        builder.push(" AND departement = ").push_bind(departement.clone());
    }
    if let Some(site_id) = &query.site_id {
        builder.push(" AND site_id = ").push_bind(site_id.clone());
    }
    builder.push(" ORDER BY year, site_id");

    let rows = builder.build().fetch_all(pool).await?;
    rows.iter().map(record_from_row).collect()
}

pub async fn upsert_score(pool: &PgPool, record: &ScoreRecord) -> anyhow::Result<bool> {
    let components = &record.component_scores;
    let result = sqlx::query(
        r#"
        INSERT INTO hwi.household_welfare_index
        (id, site_id, departement, region, period_label, year, hwi_score,
         workforce_health_score, child_welfare_score, womens_health_score,
         womens_empowerment_score, nutrition_score, chronic_illness_score,
         acute_illness_score, alert_level, total_quantity)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        ON CONFLICT (site_id, period_label, year) DO UPDATE
        SET departement = EXCLUDED.departement,
            region = EXCLUDED.region,
            hwi_score = EXCLUDED.hwi_score,
            workforce_health_score = EXCLUDED.workforce_health_score,
            child_welfare_score = EXCLUDED.child_welfare_score,
            womens_health_score = EXCLUDED.womens_health_score,
            womens_empowerment_score = EXCLUDED.womens_empowerment_score,
            nutrition_score = EXCLUDED.nutrition_score,
            chronic_illness_score = EXCLUDED.chronic_illness_score,
            acute_illness_score = EXCLUDED.acute_illness_score,
            alert_level = EXCLUDED.alert_level,
            total_quantity = EXCLUDED.total_quantity,
            updated_at = now()
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&record.site_id)
    .bind(record.departement.as_deref())
    .bind(record.region.as_deref())
    .bind(&record.period_label)
    .bind(record.year)
    .bind(record.composite_score)
    .bind(components.workforce_health)
    .bind(components.child_welfare)
    .bind(components.womens_health)
    .bind(components.womens_empowerment)
    .bind(components.nutrition)
    .bind(components.chronic_illness)
    .bind(components.acute_illness)
    .bind(record.alert_level.map(|level| level.as_str()))
    .bind(record.total_quantity)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn import_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
    thresholds: &AlertThresholds,
) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let records = from_csv_reader(file)?;

    let mut inserted = 0usize;
    for record in records {
        let record = match record.alert_level {
            Some(_) => record,
            None => {
                let level = record.recomputed_alert_level(thresholds)?;
                record.with_alert_level(level)
            }
        };

        if upsert_score(pool, &record).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}
