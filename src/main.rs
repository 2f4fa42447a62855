use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hwi_monitor::aggregate::alert_distribution;
use hwi_monitor::alert::alert_mismatches;
use hwi_monitor::compare::compare_periods;
use hwi_monitor::export::{to_csv, to_json};
use hwi_monitor::outlier::find_outliers;
use hwi_monitor::report::build_report;
use hwi_monitor::summary::summarize;
use hwi_monitor::trend::{detect_trend, year_over_year};
use hwi_monitor::{AnalysisConfig, EnglishCalendar, FrenchCalendar, PeriodCalendar};

mod db;

#[derive(Parser)]
#[command(name = "hwi-monitor")]
#[command(about = "Household Welfare Index monitoring and alerting", long_about = None)]
struct Cli {
    /// JSON file overriding alert, trend and outlier thresholds
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Month naming used in period labels
    #[arg(long, value_enum, default_value_t = CalendarKind::Fr, global = true)]
    calendar: CalendarKind,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum CalendarKind {
    Fr,
    En,
}

impl CalendarKind {
    fn calendar(self) -> Box<dyn PeriodCalendar> {
        match self {
            CalendarKind::Fr => Box::new(FrenchCalendar),
            CalendarKind::En => Box::new(EnglishCalendar),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Json,
}

#[derive(Args)]
struct Scope {
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    departement: Option<String>,
}

impl Scope {
    fn query(&self) -> db::ScoreQuery {
        db::ScoreQuery {
            year: self.year,
            departement: self.departement.clone(),
            ..db::ScoreQuery::default()
        }
    }

    fn label(&self) -> Option<String> {
        match (&self.departement, self.year) {
            (Some(departement), Some(year)) => Some(format!("{departement} {year}")),
            (Some(departement), None) => Some(departement.clone()),
            (None, Some(year)) => Some(year.to_string()),
            (None, None) => None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import scores from a CSV export
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Summary statistics and alert distribution
    Summary {
        #[command(flatten)]
        scope: Scope,
    },
    /// Fitted score trend for one site
    Trend {
        #[arg(long)]
        site: String,
    },
    /// Sites whose score falls outside the IQR fences for one period
    Outliers {
        #[arg(long)]
        period: String,
        #[arg(long)]
        year: i32,
    },
    /// Compare sites between two periods
    Compare {
        #[arg(long)]
        current_period: String,
        #[arg(long)]
        current_year: i32,
        #[arg(long)]
        previous_period: String,
        #[arg(long)]
        previous_year: i32,
    },
    /// Year-over-year changes per site
    YearOverYear {
        #[arg(long)]
        departement: Option<String>,
    },
    /// Export scores as CSV or JSON
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        scope: Scope,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        scope: Scope,
        #[arg(long, default_value = "hwi-report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AnalysisConfig::from_path(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    let calendar = cli.calendar.calendar();

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let written = db::seed(&pool, &config.alert).await?;
            println!("Seed data inserted ({written} scores).");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv, &config.alert).await?;
            println!("Imported {inserted} scores from {}.", csv.display());
        }
        Commands::Summary { scope } => {
            let records = db::fetch_scores(&pool, &scope.query()).await?;
            info!(records = records.len(), "loaded scores");
            let mismatches = alert_mismatches(&records, &config.alert)?;
            let stats = summarize(&records, &config.alert)?;

            if stats.count == 0 {
                println!("No scores found for this scope.");
                return Ok(());
            }

            println!(
                "{} scores: mean {:.2}, median {:.2}, min {:.2}, max {:.2}, std dev {:.2}",
                stats.count, stats.mean, stats.median, stats.min, stats.max, stats.std_dev
            );
            for share in alert_distribution(&records, &config.alert)? {
                println!("- {}: {} ({}%)", share.level, share.count, share.percentage);
            }
            if !mismatches.is_empty() {
                println!(
                    "{} stored alert levels disagree with their scores.",
                    mismatches.len()
                );
            }
        }
        Commands::Trend { site } => {
            let query = db::ScoreQuery {
                site_id: Some(site.clone()),
                ..db::ScoreQuery::default()
            };
            let records = db::fetch_scores(&pool, &query).await?;
            let trend = detect_trend(
                &records,
                &site,
                calendar.as_ref(),
                config.trend_slope_threshold,
            )?;
            println!("{site}: {trend} across {} periods", records.len());
        }
        Commands::Outliers { period, year } => {
            let query = db::ScoreQuery {
                year: Some(year),
                period_label: Some(period.clone()),
                ..db::ScoreQuery::default()
            };
            let records = db::fetch_scores(&pool, &query).await?;
            let outliers = find_outliers(&records, config.iqr_multiplier, config.min_outlier_sample)?;

            if outliers.is_empty() {
                println!("No outliers among {} sites for {period} {year}.", records.len());
                return Ok(());
            }

            println!("Outliers for {period} {year}:");
            for record in outliers {
                println!("- {} score {:.2}", record.site_id, record.composite_score);
            }
        }
        Commands::Compare {
            current_period,
            current_year,
            previous_period,
            previous_year,
        } => {
            let current = db::fetch_scores(
                &pool,
                &db::ScoreQuery {
                    year: Some(current_year),
                    period_label: Some(current_period.clone()),
                    ..db::ScoreQuery::default()
                },
            )
            .await?;
            let previous = db::fetch_scores(
                &pool,
                &db::ScoreQuery {
                    year: Some(previous_year),
                    period_label: Some(previous_period.clone()),
                    ..db::ScoreQuery::default()
                },
            )
            .await?;
            let rows = compare_periods(&current, &previous, config.change_threshold)?;

            if rows.is_empty() {
                println!("No sites reported in both periods.");
                return Ok(());
            }

            println!(
                "{current_period} {current_year} vs {previous_period} {previous_year}:"
            );
            for row in rows {
                println!(
                    "- {}: {:.2} -> {:.2} ({:+.2}, {:+.2}%) {}",
                    row.site_id,
                    row.previous_score,
                    row.current_score,
                    row.change,
                    row.percent_change,
                    row.trend
                );
            }
        }
        Commands::YearOverYear { departement } => {
            let query = db::ScoreQuery {
                departement,
                ..db::ScoreQuery::default()
            };
            let records = db::fetch_scores(&pool, &query).await?;
            let changes = year_over_year(&records, calendar.as_ref())?;

            if changes.is_empty() {
                println!("No sites with scores in consecutive years.");
                return Ok(());
            }

            for (site_id, site_changes) in changes {
                for change in site_changes {
                    println!(
                        "- {site_id} {} -> {}: {:+.2} ({:+.2}%)",
                        change.previous_year, change.year, change.change, change.percent_change
                    );
                }
            }
        }
        Commands::Export { format, out, scope } => {
            let records = db::fetch_scores(&pool, &scope.query()).await?;
            let content = match format {
                ExportFormat::Csv => to_csv(&records)?,
                ExportFormat::Json => to_json(&records)?,
            };
            std::fs::write(&out, content)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Exported {} scores to {}.", records.len(), out.display());
        }
        Commands::Report { scope, out } => {
            let records = db::fetch_scores(&pool, &scope.query()).await?;
            let report = build_report(
                scope.label().as_deref(),
                &records,
                &config,
                calendar.as_ref(),
            )?;
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
