use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod db;
mod export;
mod grade;
mod models;
mod rank;
mod report;
mod sms;

use models::{RankedAggregate, RosterEntry};

#[derive(Parser)]
#[command(name = "term-results")]
#[command(about = "Termly results aggregation and ranking for school cohorts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CohortScope {
    /// Class name, e.g. "Form 2"
    #[arg(long)]
    class: String,
    /// Restrict to one stream within the class
    #[arg(long)]
    stream: Option<String>,
    #[arg(long)]
    term: String,
    #[arg(long)]
    year: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import score submissions from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Submit or resubmit a single score
    Submit {
        #[arg(long)]
        admission: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        term: String,
        #[arg(long)]
        year: String,
        #[arg(long)]
        teacher: String,
        #[arg(long)]
        score: f64,
    },
    /// Aggregate one student's term performance
    Performance {
        #[arg(long)]
        student: String,
        #[arg(long)]
        term: String,
        #[arg(long)]
        year: String,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Rank a cohort's results
    Results {
        #[command(flatten)]
        scope: CohortScope,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Summarize a cohort's grade distribution and averages
    Summary {
        #[command(flatten)]
        scope: CohortScope,
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Also write the summary as a markdown file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write one student's result slip as markdown
    Report {
        #[arg(long)]
        student: String,
        #[arg(long)]
        term: String,
        #[arg(long)]
        year: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export a cohort mark sheet as CSV
    Export {
        #[command(flatten)]
        scope: CohortScope,
        #[arg(long, default_value = "results.csv")]
        out: PathBuf,
    },
    /// Compose results SMS messages for a cohort's guardians
    Notify {
        #[command(flatten)]
        scope: CohortScope,
    },
}

async fn load_ranked_cohort(
    pool: &PgPool,
    scope: &CohortScope,
) -> anyhow::Result<(Vec<RosterEntry>, Vec<RankedAggregate>)> {
    let roster = db::fetch_cohort_roster(pool, &scope.class, scope.stream.as_deref()).await?;
    let scores = db::fetch_scores_for_cohort(
        pool,
        &scope.class,
        scope.stream.as_deref(),
        &scope.term,
        &scope.year,
    )
    .await?;

    let aggregates = aggregate::aggregate_cohort(&roster, &scores, &scope.term, &scope.year);
    let mut ranked = rank::rank_cohort(aggregates);
    rank::assign_stream_ranks(&mut ranked);

    Ok((roster, ranked))
}

fn school_name() -> String {
    std::env::var("SCHOOL_NAME").unwrap_or_else(|_| "School Management System".to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
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
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let submitted = db::import_csv(&pool, &csv).await?;
            println!("Submitted {submitted} scores from {}.", csv.display());
        }
        Commands::Submit {
            admission,
            subject,
            term,
            year,
            teacher,
            score,
        } => {
            let submission = db::ScoreSubmission {
                admission_number: admission,
                subject_code: subject,
                term_name: term,
                academic_year: year,
                teacher_code: teacher,
                score,
            };
            db::upsert_score(&pool, &submission).await?;
            println!(
                "Score {} recorded for {} in {}.",
                submission.score, submission.admission_number, submission.subject_code
            );
        }
        Commands::Performance {
            student,
            term,
            year,
            json,
        } => {
            let entry = db::find_student(&pool, &student)
                .await?
                .with_context(|| format!("no active student {student}"))?;
            let scores =
                db::fetch_scores_for_student(&pool, entry.student_id, &term, &year).await?;
            let aggregate = aggregate::aggregate_student(&entry, &term, &year, &scores);

            if json {
                println!("{}", serde_json::to_string_pretty(&aggregate)?);
                return Ok(());
            }

            if !aggregate.has_scores() {
                println!(
                    "No scores submitted for {} in {} {}.",
                    aggregate.fullname, term, year
                );
                return Ok(());
            }

            println!(
                "{} ({}), {} {}",
                aggregate.fullname, aggregate.admission_number, term, year
            );
            println!(
                "Total {:.1} across {} subjects, average {:.2} ({})",
                aggregate.total_score,
                aggregate.subject_count,
                aggregate.average_score,
                aggregate.overall_grade
            );
            for subject in &aggregate.subject_results {
                println!(
                    "- {}: {:.1} ({}) by {}",
                    subject.subject_name, subject.score, subject.grade, subject.teacher
                );
            }
        }
        Commands::Results { scope, limit, json } => {
            let (_, ranked) = load_ranked_cohort(&pool, &scope).await?;

            if ranked.is_empty() {
                println!("No students found for this cohort.");
                return Ok(());
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&ranked)?);
                return Ok(());
            }

            println!("Cohort standings:");
            for entry in ranked.iter().take(limit) {
                println!(
                    "- #{} {} ({}) average {:.2} ({}) across {} subjects [stream rank {}]",
                    entry.class_rank,
                    entry.aggregate.fullname,
                    entry.aggregate.admission_number,
                    entry.aggregate.average_score,
                    entry.aggregate.overall_grade,
                    entry.aggregate.subject_count,
                    entry.stream_rank
                );
            }
        }
        Commands::Summary { scope, json, out } => {
            let (_, ranked) = load_ranked_cohort(&pool, &scope).await?;
            let summary = report::build_cohort_summary(&ranked);
            let stream_label = scope.stream.as_deref().unwrap_or("all streams");

            if let Some(path) = &out {
                let label = format!(
                    "{} ({}), {} {}",
                    scope.class, stream_label, scope.term, scope.year
                );
                let digest = report::render_cohort_markdown(
                    &summary,
                    &ranked,
                    &label,
                    Utc::now().date_naive(),
                );
                std::fs::write(path, digest)?;
                println!("Summary written to {}.", path.display());
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            println!(
                "{} ({}), {} {}",
                scope.class, stream_label, scope.term, scope.year
            );
            println!(
                "{} students, {} with scores, average performance {:.2}",
                summary.total_students, summary.students_with_scores, summary.average_performance
            );
            if summary.grade_distribution.is_empty() {
                println!("No scored students in this cohort.");
            } else {
                for (grade, count) in &summary.grade_distribution {
                    println!("- {grade}: {count}");
                }
            }
        }
        Commands::Report {
            student,
            term,
            year,
            out,
        } => {
            let entry = db::find_student(&pool, &student)
                .await?
                .with_context(|| format!("no active student {student}"))?;
            let scope = CohortScope {
                class: entry.class_name.clone(),
                stream: Some(entry.stream_name.clone()),
                term: term.clone(),
                year: year.clone(),
            };
            let (_, ranked) = load_ranked_cohort(&pool, &scope).await?;
            let ranked_entry = ranked
                .iter()
                .find(|candidate| candidate.aggregate.student_id == entry.student_id)
                .with_context(|| format!("student {student} missing from cohort ranking"))?;

            let comments = db::fetch_comments(&pool, entry.student_id, &term, &year).await?;
            let individual = report::build_individual_report(ranked_entry, &comments);
            let slip = report::render_individual_markdown(
                &individual,
                &school_name(),
                Utc::now().date_naive(),
            );
            std::fs::write(&out, slip)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { scope, out } => {
            let (_, ranked) = load_ranked_cohort(&pool, &scope).await?;
            if ranked.is_empty() {
                println!("No students found for this cohort.");
                return Ok(());
            }
            let artifact = export::export_cohort_csv(&ranked, &out)?;
            println!("Mark sheet written to {}.", artifact.display());
        }
        Commands::Notify { scope } => {
            let (roster, ranked) = load_ranked_cohort(&pool, &scope).await?;
            let batch = sms::compose_results_batch(&ranked, &roster);

            if batch.messages.is_empty() && batch.skipped.is_empty() {
                println!("No students found for this cohort.");
                return Ok(());
            }

            for message in &batch.messages {
                println!("To {}: {}", message.phone, message.message);
            }
            println!(
                "{} messages composed, {} students without a guardian phone.",
                batch.messages.len(),
                batch.skipped.len()
            );
            for name in &batch.skipped {
                println!("- skipped {name}");
            }
        }
    }

    Ok(())
}
