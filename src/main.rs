use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod form;
mod import;
mod models;
mod report;
mod risk;
mod roster;
mod session;

use api::{ApiClient, ApiError};
use config::Settings;
use form::{HomeworkStatus, MetricForm};
use models::Role;
use session::{Session, SessionStore};

#[derive(Parser)]
#[command(name = "edupredict-console")]
#[command(about = "Teacher console for the EduPredict student risk monitor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and clear the stored session
    Logout,
    /// Show who is signed in
    Whoami,
    /// Aggregate stats, top at-risk students and attendance trend
    Dashboard,
    /// Roster of assigned students with risk and latest metrics
    Students {
        #[arg(long)]
        search: Option<String>,
    },
    /// Detailed view of one student
    Student { id: i64 },
    /// Submit one weekly metric record
    Submit {
        #[arg(long, required_unless_present = "interactive")]
        student_id: Option<i64>,
        /// Week start date; defaults to Monday of the current week
        #[arg(long)]
        week: Option<NaiveDate>,
        #[arg(long, required_unless_present = "interactive")]
        attendance: Option<f64>,
        #[arg(long, required_unless_present = "interactive")]
        assignment_score: Option<f64>,
        #[arg(long, value_enum, default_value_t = HomeworkStatus::Completed)]
        homework_status: HomeworkStatus,
        #[arg(long)]
        behavior_issue: bool,
        /// Prompt for each field and keep going after each submission
        #[arg(long)]
        interactive: bool,
    },
    /// Submit a whole week of metrics from a spreadsheet
    Import {
        #[arg(long)]
        csv: PathBuf,
        /// Week start date applied to every row; defaults to Monday of the current week
        #[arg(long)]
        week: Option<NaiveDate>,
    },
    /// Write an example spreadsheet with the expected columns
    Template {
        #[arg(long, default_value = "weekly-template.csv")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    let store = SessionStore::new(settings.session_path.clone());
    let api = ApiClient::new(&settings.api_url)?;

    match cli.command {
        Commands::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => rpassword::prompt_password("Password: ")
                    .context("failed to read password")?,
            };
            login(&api, &store, &email, &password).await?;
        }
        Commands::Logout => {
            store.clear()?;
            println!("Signed out.");
        }
        Commands::Whoami => match store.load()? {
            Some(session) => println!(
                "{} ({}, id {})",
                session.full_name, session.role, session.user_id
            ),
            None => println!("Not signed in."),
        },
        Commands::Dashboard => {
            let session = store.require_teacher()?;
            let roster = roster::fetch_roster(&api, session.user_id).await?;
            let reporting_week = risk::week_start(Utc::now().date_naive());
            let stats = risk::dashboard_stats(&roster, reporting_week);
            let at_risk = risk::rank_at_risk(&roster);
            let trend = risk::weekly_attendance_trend(&roster);
            print!("{}", report::dashboard_report(&session, &stats, &at_risk, &trend));
        }
        Commands::Students { search } => {
            let session = store.require_teacher()?;
            let mut overviews = roster::fetch_roster(&api, session.user_id).await?;
            if let Some(term) = search {
                overviews = roster::filter_by_search(overviews, &term);
            }
            print!("{}", report::roster_report(&overviews));
        }
        Commands::Student { id } => {
            let session = store.require_teacher()?;
            let students = roster::assigned_to(
                api.list_students()
                    .await
                    .context("failed to load the student list")?,
                session.user_id,
            );
            let Some(student) = students.into_iter().find(|student| student.id == id) else {
                bail!("student {id} is not in your roster");
            };
            let overview = roster::enrich(&api, student).await;
            print!("{}", report::student_detail(&overview));
        }
        Commands::Submit {
            student_id,
            week,
            attendance,
            assignment_score,
            homework_status,
            behavior_issue,
            interactive,
        } => {
            let session = store.require_teacher()?;
            let week = week.unwrap_or_else(|| risk::week_start(Utc::now().date_naive()));

            if interactive {
                form::run_interactive(&api, session.user_id, week).await?;
            } else {
                let students = roster::assigned_to(
                    api.list_students()
                        .await
                        .context("failed to load the student list")?,
                    session.user_id,
                );
                let form = MetricForm {
                    student_id,
                    week_start_date: week,
                    attendance,
                    assignment_score,
                    homework_status,
                    behavior_issue,
                };
                if let Some(id) = form.student_id {
                    if !students.iter().any(|student| student.id == id) {
                        bail!("student {id} is not in your roster");
                    }
                }
                form::submit(&api, &form).await?;
                println!("Weekly update submitted. Risk analysis refreshed.");
            }
        }
        Commands::Import { csv, week } => {
            store.require_teacher()?;
            let week = week.unwrap_or_else(|| risk::week_start(Utc::now().date_naive()));
            let outcome = import::run_import(&api, &csv, week).await?;
            println!(
                "Imported week of {}: {} rows, {} succeeded, {} failed.",
                week, outcome.total, outcome.success, outcome.failed
            );
        }
        Commands::Template { out } => {
            import::write_template(&out)?;
            println!("Template written to {}.", out.display());
        }
    }

    Ok(())
}

async fn login(
    api: &ApiClient,
    store: &SessionStore,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    match api.login(email, password).await {
        Ok(response) => {
            let session = Session::from(response);
            store.save(&session)?;
            println!("Signed in as {} ({}).", session.full_name, session.role);
            match session.role {
                Role::Teacher => {
                    println!("Run `edupredict-console dashboard` to see your class.")
                }
                Role::Student => println!("The student dashboard is not built yet."),
                Role::Admin => println!("The admin console is not built yet."),
            }
            Ok(())
        }
        Err(ApiError::Backend { detail, .. }) => bail!("{detail}"),
        Err(err) => {
            tracing::error!(error = %err, "login request failed");
            bail!("Login failed. Please check credentials.");
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("EDUPREDICT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
