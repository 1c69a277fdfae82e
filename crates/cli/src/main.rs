//! ERP Intake CLI - operator surface over the registration store

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{Table, Tabled};

use erp_intake_core::application::{IntakeService, SubmitOutcome};
use erp_intake_core::domain::{
    ErpCode, NewRegistration, Registration, RegistrationId, RegistrationPatch, RegistrationStatus,
};
use erp_intake_core::port::{ListOrder, ListQuery, RegistrationRepository};
use erp_intake_infra_postgres::{create_pool, run_migrations, DatabaseConfig, PgRegistrationRepository};

#[derive(Parser)]
#[command(name = "erp-intake")]
#[command(about = "Business registration intake store CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,

    /// Register a parsed certificate from a JSON file ("-" for stdin)
    Register {
        file: PathBuf,
    },

    /// Show one registration
    Show {
        #[arg(long, conflicts_with_all = ["business_number", "id"])]
        erp_code: Option<ErpCode>,

        #[arg(long, conflicts_with = "id")]
        business_number: Option<String>,

        #[arg(long)]
        id: Option<RegistrationId>,
    },

    /// List registrations in a status
    List {
        /// pending | processing | completed | failed
        #[arg(short, long, default_value = "pending")]
        status: RegistrationStatus,

        /// newest | oldest | erp_code_asc | erp_code_desc
        #[arg(short, long, default_value = "newest")]
        order: ListOrder,

        #[arg(short = 'n', long, default_value = "20")]
        limit: i64,
    },

    /// Claim the next pending registration (moves it to processing)
    Claim,

    /// Set a registration's status
    SetStatus {
        id: RegistrationId,
        status: RegistrationStatus,

        /// Allow moves that go backwards in the workflow
        #[arg(long)]
        force: bool,
    },

    /// Apply a partial update from a JSON file ("-" for stdin)
    Update {
        id: RegistrationId,
        file: PathBuf,
    },

    /// Count registrations per status
    Stats,
}

#[derive(Tabled)]
struct RegistrationLine {
    id: RegistrationId,
    erp_code: ErpCode,
    client_name: String,
    business_name: String,
    business_number: String,
    status: String,
    created_at: String,
}

impl From<&Registration> for RegistrationLine {
    fn from(r: &Registration) -> Self {
        Self {
            id: r.id,
            erp_code: r.erp_code,
            client_name: r.client_name.clone(),
            business_name: r.business_name.clone(),
            business_number: r.business_number.clone().unwrap_or_else(|| "-".to_string()),
            status: colored_status(r.status),
            created_at: r.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Tabled)]
struct StatusCount {
    status: String,
    count: i64,
}

fn colored_status(status: RegistrationStatus) -> String {
    match status {
        RegistrationStatus::Pending => status.as_str().yellow().to_string(),
        RegistrationStatus::Processing => status.as_str().cyan().to_string(),
        RegistrationStatus::Completed => status.as_str().green().to_string(),
        RegistrationStatus::Failed => status.as_str().red().to_string(),
    }
}

fn read_json_input(file: &Path) -> Result<String> {
    if file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
    }
}

fn print_registration(registration: &Registration) -> Result<()> {
    println!("{}", Table::new([RegistrationLine::from(registration)]));
    println!("{}", serde_json::to_string_pretty(registration)?);
    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { "erp_intake=info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = DatabaseConfig::from_env().context("database configuration")?;
    let pool = create_pool(&config).await.context("Failed to connect to database")?;

    if let Commands::Migrate = cli.command {
        run_migrations(&pool).await.context("Migration failed")?;
        println!("{}", "✓ Schema is up to date".green().bold());
        return Ok(());
    }

    let repo: Arc<dyn RegistrationRepository> = Arc::new(PgRegistrationRepository::new(pool));
    let service = IntakeService::new(repo.clone());

    match cli.command {
        Commands::Migrate => unreachable!("handled above"),

        Commands::Register { file } => {
            let new: NewRegistration =
                serde_json::from_str(&read_json_input(&file)?).context("Invalid registration JSON")?;

            match service.submit(new).await? {
                SubmitOutcome::Registered(record) => {
                    println!(
                        "{}",
                        format!("✓ Registered with ERP code {}", record.erp_code).green().bold()
                    );
                    print_registration(&record)?;
                }
                SubmitOutcome::AlreadyRegistered(existing) => {
                    println!(
                        "{}",
                        format!(
                            "⚠ Business number already registered (ERP code {})",
                            existing.erp_code
                        )
                        .yellow()
                        .bold()
                    );
                    print_registration(&existing)?;
                }
            }
        }

        Commands::Show {
            erp_code,
            business_number,
            id,
        } => {
            let found = match (erp_code, business_number, id) {
                (Some(code), _, _) => repo.get_by_erp_code(code).await?,
                (_, Some(number), _) => repo.get_by_business_number(&number).await?,
                (_, _, Some(id)) => repo.get_by_id(id).await?,
                _ => bail!("one of --erp-code, --business-number or --id is required"),
            };
            match found {
                Some(registration) => print_registration(&registration)?,
                None => println!("{}", "No matching registration".yellow()),
            }
        }

        Commands::List {
            status,
            order,
            limit,
        } => {
            let rows = repo
                .list_by_status(status, ListQuery::new(order).limit(limit))
                .await?;
            if rows.is_empty() {
                println!("{}", format!("No {} registrations", status).yellow());
            } else {
                let lines: Vec<RegistrationLine> = rows.iter().map(RegistrationLine::from).collect();
                println!("{}", Table::new(lines));
            }
        }

        Commands::Claim => match repo.fetch_pending_job().await? {
            Some(registration) => {
                println!(
                    "{}",
                    format!("✓ Claimed registration {}", registration.id).green().bold()
                );
                print_registration(&registration)?;
            }
            None => println!("{}", "No pending registrations".yellow()),
        },

        Commands::SetStatus { id, status, force } => {
            let updated = if force {
                repo.update_status(id, status).await?
            } else {
                service.advance_status(id, status).await?
            };
            println!(
                "{} {} -> {}",
                "✓ Registration".green().bold(),
                updated.id,
                colored_status(updated.status)
            );
        }

        Commands::Update { id, file } => {
            let patch: RegistrationPatch =
                serde_json::from_str(&read_json_input(&file)?).context("Invalid patch JSON")?;
            let updated = repo.update_registration(id, &patch).await?;
            println!("{}", format!("✓ Registration {} updated", id).green().bold());
            print_registration(&updated)?;
        }

        Commands::Stats => {
            let mut counts = Vec::with_capacity(RegistrationStatus::ALL.len());
            for status in RegistrationStatus::ALL {
                counts.push(StatusCount {
                    status: colored_status(status),
                    count: repo.count_by_status(status).await?,
                });
            }
            println!("{}", Table::new(counts));
        }
    }

    Ok(())
}
