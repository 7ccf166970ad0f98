use std::error::Error;

use clap::{Parser, Subcommand};
use engine::{
    ConsistencyReport, Ledger, LedgerResult,
    store::{DbStore, MemoryStore},
};
use migration::{Migrator, MigratorTrait};

mod settings;

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Consistency tooling for the tally ledger")]
struct Cli {
    /// Settings file (TOML, extension omitted).
    #[arg(long, default_value = "settings")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare stored balances and budget totals against a replay of the
    /// transaction log. Exits non-zero when drift is found.
    Check {
        #[arg(long)]
        owner: String,
    },
    /// Repair drifted balances and budget totals in one atomic unit.
    Recompute {
        #[arg(long)]
        owner: String,
    },
}

/// Backend picked once at startup from the settings file.
enum Backend {
    Memory(Ledger<MemoryStore>),
    Database(Ledger<DbStore>),
}

impl Backend {
    async fn check(&self, owner: &str) -> LedgerResult<ConsistencyReport> {
        match self {
            Self::Memory(ledger) => ledger.check_consistency(owner).await,
            Self::Database(ledger) => ledger.check_consistency(owner).await,
        }
    }

    async fn recompute(&self, owner: &str) -> LedgerResult<ConsistencyReport> {
        match self {
            Self::Memory(ledger) => ledger.recompute_aggregates(owner).await,
            Self::Database(ledger) => ledger.recompute_aggregates(owner).await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "tally={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let backend = open_backend(&settings.storage).await?;

    match cli.command {
        Command::Check { owner } => {
            let report = backend.check(&owner).await?;
            print_report(&report);
            if !report.is_consistent() {
                std::process::exit(1);
            }
        }
        Command::Recompute { owner } => {
            let report = backend.recompute(&owner).await?;
            if report.is_consistent() {
                println!("nothing to repair");
            } else {
                println!(
                    "repaired {} account(s), {} budget(s)",
                    report.accounts.len(),
                    report.budgets.len()
                );
            }
        }
    }

    Ok(())
}

async fn open_backend(
    storage: &settings::Storage,
) -> Result<Backend, Box<dyn Error + Send + Sync>> {
    match storage.kind {
        settings::StorageKind::Memory => {
            let store = match &storage.path {
                Some(path) => MemoryStore::open(path)?,
                None => MemoryStore::new(),
            };
            Ok(Backend::Memory(Ledger::new(store)))
        }
        settings::StorageKind::Sqlite => {
            let path = storage.path.as_deref().unwrap_or("./tally.db");
            let url = format!("sqlite:{path}?mode=rwc");
            let db = sea_orm::Database::connect(url).await?;
            Migrator::up(&db, None).await?;
            Ok(Backend::Database(Ledger::new(DbStore::new(db))))
        }
    }
}

fn print_report(report: &ConsistencyReport) {
    if report.is_consistent() {
        println!("consistent");
        return;
    }
    for drift in &report.accounts {
        println!(
            "account {}: stored {} expected {}",
            drift.account_id, drift.stored_minor, drift.expected_minor
        );
    }
    for drift in &report.budgets {
        println!(
            "budget {} ({}): stored {} expected {}",
            drift.budget_id, drift.month, drift.stored_minor, drift.expected_minor
        );
    }
}
