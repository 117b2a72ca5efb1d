mod prompt;
mod render;
mod shell;

use anyhow::Context;
use clap::{Parser, Subcommand};
use his_core::config::{care_location_from_env_value, data_dir_from_env_value};
use his_core::seed::{self, DEFAULT_SEED_PASSWORD};
use his_core::{Author, CoreConfig, HisServices, Store};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "his")]
#[command(about = "Hospital information system administration")]
struct Cli {
    /// Directory of the record store
    #[arg(long, env = "HIS_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,
    /// Use a throwaway store holding the demo data, deleted on exit
    #[arg(long, global = true)]
    mem: bool,
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialise the record store
    Init,
    /// Initialise the store and load the demo hospital
    Seed {
        /// Password of every demo account
        #[arg(long, default_value = DEFAULT_SEED_PASSWORD)]
        password: String,
    },
    /// Create a superuser; the password is read from stdin
    UseraddAdmin {
        username: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Print the most recent commits
    Log {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Interactive shell (default)
    Shell,
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))?,
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
    Ok(())
}

fn open_store(data_dir: PathBuf) -> anyhow::Result<Arc<Store>> {
    let care_location = care_location_from_env_value(std::env::var("HIS_CARE_LOCATION").ok())?;
    let cfg = CoreConfig::new(data_dir, care_location)?;
    let store = Store::open_or_initialise(Arc::new(cfg))
        .context("failed to open the record store")?;
    Ok(Arc::new(store))
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    // Held until the end of main so the throwaway store outlives every command.
    let scratch = if cli.mem {
        Some(tempfile::TempDir::new()?)
    } else {
        None
    };
    let data_dir = match &scratch {
        Some(dir) => dir.path().join("data"),
        None => cli
            .data_dir
            .unwrap_or_else(|| data_dir_from_env_value(None)),
    };
    let store = open_store(data_dir)?;
    if scratch.is_some() {
        seed::populate(&store, DEFAULT_SEED_PASSWORD)?;
        println!("Using a throwaway store with the demo data (password: {DEFAULT_SEED_PASSWORD}).");
    }

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Init => {
            println!("Record store ready at {}", store.config().data_dir().display());
        }
        Commands::Seed { password } => {
            seed::populate(&store, &password)?;
            println!("Loaded the demo hospital into {}", store.config().data_dir().display());
        }
        Commands::UseraddAdmin { username, email } => {
            let mut password = String::new();
            io::stdin().lock().read_line(&mut password)?;
            let password = password.trim_end_matches(['\r', '\n']);
            let account = HisServices::new(store).accounts.create_superuser(
                &Author::system()?,
                &username,
                email.as_deref(),
                password,
            )?;
            println!("Created superuser {} ({})", account.username, account.id);
        }
        Commands::Log { limit } => {
            for entry in store.audit_log(limit)? {
                println!(
                    "{}  {}  {}  {}",
                    &entry.commit_id[..entry.commit_id.len().min(8)],
                    entry.committed_at.format("%Y-%m-%d %H:%M"),
                    entry.author_username.as_deref().unwrap_or(&entry.author_name),
                    entry.subject
                );
            }
        }
        Commands::Shell => {
            if store.is_empty() {
                anyhow::bail!(
                    "the record store has no accounts; run `his seed` or `his useradd-admin` first"
                );
            }
            let stdin = io::stdin();
            let mut shell = shell::Shell::new(HisServices::new(store), stdin.lock(), io::stdout());
            shell.run()?;
        }
    }

    Ok(())
}
