//! xw-creds - Credential management tool for xwrite
//!
//! Stores the four X API secrets in the OS keyring (or age-encrypted files),
//! either typed in by hand or imported from a `KEY=VALUE` file.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libxwrite::credentials::{CredentialManager, CredentialSet, Slot};
use libxwrite::service::setup::{ImportChoice, SetupReport, SetupService, Verification};
use libxwrite::{Config, FileStateStore, XWriteError};
use tracing::debug;
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(name = "xw-creds")]
#[command(about = "Manage xwrite X API credentials securely", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up credentials interactively
    Setup {
        /// Import from a KEY=VALUE file instead of prompting
        #[arg(long, value_name = "FILE")]
        import: Option<PathBuf>,
    },

    /// Import credentials from a KEY=VALUE file (.env, shell exports, notes)
    Import {
        file: PathBuf,
    },

    /// Show which credentials are stored (without showing values)
    Show,

    /// Delete all stored credentials
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Stores opened from configuration
struct Stores {
    credentials: CredentialManager,
    state: FileStateStore,
}

impl Stores {
    fn open() -> Result<Self> {
        let config = Config::load()?;

        let mut cred_config = config.credential_config();
        cred_config.load_master_password_from_env();

        Ok(Self {
            credentials: CredentialManager::new(cred_config)?,
            state: FileStateStore::open(config.state_path())?,
        })
    }

    fn setup(&self) -> SetupService<'_> {
        SetupService::new(&self.credentials, &self.state)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    libxwrite::logging::init_default(cli.verbose);

    if let Err(e) = run_command(cli.command).await {
        debug!("Command failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<XWriteError>()
        .map_or(1, XWriteError::exit_code)
}

async fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Setup { import } => setup_credentials(import.as_deref()).await,
        Commands::Import { file } => import_credentials(&file).await,
        Commands::Show => show_credentials(),
        Commands::Reset { force } => reset_credentials(force),
    }
}

async fn setup_credentials(import: Option<&Path>) -> Result<()> {
    if let Some(path) = import {
        return import_credentials(path).await;
    }

    if !atty::is(atty::Stream::Stdin) {
        anyhow::bail!(
            "Not a TTY. Use 'xw-creds setup --import FILE' or 'xw-creds import FILE' instead."
        );
    }

    println!("\nxwrite credential setup");
    println!("Choose an option:");
    println!("  1. Import from a file (.env, .txt)");
    println!("  2. Enter credentials manually");
    print!("\nChoice [1-2]: ");
    io::stdout().flush()?;

    match ImportChoice::from_answer(&read_line()?) {
        ImportChoice::UseImport => {
            print!("Path to credentials file: ");
            io::stdout().flush()?;
            let answer = read_line()?;
            let path = answer.trim();
            if path.is_empty() {
                println!("Cancelled");
                return Ok(());
            }
            import_credentials(Path::new(path)).await
        }
        ImportChoice::UseManual => {
            let Some(set) = prompt_credential_set()? else {
                println!("Cancelled");
                return Ok(());
            };
            let stores = Stores::open()?;
            let report = stores.setup().save_and_verify(&set).await?;
            print_report(&report);
            Ok(())
        }
        ImportChoice::Cancel => {
            println!("Cancelled");
            Ok(())
        }
    }
}

/// Prompt for each secret in turn; any empty answer abandons the whole set
fn prompt_credential_set() -> Result<Option<CredentialSet>> {
    let mut values: Vec<Zeroizing<String>> = Vec::with_capacity(Slot::ALL.len());

    for slot in Slot::ALL {
        let value = Zeroizing::new(
            rpassword::prompt_password(format!("{}: ", slot.label()))
                .context("Failed to read credential")?,
        );
        if value.trim().is_empty() {
            return Ok(None);
        }
        values.push(value);
    }

    Ok(Some(CredentialSet::new(
        values[0].trim(),
        values[1].trim(),
        values[2].trim(),
        values[3].trim(),
    )))
}

async fn import_credentials(path: &Path) -> Result<()> {
    let stores = Stores::open()?;
    let report = stores.setup().import_file(path).await?;

    println!("✓ Imported credentials from {}", path.display());
    print_report(&report);
    Ok(())
}

fn print_report(report: &SetupReport) {
    println!("✓ Credentials stored in {}", report.backend);

    match &report.verification {
        Verification::Confirmed { username } => {
            println!("✓ Verified: authenticated as @{}", username);
        }
        Verification::Failed { reason } => {
            println!("⚠ Credentials saved but verification failed: {}", reason);
        }
        Verification::Skipped => {
            println!("  Credentials will be checked on the next post");
        }
    }
}

fn show_credentials() -> Result<()> {
    let stores = Stores::open()?;

    println!("Stored credentials:");
    for (slot, present) in stores.credentials.status()? {
        let marker = if present { "✓" } else { "✗" };
        println!("  {} {} ({})", marker, slot.label(), slot.field_name());
    }

    if let Some(backend) = stores.credentials.primary_backend() {
        println!("\nStorage backend: {}", backend);
    }

    match stores.setup().cached_username()? {
        Some(username) => println!("Account: @{}", username),
        None => println!("Account: not verified yet"),
    }

    Ok(())
}

fn reset_credentials(force: bool) -> Result<()> {
    if !force {
        if !atty::is(atty::Stream::Stdin) {
            anyhow::bail!(
                "Refusing to delete credentials without confirmation in non-interactive mode. \
                 Use 'xw-creds reset --force'."
            );
        }

        print!("Delete all stored X credentials? [y/N]: ");
        io::stdout().flush()?;

        if !read_line()?.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled");
            return Ok(());
        }
    }

    let stores = Stores::open()?;
    stores.setup().reset()?;

    println!("✓ Deleted all stored credentials");
    Ok(())
}

fn read_line() -> Result<String> {
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input)
}
