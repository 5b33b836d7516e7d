use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::UtrServer;
use crate::application::UtrService;
use crate::config::{Settings, LOG_ENV_VAR};
use crate::domain::{format_cents, NewAccount, UtrScope};
use crate::gledger::HttpGLedger;

/// UTR entry service
#[derive(Parser)]
#[command(name = "utr-entry")]
#[command(about = "UTR (bank-to-mill transfer) entries with general-ledger synchronization")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ./utr.toml or any other supported extension, if present)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Database URL, e.g. "sqlite:utr.db?mode=rwc" (overrides the config file)
    #[arg(short, long)]
    pub database: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database schema
    Init,

    /// Run the HTTP API
    Serve {
        /// Address to listen on (overrides the config file)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Account master management
    #[command(subcommand)]
    Account(AccountCommands),

    /// Print a UTR entry as JSON
    Show {
        /// Document number
        doc_no: i64,

        /// Company code
        #[arg(long)]
        company: String,

        /// Year code
        #[arg(long)]
        year: String,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Register an account (or rename an existing code)
    Add {
        /// Account code
        code: String,

        /// Company code
        #[arg(long)]
        company: String,

        /// Display name
        #[arg(long)]
        name: String,
    },

    /// List accounts
    List {
        /// Only this company
        #[arg(long)]
        company: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        init_tracing(self.verbose);

        let mut settings = Settings::load(self.config.as_deref()).context("Failed to load configuration")?;
        if let Some(database) = &self.database {
            settings.database_url = database.clone();
        }

        let service = open_service(&settings).await?;

        match self.command {
            Commands::Init => {
                println!("Database initialized: {}", settings.database_url);
            }

            Commands::Serve { bind } => {
                if let Some(bind) = bind {
                    settings.server.bind_addr = bind;
                }
                UtrServer::new(settings.server, service).serve().await?;
            }

            Commands::Account(account_cmd) => {
                run_account_command(&service, account_cmd).await?;
            }

            Commands::Show {
                doc_no,
                company,
                year,
            } => {
                let record = service
                    .get_by_doc_no(&UtrScope::new(company, year), doc_no)
                    .await?;
                eprintln!(
                    "UTR #{} {} -> {} ({})",
                    record.head.doc_no,
                    record.head.bank_ac,
                    record.head.mill_code,
                    format_cents(record.head.amount)
                );
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
        }

        Ok(())
    }
}

async fn open_service(settings: &Settings) -> Result<UtrService> {
    let gledger = HttpGLedger::new(settings.gledger.clone()).context("Invalid gLedger settings")?;
    let service = UtrService::init(&settings.database_url, Arc::new(gledger))
        .await
        .with_context(|| format!("Failed to open database {}", settings.database_url))?;
    Ok(service)
}

async fn run_account_command(service: &UtrService, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Add {
            code,
            company,
            name,
        } => {
            let account = service
                .register_account(NewAccount::new(code, company, name))
                .await?;
            println!(
                "Account saved: {} / {} (accoid {})",
                account.ac_code, account.company_code, account.accoid
            );
        }

        AccountCommands::List { company } => {
            let accounts = service.list_accounts(company.as_deref()).await?;
            if accounts.is_empty() {
                println!("No accounts found.");
                return Ok(());
            }

            println!("{:<8} {:<10} {:<10} NAME", "ACCOID", "COMPANY", "CODE");
            println!("{}", "-".repeat(50));
            for account in accounts {
                println!(
                    "{:<8} {:<10} {:<10} {}",
                    account.accoid, account.company_code, account.ac_code, account.name
                );
            }
        }
    }
    Ok(())
}

/// Install the global subscriber. `UTR_LOG` takes precedence over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
