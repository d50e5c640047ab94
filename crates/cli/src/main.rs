//! Certificate Registry Command Line Interface
//!
//! Operates a registry stored in a local sled database. Every command prints
//! its result as JSON on stdout; logs go to stderr.

use anyhow::{Context, Result};
use certreg_registry::{
    Certificate, CertificateId, CertificateRegistry, EventRecord, Issuer, Principal,
    RegistryError, SledStore, SystemClock, Timestamp, Verification,
};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use crate::config::{CliConfig, LogFormat};

type Registry = CertificateRegistry<SledStore, SystemClock>;

#[derive(Parser)]
#[command(name = "certreg")]
#[command(about = "Certificate Registry Command Line Interface", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Registry data directory (overrides configuration)
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Principal the command is executed as (hex, 32 bytes)
    #[arg(long = "as", value_name = "PRINCIPAL", global = true)]
    caller: Option<Principal>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new registry with its first administrator
    Init {
        /// Initial administrator
        #[arg(long)]
        admin: Principal,
    },
    /// Administrator management
    Admin {
        #[command(subcommand)]
        action: AdminCommands,
    },
    /// Issuer management
    Issuer {
        #[command(subcommand)]
        action: IssuerCommands,
    },
    /// Issue a certificate as the calling issuer
    Issue(IssueCommand),
    /// Revoke a certificate as its issuing authority
    Revoke {
        /// Certificate identifier
        id: CertificateId,
    },
    /// Verify a certificate
    Verify {
        /// Certificate identifier
        id: CertificateId,
        /// Evaluate at this unix timestamp instead of now
        #[arg(long)]
        at: Option<Timestamp>,
    },
    /// List certificate identifiers in issuance order
    List {
        #[command(subcommand)]
        action: ListCommands,
    },
    /// Registry counters
    Stats,
    /// Print the event journal
    Events {
        /// First sequence number to print
        #[arg(long, default_value_t = 0)]
        since: u64,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Grant administrator rights
    Grant { principal: Principal },
    /// Revoke administrator rights
    Revoke { principal: Principal },
    /// List administrators
    List,
}

#[derive(Subcommand)]
enum IssuerCommands {
    /// Register a new issuer
    Register {
        /// Issuing authority
        authority: Principal,
        /// Display name
        name: String,
        /// Free-form description
        #[arg(long, default_value = "")]
        details: String,
    },
    /// Activate or deactivate an issuer
    Status {
        authority: Principal,
        #[arg(long, action = ArgAction::Set)]
        active: bool,
    },
    /// Show issuer details
    Info { authority: Principal },
}

#[derive(Args)]
struct IssueCommand {
    /// Certificate recipient
    recipient: Principal,
    /// Explicit certificate identifier
    #[arg(long, conflicts_with = "content_file", required_unless_present = "content_file")]
    id: Option<CertificateId>,
    /// Derive the identifier from the SHA-256 of this file
    #[arg(long, value_name = "PATH")]
    content_file: Option<PathBuf>,
    /// Expiry as unix seconds, 0 for none
    #[arg(long, default_value_t = 0)]
    expiry: Timestamp,
    /// Off-registry metadata location
    #[arg(long, default_value = "")]
    metadata_uri: String,
}

#[derive(Subcommand)]
enum ListCommands {
    /// Certificates issued by an issuer
    Issuer { principal: Principal },
    /// Certificates held by a recipient
    Recipient { principal: Principal },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let report = match err.downcast_ref::<RegistryError>() {
                Some(registry_err) => json!({
                    "error": registry_err.kind(),
                    "message": registry_err.to_string(),
                }),
                None => json!({ "error": "cli", "message": format!("{err:#}") }),
            };
            eprintln!("{report}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    init_logging(&config)?;
    debug!("Data directory: {}", config.data_dir.display());

    let caller = cli.caller;
    let output = match cli.command {
        Commands::Init { admin } => {
            let store = open_store(&config.data_dir)?;
            let registry =
                CertificateRegistry::genesis(admin, store, SystemClock, config.registry.clone())?;
            registry.store().flush()?;
            info!("Initialized registry at {}", config.data_dir.display());
            json!({ "initialized": true, "admin": admin })
        }
        Commands::Admin { action } => {
            let mut registry = open_registry(&config)?;
            let output = handle_admin_commands(&mut registry, action, caller)?;
            registry.store().flush()?;
            output
        }
        Commands::Issuer { action } => {
            let mut registry = open_registry(&config)?;
            let output = handle_issuer_commands(&mut registry, action, caller)?;
            registry.store().flush()?;
            output
        }
        Commands::Issue(cmd) => {
            let mut registry = open_registry(&config)?;
            let output = handle_issue_command(&mut registry, cmd, caller)?;
            registry.store().flush()?;
            output
        }
        Commands::Revoke { id } => {
            let mut registry = open_registry(&config)?;
            let certificate = registry.revoke_certificate(&require_caller(caller)?, &id)?;
            registry.store().flush()?;
            certificate_json(&certificate)
        }
        Commands::Verify { id, at } => {
            let registry = open_registry(&config)?;
            let verification = match at {
                Some(at) => registry.verify_certificate_at(&id, at)?,
                None => registry.verify_certificate(&id)?,
            };
            verification_json(&id, &verification)
        }
        Commands::List { action } => {
            let registry = open_registry(&config)?;
            let ids = match action {
                ListCommands::Issuer { principal } => {
                    registry.get_certificates_by_issuer(&principal)?
                }
                ListCommands::Recipient { principal } => {
                    registry.get_certificates_by_recipient(&principal)?
                }
            };
            json!({ "count": ids.len(), "certificates": ids })
        }
        Commands::Stats => {
            let registry = open_registry(&config)?;
            json!({
                "total_certificates": registry.get_total_certificates()?,
                "total_issuers": registry.get_total_issuers()?,
                "admins": registry.admins()?.len(),
            })
        }
        Commands::Events { since } => {
            let registry = open_registry(&config)?;
            let events: Vec<EventRecord> = registry.events_since(since)?;
            serde_json::to_value(events)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_logging(config: &CliConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == LogFormat::Compact {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}

fn open_store(data_dir: &Path) -> Result<SledStore> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;
    SledStore::new(data_dir)
        .with_context(|| format!("failed to open registry database at {}", data_dir.display()))
}

fn open_registry(config: &CliConfig) -> Result<Registry> {
    let store = open_store(&config.data_dir)?;
    Ok(CertificateRegistry::open(
        store,
        SystemClock,
        config.registry.clone(),
    )?)
}

fn require_caller(caller: Option<Principal>) -> Result<Principal> {
    caller.context("this command requires --as <PRINCIPAL>")
}

fn handle_admin_commands(
    registry: &mut Registry,
    cmd: AdminCommands,
    caller: Option<Principal>,
) -> Result<Value> {
    let output = match cmd {
        AdminCommands::Grant { principal } => {
            registry.grant_admin(&require_caller(caller)?, principal)?;
            json!({ "admin": principal, "granted": true })
        }
        AdminCommands::Revoke { principal } => {
            registry.revoke_admin(&require_caller(caller)?, principal)?;
            json!({ "admin": principal, "granted": false })
        }
        AdminCommands::List => json!({ "admins": registry.admins()? }),
    };
    Ok(output)
}

fn handle_issuer_commands(
    registry: &mut Registry,
    cmd: IssuerCommands,
    caller: Option<Principal>,
) -> Result<Value> {
    let issuer = match cmd {
        IssuerCommands::Register {
            authority,
            name,
            details,
        } => registry.register_issuer(&require_caller(caller)?, authority, name, details)?,
        IssuerCommands::Status { authority, active } => {
            registry.update_issuer_status(&require_caller(caller)?, &authority, active)?
        }
        IssuerCommands::Info { authority } => registry.get_issuer_info(&authority)?,
    };
    Ok(issuer_json(&issuer))
}

fn handle_issue_command(
    registry: &mut Registry,
    cmd: IssueCommand,
    caller: Option<Principal>,
) -> Result<Value> {
    let caller = require_caller(caller)?;
    let id = match (cmd.id, cmd.content_file) {
        (Some(id), _) => id,
        (None, Some(path)) => {
            let content = fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            CertificateId::from_content(&content)
        }
        (None, None) => anyhow::bail!("either --id or --content-file is required"),
    };

    let certificate =
        registry.issue_certificate(&caller, id, cmd.recipient, cmd.expiry, cmd.metadata_uri)?;
    Ok(certificate_json(&certificate))
}

/// Render a unix timestamp as RFC 3339, `null` when it is `0` or out of range.
fn render_date(ts: Timestamp) -> Value {
    if ts == 0 {
        return Value::Null;
    }
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| Value::String(dt.to_rfc3339()))
        .unwrap_or(Value::Null)
}

fn issuer_json(issuer: &Issuer) -> Value {
    json!({
        "authority": issuer.authority,
        "name": issuer.name,
        "details": issuer.details,
        "active": issuer.is_active(),
        "registration_date": issuer.registration_date,
        "registered_at": render_date(issuer.registration_date),
        "total_issued": issuer.total_issued,
    })
}

fn certificate_json(certificate: &Certificate) -> Value {
    let expiry = certificate.expiry.as_unix();
    json!({
        "id": certificate.id,
        "issuer": certificate.issuer,
        "recipient": certificate.recipient,
        "issue_date": certificate.issue_date,
        "issued_at": render_date(certificate.issue_date),
        "expiry_date": expiry,
        "expires_at": render_date(expiry),
        "revoked": certificate.is_revoked(),
        "metadata_uri": certificate.metadata_uri,
    })
}

fn verification_json(id: &CertificateId, verification: &Verification) -> Value {
    json!({
        "id": id,
        "is_valid": verification.is_valid,
        "issuer": verification.issuer,
        "recipient": verification.recipient,
        "issue_date": verification.issue_date,
        "issued_at": render_date(verification.issue_date),
        "expiry_date": verification.expiry_date,
        "expires_at": render_date(verification.expiry_date),
        "revoked": verification.revoked,
        "metadata_uri": verification.metadata_uri,
    })
}
