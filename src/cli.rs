use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use receiptsync::config::SyncConfig;
use receiptsync::integrity::{
    AlertStore, ChecksumService, IntegrityAuditor, JsonIndexReader, LocalAuditFileSystem,
    verify_detailed,
};
use receiptsync::sync::{BackfillUploader, ConfigNetworkPolicy, FsRemoteStorage, JsonReceiptStore};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "receiptsync", about = "Receipt archive integrity and sync tool")]
pub struct Cli {
    /// Path to a config file. Defaults to the platform config directory.
    #[arg(long, global = true, env = "RECEIPTSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the SHA-256 of a file
    Checksum {
        /// File to hash
        file: PathBuf,
    },
    /// Check a file against an expected SHA-256
    Verify {
        /// File to check
        file: PathBuf,

        /// Expected digest (64 hex characters)
        digest: String,
    },
    /// Audit one day folder and store its alerts for review
    Audit {
        /// Day folder relative to the local root, e.g. Receipts/Canada/2025/2025-06/2025-06-14
        folder: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List stored alerts
    Alerts {
        /// Include dismissed and quarantined alerts
        #[arg(long)]
        all: bool,
    },
    /// Dismiss a stored alert
    Dismiss {
        /// Alert id
        id: String,
    },
    /// Move the file behind a stored alert into quarantine
    Quarantine {
        /// Alert id
        id: String,
    },
    /// Upload unsynced receipts to remote storage
    Backfill {
        /// Only report how many receipts and bytes are pending
        #[arg(long)]
        stats_only: bool,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => SyncConfig::load_from(path)?,
        None => SyncConfig::load()?,
    };

    match cli.command {
        Commands::Checksum { file } => handle_checksum(&config, file).await,
        Commands::Verify { file, digest } => handle_verify(&config, file, &digest).await,
        Commands::Audit { folder, json } => handle_audit(&config, &folder, json).await,
        Commands::Alerts { all } => handle_alerts(&config, all),
        Commands::Dismiss { id } => handle_dismiss(&config, &id),
        Commands::Quarantine { id } => handle_quarantine(&config, &id).await,
        Commands::Backfill { stats_only } => handle_backfill(&config, stats_only).await,
    }
}

fn checksums(config: &SyncConfig) -> ChecksumService {
    ChecksumService::new(config.hash_chunk_size)
}

fn auditor(config: &SyncConfig) -> Result<IntegrityAuditor> {
    let fs = LocalAuditFileSystem::new(
        &config.local_root,
        &config.quarantine_dir_name,
        checksums(config),
    );
    let reader = JsonIndexReader::new(&config.local_root, &config.index_filename);

    Ok(
        IntegrityAuditor::new(Arc::new(fs), Arc::new(reader), &config.index_filename)
            .with_quarantine_log(&config.quarantine_log_path)?,
    )
}

async fn handle_checksum(config: &SyncConfig, file: PathBuf) -> Result<()> {
    let digest = checksums(config).compute_file_checksum(&file).await?;
    println!("{digest}  {}", file.display());
    Ok(())
}

async fn handle_verify(config: &SyncConfig, file: PathBuf, digest: &str) -> Result<()> {
    let result = verify_detailed(&checksums(config), &file, digest).await?;
    println!("{}", result.format_cli());
    if !result.passed {
        bail!("Verification failed for {}", file.display());
    }
    Ok(())
}

async fn handle_audit(config: &SyncConfig, folder: &str, json: bool) -> Result<()> {
    let report = auditor(config)?.audit_day_folder(folder).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else if report.is_clean() {
        println!("{folder}: {} files scanned, no issues", report.files_scanned);
    } else {
        println!(
            "{folder}: {} files scanned, {} alerts",
            report.files_scanned,
            report.alerts.len()
        );
        for alert in &report.alerts {
            println!("  [{}] {} {}", alert.alert_type, alert.id, alert.path);
            println!("      {}", alert.description);
            println!("      -> {}", alert.recommended_action);
        }
    }

    let mut store = AlertStore::load(&config.alert_store_path)?;
    store.record(report);
    store.save()?;
    Ok(())
}

fn handle_alerts(config: &SyncConfig, all: bool) -> Result<()> {
    let store = AlertStore::load(&config.alert_store_path)?;
    let mut shown = 0_usize;

    for alert in store.alerts().filter(|a| all || a.is_open()) {
        let state = if alert.quarantined {
            " (quarantined)"
        } else if alert.dismissed {
            " (dismissed)"
        } else {
            ""
        };
        println!(
            "{} [{}] {}{state}\n    {}",
            alert.id, alert.alert_type, alert.path, alert.description
        );
        shown += 1;
    }

    if shown == 0 {
        println!("No alerts");
    }
    Ok(())
}

fn handle_dismiss(config: &SyncConfig, id: &str) -> Result<()> {
    let mut store = AlertStore::load(&config.alert_store_path)?;
    store.dismiss(id)?;
    store.save()?;
    println!("Dismissed {id}");
    Ok(())
}

async fn handle_quarantine(config: &SyncConfig, id: &str) -> Result<()> {
    let mut store = AlertStore::load(&config.alert_store_path)?;
    let alert = store
        .get(id)
        .cloned()
        .with_context(|| format!("No alert with id {id}"))?;

    let entry = auditor(config)?.quarantine(&alert).await?;
    store.mark_quarantined(id)?;
    store.save()?;

    println!(
        "Quarantined {} -> {}",
        entry.source_path, entry.destination_path
    );
    Ok(())
}

async fn handle_backfill(config: &SyncConfig, stats_only: bool) -> Result<()> {
    let store = JsonReceiptStore::open(&config.store_path).await?;
    let remote = FsRemoteStorage::new(&config.remote_root, &config.index_filename);
    let policy =
        ConfigNetworkPolicy::new(config.sync_enabled).with_remote_root(&config.remote_root);

    let uploader = BackfillUploader::new(
        Arc::new(store),
        Arc::new(remote),
        Arc::new(policy),
        config.backfill_options(),
    );

    if stats_only {
        let stats = uploader.calculate_stats().await?;
        println!(
            "{} receipts pending, {} bytes",
            stats.receipt_count, stats.total_size_bytes
        );
        return Ok(());
    }

    let stats = uploader.try_run().await?;
    println!("{stats}");
    if stats.error_count > 0 {
        bail!("{} receipts failed to sync", stats.error_count);
    }
    Ok(())
}
