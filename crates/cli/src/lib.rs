//! `quartermaster` command-line driver.
//!
//! Owns the store handle for the lifetime of one command and lends it to the
//! reconciler; nothing here holds process-wide state.

pub mod render;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use quartermaster_core::SystemClock;
use quartermaster_infra::{
    InventoryStore, JsonFileManifest, ManifestSource, QuartermasterConfig, Reconciler, SqliteStore,
};
use quartermaster_inventory::DuplicatePolicy;

#[derive(Debug, Parser)]
#[command(
    name = "quartermaster",
    version,
    about = "Reconcile the wagon inventory against today's manifest and keep the ledger"
)]
pub struct Cli {
    /// SQLite database path (overrides QUARTERMASTER_DB).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the database tables if they do not exist yet.
    Init,

    /// Apply a manifest to the inventory and record every change.
    Reconcile {
        /// Manifest JSON path (overrides QUARTERMASTER_MANIFEST).
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// How repeated item names are handled: `last-wins` or `reject`
        /// (overrides QUARTERMASTER_DUPLICATES).
        #[arg(long)]
        duplicates: Option<DuplicatePolicy>,

        /// Show what would change without recording anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the current inventory in insertion order.
    Report,

    /// Print every ledger entry in chronological order.
    Review,
}

/// Execute `cli`, writing console output to `out`.
pub fn run<W: Write>(cli: Cli, config: QuartermasterConfig, out: &mut W) -> anyhow::Result<()> {
    let db_path = cli.db.unwrap_or(config.db_path);

    match cli.command {
        Command::Init => {
            SqliteStore::open(&db_path)
                .with_context(|| format!("failed to initialize {}", db_path.display()))?;
            writeln!(out, "Quartermaster: Wagon database initialized.")?;
        }
        Command::Reconcile {
            manifest,
            duplicates,
            dry_run,
        } => {
            let manifest_path = manifest.unwrap_or(config.manifest_path);
            let policy = duplicates.unwrap_or(config.duplicate_policy);

            writeln!(out, "Quartermaster: Opening the wagon ledger.")?;
            writeln!(
                out,
                "Quartermaster: Consulting {} for today's manifest.",
                manifest_path.display()
            )?;
            let manifest = JsonFileManifest::new(&manifest_path).load()?;

            let mut store = open_store(&db_path)?;
            let reconciler = Reconciler::new(SystemClock).with_duplicate_policy(policy);

            if dry_run {
                let plan = reconciler.preview(&store, &manifest)?;
                for m in plan.mutations() {
                    tracing::debug!(mutation = %render::mutation_label(m), "planned");
                }
                write!(out, "{}", render::plan(&plan))?;
            } else {
                let outcome = reconciler
                    .reconcile(&mut store, &manifest)
                    .with_context(|| format!("manifest {} was not applied", manifest_path.display()))?;
                write!(out, "{}", render::outcome(&outcome))?;
            }
            write!(out, "{}", render::report(&store.report()?))?;
        }
        Command::Report => {
            let store = open_store(&db_path)?;
            write!(out, "{}", render::report(&store.report()?))?;
        }
        Command::Review => {
            let store = open_store(&db_path)?;
            write!(out, "{}", render::ledger(&store.ledger_entries()?))?;
        }
    }
    Ok(())
}

fn open_store(path: &std::path::Path) -> anyhow::Result<SqliteStore> {
    SqliteStore::open(path).with_context(|| format!("failed to open {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn run_args(args: &[&str], config: &QuartermasterConfig) -> anyhow::Result<String> {
        let cli = Cli::try_parse_from(std::iter::once("quartermaster").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        run(cli, config.clone(), &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    fn config_in(dir: &Path) -> QuartermasterConfig {
        QuartermasterConfig {
            db_path: dir.join("wagon.db"),
            manifest_path: dir.join("inventory.json"),
            duplicate_policy: DuplicatePolicy::LastWins,
        }
    }

    fn write_manifest(config: &QuartermasterConfig, json: &str) {
        std::fs::write(&config.manifest_path, json).unwrap();
    }

    #[test]
    fn init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        assert_eq!(run_args(&["init"], &config).unwrap(), "Quartermaster: Wagon database initialized.\n");
        run_args(&["init"], &config).unwrap();
        assert!(config.db_path.exists());
    }

    #[test]
    fn reconcile_then_review_shows_the_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        write_manifest(
            &config,
            r#"[{"item": "rope", "quantity": 10, "description": "sturdy"},
                {"item": "torch", "quantity": 5, "description": "bright"}]"#,
        );
        let first = run_args(&["reconcile"], &config).unwrap();
        assert!(first.contains("Quartermaster: add 'rope' (+10): New supply secured.\n"));
        assert!(first.contains("Quartermaster: torch | 5 | bright\n"));

        write_manifest(&config, r#"[{"item": "rope", "quantity": 7, "description": "sturdy"}]"#);
        let second = run_args(&["reconcile"], &config).unwrap();
        assert!(second.contains("remove 'torch' (-5): Removed from service."));
        assert!(second.contains("update 'rope' (-3): Quantity 10->7"));

        let third = run_args(&["reconcile"], &config).unwrap();
        assert!(third.contains("Inventory already matches the manifest."));

        let review = run_args(&["review"], &config).unwrap();
        let rows: Vec<_> = review.lines().filter(|l| l.contains(" | ") && !l.contains("Qty Change")).collect();
        assert_eq!(rows.len(), 4);
        assert!(rows[3].ends_with("| update | rope | -3 | Quantity 10->7"));
    }

    #[test]
    fn dry_run_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        write_manifest(&config, r#"[{"item": "rope", "quantity": 10, "description": "sturdy"}]"#);

        let text = run_args(&["reconcile", "--dry-run"], &config).unwrap();
        assert!(text.contains("would add 'rope' (+10)"));

        let review = run_args(&["review"], &config).unwrap();
        assert!(review.contains("Ledger is currently empty."));
    }

    #[test]
    fn flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let other_manifest = dir.path().join("other.json");
        let other_db = dir.path().join("other.db");
        std::fs::write(
            &other_manifest,
            r#"[{"item": "axe", "quantity": 1, "description": "sharp"},
                {"item": "axe", "quantity": 2, "description": "sharper"}]"#,
        )
        .unwrap();

        let err = run_args(
            &[
                "reconcile",
                "--db",
                other_db.to_str().unwrap(),
                "--manifest",
                other_manifest.to_str().unwrap(),
                "--duplicates",
                "reject",
            ],
            &config,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("'axe' more than once"));

        let report = run_args(&["--db", other_db.to_str().unwrap(), "report"], &config).unwrap();
        assert!(!report.contains("axe"));
        assert!(!config.db_path.exists());
    }

    #[test]
    fn unreadable_manifest_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let err = run_args(&["reconcile"], &config).unwrap_err();
        assert!(format!("{err:#}").contains("manifest unreadable"));
        assert!(!config.db_path.exists());
    }
}
