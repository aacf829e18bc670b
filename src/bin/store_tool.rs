use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use recordsync::storage::{StoreFile, StoreSnapshot};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "store-tool")]
#[command(about = "Developer tooling for recordsync store files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Format version, save time and row counts per entity
    Inspect {
        #[arg(long)]
        store: PathBuf,
    },
    /// Rows of one entity as JSON lines
    Dump {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        entity: String,
    },
    /// The model embedded in the store, as JSON
    Schema {
        #[arg(long)]
        store: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect { store } => inspect(&store),
        Command::Dump { store, entity } => dump(&store, &entity),
        Command::Schema { store } => schema(&store),
    }
}

fn load(path: &Path) -> Result<StoreSnapshot> {
    StoreFile::new(path)
        .load()
        .with_context(|| format!("Failed to read store '{}'", path.display()))?
        .ok_or_else(|| anyhow!("No store at '{}'", path.display()))
}

fn inspect(path: &Path) -> Result<()> {
    let snapshot = load(path)?;
    println!("Store: {}", path.display());
    println!("Format version: {}", snapshot.version);
    println!("Saved at: {}", snapshot.metadata.saved_at.to_rfc3339());
    println!(
        "Rows: {} across {} entities",
        snapshot.metadata.row_count, snapshot.metadata.entity_count
    );
    for name in snapshot.model.entity_names() {
        println!("  {}: {}", name, snapshot.store.entity_row_count(name));
    }
    Ok(())
}

fn dump(path: &Path, entity: &str) -> Result<()> {
    let snapshot = load(path)?;
    if !snapshot.model.contains(entity) {
        return Err(anyhow!(
            "Entity '{}' is not part of the store's model",
            entity
        ));
    }

    let Some(rows) = snapshot.store.rows(entity) else {
        return Ok(());
    };
    for (id, row) in rows.iter() {
        let mut object = serde_json::Map::new();
        object.insert("_id".to_string(), serde_json::Value::String(id.to_string()));
        for (key, value) in row {
            object.insert(key.clone(), value.to_json());
        }
        let line = serde_json::to_string(&object).context("Failed to encode row")?;
        println!("{}", line);
    }
    Ok(())
}

fn schema(path: &Path) -> Result<()> {
    let snapshot = load(path)?;
    let json = snapshot
        .model
        .to_json()
        .context("Failed to encode model")?;
    println!("{}", json);
    Ok(())
}
