use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use loralist::{children_of, format_weight, layout, Entry, EntryId, EntryList};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "loralist-cli")]
#[command(about = "LoRA entry-list editor - headless operations on persisted documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new document seeded with one default LoRA row
    New {
        /// Document file path
        file: PathBuf,
    },

    /// Append a top-level LoRA row
    AddLora {
        file: PathBuf,

        /// LoRA file name to reference
        #[arg(long)]
        lora: Option<String>,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Weight, clamped to [-10, 10]
        #[arg(long)]
        weight: Option<f64>,

        /// Folder id to nest the new row into
        #[arg(long)]
        folder: Option<String>,
    },

    /// Append a top-level folder
    AddFolder {
        file: PathBuf,

        /// Folder name
        name: String,
    },

    /// Remove an entry (refused for non-empty folders)
    Remove {
        file: PathBuf,
        id: String,
    },

    /// Move an entry next to a target; dropping a LoRA on a folder nests it
    Move {
        file: PathBuf,
        source: String,
        target: String,
    },

    /// Set a LoRA row's weight
    SetWeight {
        file: PathBuf,
        id: String,
        weight: f64,
    },

    /// Enable a LoRA row
    Enable {
        file: PathBuf,
        id: String,
    },

    /// Disable a LoRA row
    Disable {
        file: PathBuf,
        id: String,
    },

    /// Rename an entry (display name for LoRA rows, name for folders)
    Rename {
        file: PathBuf,
        id: String,
        name: String,
    },

    /// Pull a LoRA row out of its folder to top level
    Eject {
        file: PathBuf,
        id: String,
    },

    /// Collapse or expand a folder
    ToggleFolder {
        file: PathBuf,
        id: String,
    },

    /// Print the document as the rendered tree
    Show {
        file: PathBuf,
    },

    /// Check a document for consistency problems
    Validate {
        file: PathBuf,
    },

    /// List available LoRA files
    Loras {
        /// Directory to scan (defaults to the platform data dir)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Case-insensitive substring filter
        #[arg(long)]
        filter: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Commands::New { file } => new_command(&file),
        Commands::AddLora {
            file,
            lora,
            name,
            weight,
            folder,
        } => add_lora_command(&file, lora, name, weight, folder),
        Commands::AddFolder { file, name } => add_folder_command(&file, name),
        Commands::Remove { file, id } => remove_command(&file, id),
        Commands::Move {
            file,
            source,
            target,
        } => move_command(&file, source, target),
        Commands::SetWeight { file, id, weight } => set_weight_command(&file, id, weight),
        Commands::Enable { file, id } => set_enabled_command(&file, id, true),
        Commands::Disable { file, id } => set_enabled_command(&file, id, false),
        Commands::Rename { file, id, name } => rename_command(&file, id, name),
        Commands::Eject { file, id } => eject_command(&file, id),
        Commands::ToggleFolder { file, id } => toggle_folder_command(&file, id),
        Commands::Show { file } => show_command(&file),
        Commands::Validate { file } => validate_command(&file),
        Commands::Loras { dir, filter } => loras_command(dir, filter),
    }
}

fn load(file: &Path) -> Result<EntryList> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read document: {}", file.display()))?;
    Ok(EntryList::parse_json(&json)?)
}

fn save(file: &Path, list: &EntryList) -> Result<()> {
    std::fs::write(file, list.to_json()?)
        .with_context(|| format!("failed to write document: {}", file.display()))?;
    Ok(())
}

fn require(list: &EntryList, id: &str) -> Result<EntryId> {
    let id = EntryId::from(id);
    if list.get(&id).is_none() {
        bail!("no entry with id {id}");
    }
    Ok(id)
}

fn new_command(file: &Path) -> Result<()> {
    if file.exists() {
        bail!("refusing to overwrite existing document: {}", file.display());
    }
    let list = EntryList::default();
    save(file, &list)?;
    info!("Created document with {} entry: {}", list.len(), file.display());
    Ok(())
}

fn add_lora_command(
    file: &Path,
    lora: Option<String>,
    name: Option<String>,
    weight: Option<f64>,
    folder: Option<String>,
) -> Result<()> {
    let mut list = load(file)?;
    let id = list.add_lora();
    if let Some(lora) = lora {
        list.set_lora_name(&id, lora);
    }
    if let Some(name) = name {
        list.set_display_name(&id, name);
    }
    if let Some(weight) = weight {
        list.set_weight(&id, weight);
    }
    if let Some(folder) = folder {
        let folder_id = require(&list, &folder)?;
        if !list.get(&folder_id).is_some_and(Entry::is_folder) {
            bail!("{folder_id} is not a folder");
        }
        list.set_parent(&id, Some(&folder_id));
    }
    save(file, &list)?;
    info!("Added lora entry {}", id);
    println!("{id}");
    Ok(())
}

fn add_folder_command(file: &Path, name: String) -> Result<()> {
    let mut list = load(file)?;
    let id = list.add_folder();
    list.set_folder_name(&id, name);
    save(file, &list)?;
    info!("Added folder {}", id);
    println!("{id}");
    Ok(())
}

fn remove_command(file: &Path, id: String) -> Result<()> {
    let mut list = load(file)?;
    let id = require(&list, &id)?;
    // Non-empty folders are refused; surface that instead of deleting children.
    list.remove(&id)
        .map_err(|e| anyhow::anyhow!("{e}: move or remove its entries first"))?;
    save(file, &list)?;
    info!("Removed {}", id);
    Ok(())
}

fn move_command(file: &Path, source: String, target: String) -> Result<()> {
    let mut list = load(file)?;
    let source = require(&list, &source)?;
    let target = require(&list, &target)?;
    list.move_entry(&source, &target);
    save(file, &list)?;
    info!("Moved {} next to {}", source, target);
    Ok(())
}

fn set_weight_command(file: &Path, id: String, weight: f64) -> Result<()> {
    let mut list = load(file)?;
    let id = require(&list, &id)?;
    list.set_weight(&id, weight);
    if let Some(lora) = list.get(&id).and_then(Entry::as_lora) {
        if lora.weight != weight {
            warn!("Weight clamped to {}", format_weight(lora.weight));
        }
    } else {
        bail!("{id} is not a lora entry");
    }
    save(file, &list)?;
    Ok(())
}

fn set_enabled_command(file: &Path, id: String, enabled: bool) -> Result<()> {
    let mut list = load(file)?;
    let id = require(&list, &id)?;
    list.set_enabled(&id, enabled);
    save(file, &list)?;
    info!("{} {}", if enabled { "Enabled" } else { "Disabled" }, id);
    Ok(())
}

fn rename_command(file: &Path, id: String, name: String) -> Result<()> {
    let mut list = load(file)?;
    let id = require(&list, &id)?;
    if list.get(&id).is_some_and(Entry::is_folder) {
        list.set_folder_name(&id, name);
    } else {
        list.set_display_name(&id, name);
    }
    save(file, &list)?;
    Ok(())
}

fn eject_command(file: &Path, id: String) -> Result<()> {
    let mut list = load(file)?;
    let id = require(&list, &id)?;
    list.set_parent(&id, None);
    save(file, &list)?;
    info!("Moved {} to top level", id);
    Ok(())
}

fn toggle_folder_command(file: &Path, id: String) -> Result<()> {
    let mut list = load(file)?;
    let id = require(&list, &id)?;
    if !list.get(&id).is_some_and(Entry::is_folder) {
        bail!("{id} is not a folder");
    }
    list.toggle_collapsed(&id);
    save(file, &list)?;
    Ok(())
}

fn show_command(file: &Path) -> Result<()> {
    let list = load(file)?;
    for row in layout(&list) {
        let indent = "  ".repeat(row.depth);
        match list.get(&row.id) {
            Some(Entry::Folder(folder)) => {
                let state = if folder.is_collapsed { "+" } else { "-" };
                let count = children_of(&list, &folder.id).count();
                println!("{indent}[{state}] {} ({count})  id={}", folder.name, folder.id);
            }
            Some(Entry::Lora(lora)) => {
                let mark = if lora.enabled { "x" } else { " " };
                let label = if lora.display_name.is_empty() {
                    &lora.lora_name
                } else {
                    &lora.display_name
                };
                println!(
                    "{indent}[{mark}] {label} @ {}  id={}",
                    format_weight(lora.weight),
                    lora.id
                );
            }
            None => {}
        }
    }
    Ok(())
}

fn validate_command(file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read document: {}", file.display()))?;
    // Inspect the document as written. `parse_json` would repair dangling
    // parents and out-of-range weights, the exact problems reported here.
    let list: EntryList = serde_json::from_str(&json)
        .with_context(|| format!("malformed document: {}", file.display()))?;
    let issues = list.integrity_issues();
    if issues.is_empty() {
        info!("Document valid: {} entries", list.len());
        return Ok(());
    }
    for issue in &issues {
        warn!("{}", issue);
    }
    bail!("document has {} consistency problem(s)", issues.len());
}

fn loras_command(dir: Option<PathBuf>, filter: Option<String>) -> Result<()> {
    let root = dir.unwrap_or_else(catalog::default_lora_dir);
    let found = catalog::LoraCatalog::scan(&root)?;
    info!("Scanned {}: {} files", found.root().display(), found.len());
    match filter {
        Some(needle) => {
            for file in found.filter(&needle) {
                println!("{file}");
            }
        }
        None => {
            for file in found.picker_items() {
                println!("{file}");
            }
        }
    }
    Ok(())
}
