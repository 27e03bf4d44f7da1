use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallshelf::descriptor::check_health;
use wallshelf::listing::ListEntry;
use wallshelf::paths::validate_custom_root;
use wallshelf::scanner::ProgressUpdate;
use wallshelf::settings::Settings;
use wallshelf::vfs::VfsNode;
use wallshelf::{
    Folder, Library, LibraryHandle, LibraryPaths, MoveSource, ReconcileReport, SortBy,
    SortOptions, SortOrder, VPath,
};

#[derive(Parser)]
#[command(name = "wallshelf")]
#[command(about = "Organise a wallpaper library into virtual folders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to settings file
    #[arg(short = 'c', long, global = true)]
    config: Option<String>,

    /// Use this library root for one run instead of the configured one
    #[arg(short, long, global = true)]
    library: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rescan the library root and reconcile the virtual tree
    Scan,
    /// List a virtual folder
    Ls {
        /// Virtual path, e.g. ./Games/
        #[arg(default_value = "./")]
        vpath: String,
        #[arg(long, value_enum)]
        sort: Option<SortBy>,
        /// Sort descending
        #[arg(long)]
        desc: bool,
    },
    /// Print the whole virtual tree with folder sizes
    Tree,
    /// Print stored per-item metadata
    Meta,
    /// Create a virtual folder
    Mkdir {
        name: String,
        /// Parent virtual path
        #[arg(short, long, default_value = "./")]
        parent: String,
    },
    /// Move items and folders into a virtual folder (folders end in `/`)
    Mv {
        #[arg(required = true)]
        sources: Vec<String>,
        #[arg(long)]
        to: String,
    },
    /// Delete an empty virtual folder
    Rmdir { vpath: String },
    /// Drop items from the tree and forget their metadata
    Forget {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Record the launcher executable for an item
    SetApp {
        id: String,
        /// Executable path relative to the item folder
        relative_path: PathBuf,
        #[arg(long = "type", default_value = "application")]
        kind: String,
    },
    /// Check every item for a usable project.json
    Health,
    /// Reset the database and rebuild it from disk
    Clear,
    /// Switch to a custom library root
    UsePath { path: PathBuf },
    /// Switch back to the default library root
    UseDefaultPath,
    /// List referenced items that are missing from disk
    Dangling,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings_path = if let Some(config) = &cli.config {
        PathBuf::from(shellexpand::tilde(config).to_string())
    } else {
        Settings::default_path()
    };
    let mut settings = Settings::load(&settings_path).context("Failed to load settings")?;

    let paths = match &cli.library {
        Some(root) => LibraryPaths::for_root(shellexpand::tilde(root).to_string()),
        None => LibraryPaths::resolve(&settings.library),
    };

    // Settings-only commands do not need the library loaded
    match &cli.command {
        Commands::Health => {
            let report = check_health(&paths.root)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.is_healthy() {
                println!("All items in {} look healthy", paths.root.display());
            } else {
                for issue in &report.missing_descriptor {
                    println!("missing  {} ({})", issue.id, issue.reason);
                }
                for issue in &report.invalid_descriptor {
                    println!("invalid  {} ({})", issue.id, issue.reason);
                }
            }
            return Ok(());
        }
        Commands::UsePath { path } => {
            validate_custom_root(path)?;
            let path = path
                .canonicalize()
                .with_context(|| format!("Failed to resolve {}", path.display()))?;
            settings.library.use_custom_root(&path);
            settings.save(&settings_path)?;
        }
        Commands::UseDefaultPath => {
            settings.library.use_default_root();
            settings.save(&settings_path)?;
        }
        _ => {}
    }

    let library = Library::open(paths).with_vfs_disabled(settings.library.vfs_disabled);
    let (handle, actor_task) = LibraryHandle::spawn(library);

    // Every command sees a reconciled tree; a failed scan still leaves the
    // stored tree usable
    let needs_startup_scan = !matches!(
        cli.command,
        Commands::Scan | Commands::Clear | Commands::UsePath { .. } | Commands::UseDefaultPath
    );
    if needs_startup_scan {
        if let Err(e) = handle.rescan().await {
            tracing::warn!("Startup scan failed: {}", e);
        }
    }

    let view_sort = settings.view.sort_options();
    match cli.command {
        Commands::Scan => {
            let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<ProgressUpdate>();
            let progress_task = tokio::spawn(async move {
                while let Some(progress) = progress_rx.recv().await {
                    eprint!(
                        "\rScanning {}/{} ({})\x1B[K",
                        progress.items_scanned, progress.total_items, progress.current_item
                    );
                }
                eprintln!();
            });

            let result = handle.rescan_with_progress(progress_tx).await;
            progress_task.await?;
            print_report(&result?);
        }
        Commands::Ls { vpath, sort, desc } => {
            let sort = SortOptions::new(
                sort.unwrap_or(view_sort.by),
                if desc { SortOrder::Desc } else { view_sort.order },
            );
            let entries = handle.list_children(VPath::parse(&vpath), sort).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                print_entries(&entries);
            }
        }
        Commands::Tree => {
            let tree = handle.full_tree().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&tree)?);
            } else {
                print_tree(&tree, 0);
            }
        }
        Commands::Meta => {
            let metadata = handle.all_metadata().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&metadata)?);
            } else {
                println!("{:<14} {:<12} {:>12} {}", "ID", "Type", "Size", "Launcher");
                println!("{}", "-".repeat(60));
                for (id, meta) in &metadata {
                    println!(
                        "{:<14} {:<12} {:>12} {}",
                        id,
                        meta.kind.as_deref().unwrap_or("-"),
                        meta.size.map(format_size).unwrap_or_else(|| "-".to_string()),
                        meta.app_path.as_deref().unwrap_or("")
                    );
                }
            }
        }
        Commands::Mkdir { name, parent } => {
            let created = handle.create_folder(VPath::parse(&parent), name).await?;
            println!("Created {}", created);
        }
        Commands::Mv { sources, to } => {
            let sources: Vec<MoveSource> = sources.iter().map(|s| MoveSource::parse(s)).collect();
            let report = handle.move_items(sources, VPath::parse(&to)).await?;
            println!("Moved {} entries to {}", report.moved.len(), VPath::parse(&to));
            for skipped in &report.skipped {
                println!("  skipped {} (no longer exists)", skipped);
            }
        }
        Commands::Rmdir { vpath } => {
            let vpath = VPath::parse(&vpath);
            handle.delete_virtual_folder(vpath.clone()).await?;
            println!("Deleted {}", vpath);
        }
        Commands::Forget { ids } => {
            let removed = handle.remove_item_references(ids).await?;
            println!("Forgot {} items", removed);
        }
        Commands::SetApp {
            id,
            relative_path,
            kind,
        } => {
            handle
                .assign_launcher_path(id.clone(), relative_path.clone(), kind)
                .await?;
            println!("Launcher for {} set to {}", id, relative_path.display());
        }
        Commands::Clear => {
            let report = handle.reset().await?;
            println!("Database cleared");
            print_report(&report);
        }
        Commands::UsePath { .. } | Commands::UseDefaultPath => {
            let paths = LibraryPaths::resolve(&settings.library);
            let root = paths.root.clone();
            let report = handle.reopen(paths).await?;
            println!("Library root is now {}", root.display());
            print_report(&report);
        }
        Commands::Dangling => {
            let dangling = handle.dangling_references().await?;
            if dangling.is_empty() {
                println!("No dangling references");
            } else {
                for id in dangling {
                    println!("{}", id);
                }
            }
        }
        Commands::Health => {}
    }

    handle.shutdown().await;
    actor_task.await?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "wallshelf=debug"
    } else {
        "wallshelf=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_report(report: &ReconcileReport) {
    println!("Scan complete!");
    println!("  Refreshed: {}", report.refreshed.len());
    println!("  Archived:  {}", report.archived.len());
    println!("  Pruned:    {}", report.pruned.len());
    if !report.changed {
        println!("  Database unchanged");
    }
}

fn print_entries(entries: &[ListEntry]) {
    if entries.is_empty() {
        println!("(empty)");
        return;
    }
    for entry in entries {
        match entry {
            ListEntry::Folder(folder) => {
                println!("📁 {:<40} {:>12}", folder.vpath, format_size(folder.size));
            }
            ListEntry::Wallpaper(item) => {
                let marker = if item.preview_missing { " (no preview)" } else { "" };
                println!(
                    "   {:<14} {:<26} {:<12} {:>12}{}",
                    item.id,
                    item.title,
                    item.kind,
                    format_size(item.size),
                    marker
                );
            }
        }
    }
}

fn print_tree(folder: &Folder, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("{}📁 {} ({})", indent, folder.name, format_size(folder.size));
    for child in &folder.children {
        match child {
            VfsNode::Folder(sub) => print_tree(sub, depth + 1),
            VfsNode::Item(item) => println!("{}  📄 {} [{}]", indent, item.id, item.kind),
        }
    }
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_cli_parses_move() {
        let cli = Cli::parse_from(["wallshelf", "mv", "123", "./Games/", "--to", "./Archive/"]);
        match cli.command {
            Commands::Mv { sources, to } => {
                assert_eq!(sources, vec!["123", "./Games/"]);
                assert_eq!(to, "./Archive/");
            }
            _ => panic!("expected mv"),
        }
    }

    #[test]
    fn test_cli_parses_sort_flags() {
        let cli = Cli::parse_from(["wallshelf", "ls", "./A/", "--sort", "date-added", "--desc"]);
        match cli.command {
            Commands::Ls { vpath, sort, desc } => {
                assert_eq!(vpath, "./A/");
                assert_eq!(sort, Some(SortBy::DateAdded));
                assert!(desc);
            }
            _ => panic!("expected ls"),
        }
    }
}
