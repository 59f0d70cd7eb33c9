//! rulecfg - inspect, render and edit settings trees from the command line

use std::{
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rulecfg::{ItemId, PageStyles, Registry, TreeSpec};

#[macro_use]
extern crate log;

mod values;

use values::{ValueFile, parse_value};

#[derive(Parser)]
#[command(name = "rulecfg")]
#[command(version, about = "Settings trees for page customization rules", long_about = None)]
struct Cli {
    /// Tree declaration file (.toml or .json)
    #[arg(short, long, global = true, default_value = "rules.toml")]
    tree: PathBuf,

    /// Values file (.toml or .json), created on first save
    #[arg(short, long, global = true, default_value = "values.json")]
    values: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render rules as an HTML settings panel
    Render {
        /// Print one plain-text summary per rule instead
        #[arg(long)]
        text: bool,

        /// Tab, group or rule keys to render (defaults to everything)
        keys: Vec<String>,
    },

    /// List rules with their keys and enabled state
    Query {
        /// Tab, group or rule keys to walk (defaults to everything)
        keys: Vec<String>,
    },

    /// Execute every rule and print the resulting style sheet
    Apply,

    /// Print the normalized value of an item
    Get {
        key: String,
    },

    /// Store a value for an item and save the values file
    ///
    /// This is the only command that writes the values file.
    Set {
        key: String,

        /// JSON value; anything that is not valid JSON is taken as a string
        value: String,
    },

    /// Print the JSON Schema of tree files
    Schema,
}

fn main() -> Result<()> {
    env_logger::builder()
        .format_timestamp(None)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&TreeSpec::schema()?)?);
            Ok(())
        }
        command => run(command, &cli.tree, &cli.values),
    }
}

fn run(command: Commands, tree: &Path, values: &Path) -> Result<()> {
    let spec = TreeSpec::load(tree)?;
    let mut file = ValueFile::open(values)?;
    let styles = Rc::new(PageStyles::new());
    let mut reg = Registry::new(file.store()).with_styles(styles.clone());
    reg.load_spec(&spec)
        .with_context(|| format!("Invalid tree in {}", tree.display()))?;

    // Read commands may heal values in memory, but only edits reach the file.
    let persist = matches!(command, Commands::Set { .. });

    match command {
        Commands::Render { text, keys } => {
            let base = resolve(&reg, &keys)?;
            if text {
                for rule in rules(&reg, &base) {
                    println!("{}", reg.render_text(rule)?);
                }
            } else {
                let panel = reg.render_panel(&base)?;
                println!("{}", reg.document().borrow().to_html(panel));
            }
        }
        Commands::Query { keys } => {
            let base = resolve(&reg, &keys)?;
            for rule in rules(&reg, &base) {
                let state = if reg.is_enabled(rule)? {
                    "on ".green().bold()
                } else {
                    "off".red()
                };
                let key = reg.item(rule)?.key().unwrap_or("-").to_string();
                println!("{state} {} {}", key.cyan(), reg.render_text(rule)?);
            }
        }
        Commands::Apply => {
            let total = reg.query_all().len();
            let ok = reg.ready();
            if ok < total {
                warn!("{} of {total} rule(s) failed", total - ok);
            }
            println!("{}", styles.css());
        }
        Commands::Get { key } => {
            let id = find(&reg, &key)?;
            println!("{}", reg.get(id)?);
        }
        Commands::Set { key, value } => {
            let id = find(&reg, &key)?;
            let stored = reg.set(id, parse_value(&value))?;
            println!("{} = {}", key.cyan(), stored.to_string().bold());
        }
        Commands::Schema => {}
    }

    if persist && file.save()? {
        info!("values saved to {}", file.path().display());
    }
    Ok(())
}

fn find(reg: &Registry, key: &str) -> Result<ItemId> {
    reg.find(key).ok_or_else(|| anyhow!("no item with key `{key}`"))
}

fn resolve(reg: &Registry, keys: &[String]) -> Result<Vec<ItemId>> {
    keys.iter().map(|k| find(reg, k)).collect()
}

fn rules(reg: &Registry, base: &[ItemId]) -> Vec<ItemId> {
    if base.is_empty() {
        reg.query_all()
    } else {
        reg.query(base)
    }
}
