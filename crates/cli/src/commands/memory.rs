//! `devassist memory`: durable memory store commands.

use clap::Subcommand;
use devassist_config::AppConfig;
use devassist_core::memory::{Document, MemoryItem, MemoryQuery, MemoryStore};
use devassist_memory::{FileMemory, FileMemoryOptions};
use serde_json::Value;
use std::path::Path;

use super::{CmdResult, load_config};

#[derive(Subcommand)]
pub enum MemoryAction {
    /// Store a JSON document
    Add {
        /// Document as a JSON object
        data: String,

        #[arg(long)]
        project: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Fetch an item by id
    Get { id: String },

    /// Search stored items, newest first
    Search {
        /// Case-insensitive substring matched against the whole document
        #[arg(long)]
        text: Option<String>,

        #[arg(long)]
        project: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Exact field match as `path=value`; the value is parsed as JSON when possible
        #[arg(long = "field", value_name = "PATH=VALUE")]
        fields: Vec<String>,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Replace an item's document
    Update { id: String, data: String },

    /// Delete an item
    Delete { id: String },

    /// Delete every item
    Clear {
        /// Required to actually delete
        #[arg(long)]
        confirm: bool,
    },

    /// Show store statistics
    Stats,

    /// List projects
    Projects,

    /// List categories
    Categories,
}

fn open(config: &AppConfig) -> Result<FileMemory, Box<dyn std::error::Error>> {
    let long_term = &config.memory.long_term;
    let options = FileMemoryOptions {
        index_in_memory: long_term.index_in_memory,
        max_items_per_category: long_term.max_items_per_category,
    };
    Ok(FileMemory::open(long_term.resolved_path(), options)?)
}

fn parse_document(raw: &str) -> Result<Document, Box<dyn std::error::Error>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err("memory documents must be JSON objects".into()),
    }
}

fn parse_field(raw: &str) -> Result<(String, Value), Box<dyn std::error::Error>> {
    let (path, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid field filter '{raw}', expected PATH=VALUE"))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((path.to_string(), value))
}

fn print_item(item: &MemoryItem) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(item)?);
    Ok(())
}

pub fn run(config_path: Option<&Path>, action: MemoryAction) -> CmdResult {
    let config = load_config(config_path)?;
    let store = open(&config)?;

    match action {
        MemoryAction::Add {
            data,
            project,
            category,
        } => {
            let mut doc = parse_document(&data)?;
            if let Some(project) = project {
                doc.insert("project".into(), Value::String(project));
            }
            if let Some(category) = category {
                doc.insert("category".into(), Value::String(category));
            }
            let id = store.add(doc)?;
            println!("{id}");
        }
        MemoryAction::Get { id } => match store.get(&id)? {
            Some(item) => print_item(&item)?,
            None => return Err(format!("no memory item with id {id}").into()),
        },
        MemoryAction::Search {
            text,
            project,
            category,
            fields,
            limit,
        } => {
            let mut query = MemoryQuery::new().limit(limit);
            if let Some(text) = text {
                query = query.text(text);
            }
            if let Some(project) = project {
                query = query.project(project);
            }
            if let Some(category) = category {
                query = query.category(category);
            }
            for raw in &fields {
                let (path, value) = parse_field(raw)?;
                query = query.field(path, value);
            }

            let items = store.search(&query)?;
            if items.is_empty() {
                eprintln!("No matching items.");
            }
            for item in &items {
                print_item(item)?;
            }
        }
        MemoryAction::Update { id, data } => {
            if !store.update(&id, parse_document(&data)?)? {
                return Err(format!("no memory item with id {id}").into());
            }
            println!("Updated {id}");
        }
        MemoryAction::Delete { id } => {
            if !store.delete(&id)? {
                return Err(format!("no memory item with id {id}").into());
            }
            println!("Deleted {id}");
        }
        MemoryAction::Clear { confirm } => {
            if !confirm {
                println!("This will delete ALL memory items permanently.");
                println!("Run with --confirm to proceed:");
                println!("  devassist memory clear --confirm");
                return Ok(());
            }
            store.clear()?;
            println!("All memory items cleared.");
        }
        MemoryAction::Stats => {
            let stats = store.stats();
            println!("Memory Statistics");
            println!("=================");
            println!("  Path:       {}", stats.storage_path.display());
            println!("  Indexed:    {}", stats.index_in_memory);
            println!("  Items:      {}", stats.items);
            println!("  Projects:   {}", stats.projects);
            println!("  Categories: {}", stats.categories);
            println!("  Size:       {:.1} KB", stats.total_bytes as f64 / 1024.0);
            for (project, count) in &stats.top_projects {
                println!("    {project}: {count}");
            }
        }
        MemoryAction::Projects => {
            for project in store.projects() {
                println!("{project}");
            }
        }
        MemoryAction::Categories => {
            for category in store.categories() {
                println!("{category}");
            }
        }
    }

    Ok(())
}
