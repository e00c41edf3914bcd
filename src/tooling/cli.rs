//! CLI Tooling
//!
//! Command-line interface over the memory manager. Every command opens the
//! store, runs one operation and renders the result as text or JSON.

use crate::compression;
use crate::config::{ConfigLoader, NotebookStoreConfig, StoreSettings};
use crate::error::{ApiError, StorageError};
use crate::index::{DuplicateGroups, MetadataRecord, RecordFilter};
use crate::manager::{Fields, MemoryManager, StorageStats};
use crate::types::{ContentPayload, ObjectKey};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Notebook store - content-hashed, chunked notebook storage
#[derive(Parser, Debug)]
#[command(name = "notebook-store")]
#[command(about = "Store, deduplicate and expire notebook documents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage root directory (overrides configuration)
    #[arg(long, global = true)]
    pub storage_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store a notebook from a JSON file ("-" reads stdin)
    Put {
        key: String,
        file: PathBuf,
        /// Metadata field as key=value; values parse as JSON when possible
        #[arg(long = "meta")]
        meta: Vec<String>,
    },
    /// Replace the content of an existing notebook
    Update {
        key: String,
        file: PathBuf,
        #[arg(long = "meta")]
        meta: Vec<String>,
    },
    /// Print a notebook, or one top-level section of it
    Get {
        key: String,
        #[arg(long)]
        section: Option<String>,
    },
    /// Delete a notebook
    Delete { key: String },
    /// List notebooks, most recently accessed first
    List {
        /// Only records where field == value
        #[arg(long = "filter")]
        filter: Vec<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show notebooks sharing identical content
    Dupes {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Merge metadata fields into a notebook record
    Meta {
        key: String,
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Delete notebooks not accessed within the given number of days
    Clean {
        #[arg(long)]
        days: u64,
    },
    /// Show storage statistics
    Stats {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

impl Cli {
    /// Load configuration and apply command-line overrides.
    pub fn load_config(&self) -> Result<NotebookStoreConfig, ApiError> {
        let mut config = ConfigLoader::load(self.config.as_deref())?;
        if let Some(dir) = &self.storage_dir {
            config.storage.storage_dir = dir.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.logging.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.logging.file = Some(file.clone());
        }
        config.storage.validate()?;
        Ok(config)
    }
}

/// CLI context holding the opened store
#[derive(Debug)]
pub struct CliContext {
    manager: MemoryManager,
}

impl CliContext {
    pub fn new(settings: StoreSettings) -> Result<Self, ApiError> {
        Ok(Self {
            manager: MemoryManager::open(settings)?,
        })
    }

    pub fn manager(&self) -> &MemoryManager {
        &self.manager
    }

    /// Execute a CLI command
    pub fn execute(&mut self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Put { key, file, meta } => {
                let key = parse_key(key)?;
                let payload = read_payload(file)?;
                let fields = parse_assignments(meta)?;
                let record = self.manager.store(&key, &payload, optional(&fields))?;
                Ok(format_write("Stored", &record))
            }
            Commands::Update { key, file, meta } => {
                let key = parse_key(key)?;
                let payload = read_payload(file)?;
                let fields = parse_assignments(meta)?;
                let record = self.manager.update(&key, &payload, optional(&fields))?;
                Ok(format_write("Updated", &record))
            }
            Commands::Get { key, section } => {
                let key = parse_key(key)?;
                let value = match section {
                    Some(section) => self.manager.retrieve_section(&key, section)?,
                    None => self.manager.retrieve(&key)?,
                };
                to_pretty_json(&value)
            }
            Commands::Delete { key } => {
                let key = parse_key(key)?;
                self.manager.delete(&key)?;
                Ok(format!("Deleted {}", key))
            }
            Commands::List { filter, format } => {
                let mut record_filter = RecordFilter::new();
                for (field, value) in parse_assignments(filter)? {
                    record_filter = record_filter.where_eq(field, value);
                }
                let records = self.manager.list(&record_filter);
                match format {
                    OutputFormat::Json => to_pretty_json(&records),
                    OutputFormat::Text => Ok(format_records_text(&records)),
                }
            }
            Commands::Dupes { format } => {
                let groups = self.manager.find_duplicate_notebooks();
                match format {
                    OutputFormat::Json => to_pretty_json(&duplicate_keys(&groups)),
                    OutputFormat::Text => Ok(format_duplicates_text(&groups)),
                }
            }
            Commands::Meta { key, fields } => {
                let key = parse_key(key)?;
                let fields = parse_assignments(fields)?;
                let record = self.manager.update_metadata(&key, &fields)?;
                to_pretty_json(&record)
            }
            Commands::Clean { days } => {
                let removed = self.manager.clean_storage(*days)?;
                Ok(format!(
                    "Removed {} notebook(s) not accessed in {} day(s)",
                    removed, days
                ))
            }
            Commands::Stats { format } => {
                let stats = self.manager.stats()?;
                match format {
                    OutputFormat::Json => to_pretty_json(&stats),
                    OutputFormat::Text => Ok(format_stats_text(&stats)),
                }
            }
        }
    }
}

fn parse_key(raw: &str) -> Result<ObjectKey, ApiError> {
    ObjectKey::new(raw).map_err(|e| ApiError::InvalidArgument(e.to_string()))
}

fn optional(fields: &Fields) -> Option<&Fields> {
    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}

/// Read a JSON payload from `path`, or stdin when `path` is "-".
fn read_payload(path: &Path) -> Result<ContentPayload, ApiError> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| StorageError::io("<stdin>", e))?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?
    };
    compression::from_json_slice(text.as_bytes()).map_err(|e| {
        ApiError::InvalidArgument(format!("{} is not valid JSON: {}", path.display(), e))
    })
}

/// Parse `key=value` pairs. Values are JSON when they parse as JSON, else strings.
fn parse_assignments(pairs: &[String]) -> Result<Fields, ApiError> {
    let mut fields = Fields::new();
    for pair in pairs {
        let (name, raw) = pair.split_once('=').ok_or_else(|| {
            ApiError::InvalidArgument(format!("Expected key=value, got '{}'", pair))
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidArgument(format!(
                "Empty field name in '{}'",
                pair
            )));
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        fields.insert(name.to_string(), value);
    }
    Ok(fields)
}

fn to_pretty_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::StorageError(StorageError::Serialization(e.to_string())))
}

fn duplicate_keys(groups: &DuplicateGroups) -> BTreeMap<String, Vec<String>> {
    groups
        .iter()
        .map(|(hash, records)| {
            let keys = records.iter().map(|r| r.id.to_string()).collect();
            (hash.to_string(), keys)
        })
        .collect()
}

fn format_write(verb: &str, record: &MetadataRecord) -> String {
    let mut out = format!(
        "{} {} (hash {}, {} bytes)",
        verb,
        record.id,
        record.content_hash.short(),
        record.size
    );
    if record.hash_degraded {
        out.push_str("\nWarning: content could not be hashed; deduplication disabled for this notebook");
    }
    out
}

fn format_records_text(records: &[MetadataRecord]) -> String {
    if records.is_empty() {
        return "No notebooks stored.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Key", "Hash", "Size", "Last accessed", "Fields"]);
    for record in records {
        let fields = if record.fields.is_empty() {
            "-".to_string()
        } else {
            Value::Object(record.fields.clone()).to_string()
        };
        table.add_row(vec![
            record.id.to_string(),
            record.content_hash.short().to_string(),
            record.size.to_string(),
            record.last_accessed.format("%Y-%m-%d %H:%M:%S").to_string(),
            fields,
        ]);
    }
    table.to_string()
}

fn format_duplicates_text(groups: &DuplicateGroups) -> String {
    if groups.is_empty() {
        return "No duplicate notebooks found.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Hash", "Keys"]);
    for (hash, records) in groups {
        let keys: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        table.add_row(vec![hash.short().to_string(), keys.join(", ")]);
    }
    table.to_string()
}

fn format_stats_text(stats: &StorageStats) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Metric", "Value"]);
    let rows = [
        ("Notebooks", stats.objects.to_string()),
        (
            "Cached",
            format!("{} / {}", stats.cached, stats.cache_capacity),
        ),
        ("Content bytes", stats.total_size.to_string()),
        ("Disk bytes", stats.disk_bytes.to_string()),
        ("Duplicate groups", stats.duplicate_groups.to_string()),
        ("Duplicated notebooks", stats.duplicate_objects.to_string()),
        ("Degraded hashes", stats.degraded_hashes.to_string()),
        (
            "Compression",
            if stats.compression_available {
                "zlib".to_string()
            } else {
                "off".to_string()
            },
        ),
    ];
    for (metric, value) in rows {
        table.add_row(vec![metric.to_string(), value]);
    }
    table.to_string()
}
