use std::fs;
use std::path::{Path, PathBuf};

use curator_logging::{curator_info, curator_warn};
use toml::{Table, Value};

use crate::pipeline::{
    dedupe_keep_first, default_kwargs, DownloadPlan, PluginInvocation, Stage,
    PLUGIN_DOWNLOAD_COVER, PLUGIN_IMG2PDF, PLUGIN_LONG_IMG, PLUGIN_SKIP_SPARSE,
};
use crate::storage::{write_atomic, PersistError};

/// Default directory rule applied on first run and whenever the document
/// omits one.
pub const DEFAULT_DIR_RULE: &str = "{album_id}-{album_title}/{chapter_id}-{chapter_title}";

/// How the persisted document was obtained at startup. Recovery from a
/// missing or corrupt file is deliberate and logged, never a silent
/// catch-all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    DefaultedMissing,
    DefaultedCorrupt(String),
}

/// Persisted pipeline configuration: a TOML document addressed by dotted
/// paths. Loaded once at startup, mutated by the settings surface, written
/// back only on an explicit [`OptionStore::save`].
#[derive(Debug, Clone, PartialEq)]
pub struct OptionStore {
    path: PathBuf,
    document: Table,
}

impl OptionStore {
    /// Opens the document at `path`. A missing file writes and returns
    /// `defaults`; an unreadable or unparsable file returns `defaults`
    /// without touching the file on disk (it is only replaced by an
    /// explicit save). Never fails outward.
    pub fn open(path: PathBuf, defaults: Table) -> (Self, LoadOutcome) {
        match fs::read_to_string(&path) {
            Ok(text) => match text.parse::<Table>() {
                Ok(document) => (Self { path, document }, LoadOutcome::Loaded),
                Err(err) => {
                    curator_warn!("options file {:?} is corrupt: {}", path, err);
                    let cause = err.to_string();
                    (
                        Self {
                            path,
                            document: defaults,
                        },
                        LoadOutcome::DefaultedCorrupt(cause),
                    )
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let store = Self {
                    path,
                    document: defaults,
                };
                // First run: persist the defaults so the user has a file to
                // edit. A write failure here is logged, not fatal.
                if let Err(save_err) = store.save() {
                    curator_warn!("could not write default options: {}", save_err);
                }
                (store, LoadOutcome::DefaultedMissing)
            }
            Err(err) => {
                curator_warn!("options file {:?} is unreadable: {}", path, err);
                let cause = err.to_string();
                (
                    Self {
                        path,
                        document: defaults,
                    },
                    LoadOutcome::DefaultedCorrupt(cause),
                )
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Table {
        &self.document
    }

    /// Traverses the document by dotted path. Absent segments or indexing
    /// into a non-table yield `None`; the caller supplies its own default.
    pub fn get(&self, dotted: &str) -> Option<&Value> {
        let mut segments = dotted.split('.');
        let mut current = self.document.get(segments.next()?)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    /// Sets a leaf by dotted path, creating intermediate tables as needed.
    /// An intermediate that exists as a non-table is replaced by a table.
    pub fn set(&mut self, dotted: &str, value: Value) {
        let mut segments: Vec<&str> = dotted.split('.').collect();
        let leaf = segments.pop().expect("split yields at least one segment");

        let mut table = &mut self.document;
        for segment in segments {
            let slot = table
                .entry(segment.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            if !slot.is_table() {
                *slot = Value::Table(Table::new());
            }
            table = slot.as_table_mut().expect("slot was just made a table");
        }
        table.insert(leaf.to_string(), value);
    }

    /// Serializes and writes the document atomically. The `plugins` table
    /// is elided when every stage list is empty; `dir_rule` always
    /// persists. Key order is the canonical insertion order, so repeated
    /// saves produce minimal diffs.
    pub fn save(&self) -> Result<(), PersistError> {
        let document = elide_empty_plugins(self.document.clone());
        let text = toml::to_string_pretty(&document)
            .map_err(|err| PersistError::Serialize(err.to_string()))?;
        write_atomic(&self.path, text.as_bytes())
    }

    /// Typed snapshot for the engine. Malformed entries are dropped with a
    /// warning; duplicate plugin names within a stage keep the first.
    pub fn plan(&self) -> DownloadPlan {
        let base_dir = self
            .get("dir_rule.base_dir")
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("download"));
        let dir_rule = self
            .get("dir_rule.rule")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_DIR_RULE)
            .to_string();

        DownloadPlan {
            base_dir,
            dir_rule,
            before_album: self.stage_invocations(Stage::BeforeAlbum),
            after_album: self.stage_invocations(Stage::AfterAlbum),
            before_photo: self.stage_invocations(Stage::BeforePhoto),
        }
    }

    fn stage_invocations(&self, stage: Stage) -> Vec<PluginInvocation> {
        let Some(entries) = self
            .get(&format!("plugins.{}", stage.key()))
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };

        let mut invocations = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(table) = entry.as_table() else {
                curator_warn!("ignoring malformed entry in stage {}", stage.key());
                continue;
            };
            let Some(name) = table.get("plugin").and_then(Value::as_str) else {
                curator_warn!("ignoring unnamed plugin entry in stage {}", stage.key());
                continue;
            };
            let kwargs = table
                .get("kwargs")
                .and_then(Value::as_table)
                .cloned()
                .unwrap_or_default();
            invocations.push(PluginInvocation {
                name: name.to_string(),
                kwargs,
            });
        }
        dedupe_keep_first(invocations, stage)
    }
}

/// Built-in first-run document: download directory under `download_dir`,
/// the conventional plugin set enabled for every stage.
pub fn default_document(download_dir: &Path) -> Table {
    let mut dir_rule = Table::new();
    dir_rule.insert(
        "base_dir".to_string(),
        Value::String(download_dir.display().to_string()),
    );
    dir_rule.insert(
        "rule".to_string(),
        Value::String(DEFAULT_DIR_RULE.to_string()),
    );

    let mut plugins = Table::new();
    for stage in Stage::ALL {
        let names: &[&str] = match stage {
            Stage::BeforeAlbum => &[PLUGIN_DOWNLOAD_COVER],
            Stage::AfterAlbum => &[PLUGIN_IMG2PDF, PLUGIN_LONG_IMG],
            Stage::BeforePhoto => &[PLUGIN_SKIP_SPARSE],
        };
        let entries = names
            .iter()
            .map(|name| {
                let mut entry = Table::new();
                entry.insert("plugin".to_string(), Value::String((*name).to_string()));
                if let Some(kwargs) = default_kwargs(name, download_dir) {
                    entry.insert("kwargs".to_string(), Value::Table(kwargs));
                }
                Value::Table(entry)
            })
            .collect();
        plugins.insert(stage.key().to_string(), Value::Array(entries));
    }

    let mut document = Table::new();
    document.insert("dir_rule".to_string(), Value::Table(dir_rule));
    document.insert("plugins".to_string(), Value::Table(plugins));
    document
}

/// Drops the whole `plugins` table when no stage has any invocation left.
fn elide_empty_plugins(mut document: Table) -> Table {
    let remove = match document.get("plugins").and_then(Value::as_table) {
        Some(plugins) => plugins
            .values()
            .all(|stage| stage.as_array().is_none_or(|list| list.is_empty())),
        None => document.contains_key("plugins"),
    };
    if remove && document.remove("plugins").is_some() {
        curator_info!("no plugins enabled, eliding the plugins table on save");
    }
    document
}
