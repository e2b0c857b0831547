use std::path::Path;

use curator_logging::curator_warn;
use toml::{Table, Value};

/// The three fixed pipeline extension points, in canonical document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    BeforeAlbum,
    AfterAlbum,
    BeforePhoto,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::BeforeAlbum, Stage::AfterAlbum, Stage::BeforePhoto];

    /// Fixed key used in the persisted document.
    pub fn key(self) -> &'static str {
        match self {
            Stage::BeforeAlbum => "before_album",
            Stage::AfterAlbum => "after_album",
            Stage::BeforePhoto => "before_photo",
        }
    }
}

/// One named processing step with its kwargs, executed at a given stage.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginInvocation {
    pub name: String,
    pub kwargs: Table,
}

/// Immutable, typed snapshot of the pipeline document, taken at dispatch
/// time so a running download never races a settings edit.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadPlan {
    pub base_dir: std::path::PathBuf,
    pub dir_rule: String,
    pub before_album: Vec<PluginInvocation>,
    pub after_album: Vec<PluginInvocation>,
    pub before_photo: Vec<PluginInvocation>,
}

impl DownloadPlan {
    pub fn invocations(&self, stage: Stage) -> &[PluginInvocation] {
        match stage {
            Stage::BeforeAlbum => &self.before_album,
            Stage::AfterAlbum => &self.after_album,
            Stage::BeforePhoto => &self.before_photo,
        }
    }

    pub fn find(&self, stage: Stage, name: &str) -> Option<&PluginInvocation> {
        self.invocations(stage)
            .iter()
            .find(|invocation| invocation.name == name)
    }
}

pub const PLUGIN_DOWNLOAD_COVER: &str = "download_cover";
pub const PLUGIN_IMG2PDF: &str = "img2pdf";
pub const PLUGIN_LONG_IMG: &str = "long_img";
pub const PLUGIN_SKIP_SPARSE: &str = "skip_photo_with_few_images";

/// A plugin name the settings surface knows how to enable. Enabling one
/// installs its fixed default kwargs shape; unknown names are out of scope.
#[derive(Debug, Clone, Copy)]
pub struct KnownPlugin {
    pub name: &'static str,
    pub stage: Stage,
    pub summary: &'static str,
}

pub const KNOWN_PLUGINS: [KnownPlugin; 4] = [
    KnownPlugin {
        name: PLUGIN_DOWNLOAD_COVER,
        stage: Stage::BeforeAlbum,
        summary: "save the album cover image",
    },
    KnownPlugin {
        name: PLUGIN_IMG2PDF,
        stage: Stage::AfterAlbum,
        summary: "bundle downloaded pages into a PDF",
    },
    KnownPlugin {
        name: PLUGIN_LONG_IMG,
        stage: Stage::AfterAlbum,
        summary: "stitch downloaded pages into one long image",
    },
    KnownPlugin {
        name: PLUGIN_SKIP_SPARSE,
        stage: Stage::BeforePhoto,
        summary: "skip chapters with too few images",
    },
];

pub fn known_plugin(name: &str) -> Option<&'static KnownPlugin> {
    KNOWN_PLUGINS.iter().find(|plugin| plugin.name == name)
}

/// Fixed default kwargs for a known plugin name. `base_dir` feeds the
/// output-directory defaults.
pub fn default_kwargs(name: &str, base_dir: &Path) -> Option<Table> {
    let base = base_dir.display().to_string();
    let mut kwargs = Table::new();
    match name {
        PLUGIN_DOWNLOAD_COVER => {
            kwargs.insert("size".to_string(), Value::String("_3x4".to_string()));
            let mut dir_rule = Table::new();
            dir_rule.insert("base_dir".to_string(), Value::String(base));
            dir_rule.insert(
                "rule".to_string(),
                Value::String("{album_title}/{album_id}_cover.jpg".to_string()),
            );
            kwargs.insert("dir_rule".to_string(), Value::Table(dir_rule));
        }
        PLUGIN_IMG2PDF | PLUGIN_LONG_IMG => {
            kwargs.insert(
                "filename_rule".to_string(),
                Value::String("{album_id}-{album_title}".to_string()),
            );
            kwargs.insert("output_dir".to_string(), Value::String(base));
        }
        PLUGIN_SKIP_SPARSE => {
            kwargs.insert("at_least_image_count".to_string(), Value::Integer(3));
        }
        _ => return None,
    }
    Some(kwargs)
}

/// Duplicate-name policy within a stage: keep the first entry, warn about
/// the rest. The alternative (last wins) only ever happened by accident of
/// mapping order and is not worth preserving.
pub(crate) fn dedupe_keep_first(
    invocations: Vec<PluginInvocation>,
    stage: Stage,
) -> Vec<PluginInvocation> {
    let mut kept: Vec<PluginInvocation> = Vec::with_capacity(invocations.len());
    for invocation in invocations {
        if kept.iter().any(|existing| existing.name == invocation.name) {
            curator_warn!(
                "duplicate plugin {:?} in stage {}, keeping the first entry",
                invocation.name,
                stage.key()
            );
            continue;
        }
        kept.push(invocation);
    }
    kept
}
