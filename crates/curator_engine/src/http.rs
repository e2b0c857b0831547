use std::path::Path;
use std::time::Duration;

use curator_logging::curator_warn;
use futures_util::StreamExt;
use serde::Deserialize;
use toml::Value;

use crate::pipeline::{DownloadPlan, PluginInvocation, Stage, PLUGIN_DOWNLOAD_COVER, PLUGIN_SKIP_SPARSE};
use crate::source::{ProgressSink, SourceClient, SourceError};
use crate::storage::PersistError;
use crate::template::{render_rule, RuleContext};
use crate::types::{AlbumDetail, AlbumMetadata, ChapterRef, DownloadSummary};

#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// Endpoint base, e.g. `https://source.example`. Empty means the
    /// source is unavailable and submission stays disabled.
    pub base_url: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_image_bytes: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            user_agent: "curator/0.1".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_image_bytes: 20 * 1024 * 1024,
        }
    }
}

impl SourceSettings {
    /// Settings from the environment; `CURATOR_SOURCE_URL` names the
    /// endpoint.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("CURATOR_SOURCE_URL").unwrap_or_default(),
            ..Self::default()
        }
    }
}

/// Bundled [`SourceClient`] over a JSON album API:
/// `GET /album/{id}` for metadata and chapters,
/// `GET /chapter/{id}/images` for image URL lists.
#[derive(Debug, Clone)]
pub struct HttpSourceClient {
    client: reqwest::Client,
    base_url: String,
    settings: SourceSettings,
}

impl HttpSourceClient {
    /// Fails with [`SourceError::Unavailable`] when the endpoint is missing
    /// or malformed; the caller surfaces that once at startup.
    pub fn new(settings: SourceSettings) -> Result<Self, SourceError> {
        let base_url = settings.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(SourceError::Unavailable(
                "no content source endpoint configured, set CURATOR_SOURCE_URL".to_string(),
            ));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(SourceError::Unavailable(format!(
                "source endpoint {base_url:?} is not an http(s) URL"
            )));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| SourceError::Unavailable(err.to_string()))?;

        Ok(Self {
            client,
            base_url,
            settings,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        serde_json::from_slice(&bytes).map_err(|err| SourceError::InvalidPayload(err.to_string()))
    }

    /// Streams a binary body with a running size guard.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let max_bytes = self.settings.max_image_bytes;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        if let Some(len) = response.content_length() {
            if len > max_bytes {
                return Err(SourceError::TooLarge { max_bytes });
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_transport_error)?;
            if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
                return Err(SourceError::TooLarge { max_bytes });
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    async fn run_before_album(
        &self,
        album_id: &str,
        detail: &AlbumDetail,
        plan: &DownloadPlan,
        sink: &dyn ProgressSink,
    ) -> Result<(), SourceError> {
        for invocation in plan.invocations(Stage::BeforeAlbum) {
            match invocation.name.as_str() {
                PLUGIN_DOWNLOAD_COVER => {
                    self.save_cover(album_id, detail, invocation, plan).await?;
                    sink.log("saved album cover");
                }
                other => log_unsupported(other, sink),
            }
        }
        Ok(())
    }

    async fn save_cover(
        &self,
        album_id: &str,
        detail: &AlbumDetail,
        invocation: &PluginInvocation,
        plan: &DownloadPlan,
    ) -> Result<(), SourceError> {
        let dir_rule = invocation.kwargs.get("dir_rule").and_then(Value::as_table);
        let base_dir = dir_rule
            .and_then(|table| table.get("base_dir"))
            .and_then(Value::as_str)
            .map(Path::new)
            .unwrap_or(&plan.base_dir);
        let rule = dir_rule
            .and_then(|table| table.get("rule"))
            .and_then(Value::as_str)
            .unwrap_or("{album_title}/{album_id}_cover.jpg");

        let ctx = RuleContext {
            album_id,
            album_title: &detail.metadata.name,
            ..RuleContext::default()
        };
        let path = base_dir.join(render_rule(rule, &ctx));

        let bytes = self.fetch_bytes(&self.cover_url(album_id)).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(persist)?;
        }
        tokio::fs::write(&path, &bytes).await.map_err(persist)?;
        Ok(())
    }

    fn run_after_album(&self, plan: &DownloadPlan, sink: &dyn ProgressSink) {
        // No bundled executors for this stage; the configuration still
        // round-trips and another SourceClient may execute these fully.
        for invocation in plan.invocations(Stage::AfterAlbum) {
            log_unsupported(&invocation.name, sink);
        }
    }
}

#[async_trait::async_trait]
impl SourceClient for HttpSourceClient {
    async fn fetch_metadata(&self, album_id: &str) -> Result<AlbumDetail, SourceError> {
        let payload: AlbumPayload = self
            .get_json(&format!("{}/album/{}", self.base_url, album_id))
            .await?;

        let chapters: Vec<ChapterRef> = payload
            .chapters
            .into_iter()
            .map(|chapter| ChapterRef {
                id: chapter.id.into_string(),
                title: chapter.title.filter(|title| !title.trim().is_empty()),
            })
            .collect();

        Ok(AlbumDetail {
            metadata: AlbumMetadata {
                name: payload.name,
                author: payload.author,
                tags: payload.tags.into_tags(),
                chapter_count: chapters.len(),
                description: payload
                    .description
                    .filter(|description| !description.trim().is_empty()),
            },
            chapters,
        })
    }

    async fn download(
        &self,
        album_id: &str,
        plan: &DownloadPlan,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadSummary, SourceError> {
        let detail = self.fetch_metadata(album_id).await?;

        self.run_before_album(album_id, &detail, plan, sink).await?;

        for invocation in plan.invocations(Stage::BeforePhoto) {
            if invocation.name != PLUGIN_SKIP_SPARSE {
                log_unsupported(&invocation.name, sink);
            }
        }
        let min_images = plan.find(Stage::BeforePhoto, PLUGIN_SKIP_SPARSE).map(|inv| {
            inv.kwargs
                .get("at_least_image_count")
                .and_then(Value::as_integer)
                .unwrap_or(3)
                .max(0) as usize
        });

        let mut summary = DownloadSummary::default();
        let total = detail.chapters.len();
        for (index, chapter) in detail.chapters.iter().enumerate() {
            summary.chapters_processed += 1;
            let images: Vec<String> = self
                .get_json(&format!(
                    "{}/chapter/{}/images",
                    self.base_url, chapter.id
                ))
                .await?;

            if let Some(min) = min_images {
                if images.len() < min {
                    sink.log(&format!(
                        "chapter {}/{}: skipped, only {} images",
                        index + 1,
                        total,
                        images.len()
                    ));
                    continue;
                }
            }

            let ctx = RuleContext {
                album_id,
                album_title: &detail.metadata.name,
                chapter_id: &chapter.id,
                chapter_title: chapter.title.as_deref().unwrap_or(""),
            };
            let dir = plan.base_dir.join(render_rule(&plan.dir_rule, &ctx));
            tokio::fs::create_dir_all(&dir).await.map_err(persist)?;

            let mut saved = 0;
            for (image_index, url) in images.iter().enumerate() {
                let bytes = self.fetch_bytes(url).await?;
                let path = dir.join(format!("{:04}.jpg", image_index + 1));
                tokio::fs::write(&path, &bytes).await.map_err(persist)?;
                saved += 1;
            }
            summary.images_saved += saved;
            summary.chapters_saved += 1;
            sink.log(&format!(
                "chapter {}/{}: saved {} images",
                index + 1,
                total,
                saved
            ));
        }

        self.run_after_album(plan, sink);
        sink.log(&format!(
            "saved {} of {} chapters",
            summary.chapters_saved, summary.chapters_processed
        ));
        Ok(summary)
    }

    fn cover_url(&self, album_id: &str) -> String {
        format!("{}/media/albums/{}.jpg", self.base_url, album_id)
    }
}

fn log_unsupported(name: &str, sink: &dyn ProgressSink) {
    curator_warn!("plugin {:?} has no bundled executor", name);
    sink.log(&format!("plugin {name} has no bundled executor, skipping"));
}

fn persist(err: std::io::Error) -> SourceError {
    SourceError::Persist(PersistError::Io(err))
}

fn map_transport_error(err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        return SourceError::Timeout;
    }
    SourceError::Network(err.to_string())
}

#[derive(Debug, Deserialize)]
struct AlbumPayload {
    name: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    tags: TagField,
    #[serde(default)]
    chapters: Vec<ChapterPayload>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChapterPayload {
    id: IdField,
    #[serde(default)]
    title: Option<String>,
}

/// Some source versions send tags as a list, others as one comma-delimited
/// string. Normalized here; the ambiguity never leaks past this module.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagField {
    List(Vec<String>),
    Delimited(String),
}

impl Default for TagField {
    fn default() -> Self {
        TagField::List(Vec::new())
    }
}

impl TagField {
    fn into_tags(self) -> Vec<String> {
        let raw = match self {
            TagField::List(tags) => tags,
            TagField::Delimited(joined) => joined.split(',').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect()
    }
}

/// Chapter ids arrive as strings or bare numbers depending on the source.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdField {
    Text(String),
    Number(u64),
}

impl IdField {
    fn into_string(self) -> String {
        match self {
            IdField::Text(id) => id,
            IdField::Number(id) => id.to_string(),
        }
    }
}
