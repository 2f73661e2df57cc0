//! Ingestion pipeline orchestrator
//!
//! Drives one uploaded content item from its raw source to a servable,
//! instrumented artifact:
//! - **Extract**: unpack archive uploads into a content-scoped directory and
//!   locate the entry document (raw markup is written out instead; video
//!   skips straight to storage).
//! - **Annotate**: hand the entry markup to the topic tagger. The tagger
//!   degrades to a pass-through on any failure, so this phase cannot fail
//!   the pipeline.
//! - **Instrument**: inject the tracking bootstrap before `</body>`.
//! - **Persist**: write the artifact as `launch.html`, delete the
//!   pre-annotation entry document, and record the artifact path plus topic
//!   associations in a single transaction.
//!
//! Any extraction, read, or persistence failure rolls the transaction back
//! and surfaces as an ingestion error; the content row keeps its `pending`
//! identifier so the item is visibly un-ingested.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{debug, error, info};
use tt_common::{Error, Result};

use crate::db::{content, topics};
use crate::models::UploadKind;
use crate::services::annotation_client::TopicTagger;
use crate::services::{instrumentor, package_extractor};

/// Where the bytes of an upload come from.
///
/// Upload transport (multipart parsing, temp storage) is handled upstream;
/// the pipeline only ever sees a staged file or inline markup.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// Staged file on the local filesystem (archive or video)
    File(PathBuf),
    /// Markup supplied inline with the upload request
    Markup(String),
}

/// What a completed ingestion run produced
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Artifact path relative to the content root
    pub content_identifier: String,
    /// Topics the annotation pass attributed to the content
    pub topics: Vec<String>,
}

/// Pipeline orchestrator for content ingestion
#[derive(Clone)]
pub struct IngestPipeline {
    db: SqlitePool,
    content_root: PathBuf,
    tagger: Arc<dyn TopicTagger>,
}

impl IngestPipeline {
    pub fn new(db: SqlitePool, content_root: PathBuf, tagger: Arc<dyn TopicTagger>) -> Self {
        Self {
            db,
            content_root,
            tagger,
        }
    }

    /// Run the full pipeline for one content item.
    ///
    /// On success the content row's identifier points at the servable
    /// artifact and every attributed topic has an association row. On
    /// failure no database state changes.
    pub async fn ingest(
        &self,
        content_id: i64,
        upload_type: UploadKind,
        source: UploadSource,
    ) -> Result<IngestOutcome> {
        info!(content_id, kind = %upload_type, "ingesting content");

        match self.run(content_id, upload_type, source).await {
            Ok(outcome) => {
                info!(
                    content_id,
                    identifier = %outcome.content_identifier,
                    topics = outcome.topics.len(),
                    "ingestion complete"
                );
                Ok(outcome)
            }
            Err(err) => {
                error!(content_id, error = %err, "ingestion failed");
                Err(match err {
                    // Caller mistakes keep their own variant
                    Error::InvalidInput(_) | Error::Ingestion(_) => err,
                    other => Error::Ingestion(other.to_string()),
                })
            }
        }
    }

    async fn run(
        &self,
        content_id: i64,
        upload_type: UploadKind,
        source: UploadSource,
    ) -> Result<IngestOutcome> {
        let item_dir = self.content_root.join(content_id.to_string());

        match (upload_type, source) {
            (UploadKind::Scorm | UploadKind::HtmlZip, UploadSource::File(archive)) => {
                let files = package_extractor::extract_package(&archive, &item_dir)?;
                debug!(content_id, files, "package extracted");
                let entry = package_extractor::find_entry_document(&item_dir)?;
                self.process_markup(content_id, &entry).await
            }
            (UploadKind::RawHtml, UploadSource::Markup(html)) => {
                let entry = package_extractor::write_raw_markup(&item_dir, &html)?;
                self.process_markup(content_id, &entry).await
            }
            (UploadKind::Video, UploadSource::File(video)) => {
                self.store_video(content_id, &item_dir, &video).await
            }
            (kind, _) => Err(Error::InvalidInput(format!(
                "upload kind {} cannot be ingested from the supplied source",
                kind
            ))),
        }
    }

    /// Shared path for every markup-bearing upload kind: annotate,
    /// instrument, write the artifact, then persist.
    async fn process_markup(&self, content_id: i64, entry: &Path) -> Result<IngestOutcome> {
        let markup = fs::read_to_string(entry)?;

        debug!(content_id, entry = %entry.display(), "annotating entry document");
        let tagged = self.tagger.tag(&markup).await;

        let instrumented = instrumentor::instrument_document(&tagged.html, content_id);

        let artifact = entry.with_file_name("launch.html");
        fs::write(&artifact, instrumented)?;
        // The entry document is index.html/index.htm, never launch.html,
        // so the artifact write above cannot have replaced it.
        fs::remove_file(entry)?;

        let identifier = self.relative_identifier(&artifact)?;
        self.record_artifact(content_id, &identifier, &tagged.topics)
            .await?;

        Ok(IngestOutcome {
            content_identifier: identifier,
            topics: tagged.topics,
        })
    }

    /// Video uploads are stored untouched; the player page supplies the
    /// tracking chrome at launch time instead.
    async fn store_video(
        &self,
        content_id: i64,
        item_dir: &Path,
        video: &Path,
    ) -> Result<IngestOutcome> {
        let file_name = video
            .file_name()
            .ok_or_else(|| Error::InvalidInput(format!("{} has no file name", video.display())))?;

        fs::create_dir_all(item_dir)?;
        let dest = item_dir.join(sanitize_file_name(file_name));
        fs::copy(video, &dest)?;

        let identifier = self.relative_identifier(&dest)?;
        self.record_artifact(content_id, &identifier, &[]).await?;

        Ok(IngestOutcome {
            content_identifier: identifier,
            topics: Vec::new(),
        })
    }

    /// One transaction covers the identifier update and every topic row, so
    /// a half-ingested item is never observable.
    async fn record_artifact(
        &self,
        content_id: i64,
        identifier: &str,
        topic_names: &[String],
    ) -> Result<()> {
        let mut tx = self.db.begin().await?;

        content::set_content_identifier(&mut tx, content_id, identifier).await?;
        for name in topic_names {
            let topic_id = topics::ensure_topic(&mut tx, name).await?;
            topics::associate_content_topic(&mut tx, content_id, topic_id).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    fn relative_identifier(&self, artifact: &Path) -> Result<String> {
        let relative = artifact.strip_prefix(&self.content_root).map_err(|_| {
            Error::Internal(format!(
                "artifact {} is outside the content root",
                artifact.display()
            ))
        })?;
        // The identifier doubles as a URL path under /content/
        Ok(relative.to_string_lossy().replace('\\', "/"))
    }
}

/// Strip path components and anything outside `[A-Za-z0-9._-]` from an
/// upload's file name before it lands under the content root.
fn sanitize_file_name(name: &OsStr) -> String {
    name.to_string_lossy()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
