//! Content ingestion workflow
//!
//! Each uploaded content item moves through a fixed sequence:
//! 1. Extract the package (or write inline markup) into a content-scoped
//!    directory under the content root
//! 2. Annotate interactive elements and derive topics via the tagger
//! 3. Instrument the markup with the tracking bootstrap
//! 4. Persist the servable artifact path and topic associations atomically
//!
//! Video uploads skip straight to storage; the launch player provides their
//! tracking chrome instead.

pub mod pipeline;

pub use pipeline::{IngestOutcome, IngestPipeline, UploadSource};
