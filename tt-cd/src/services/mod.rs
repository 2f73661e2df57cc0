//! Service modules for content ingestion and tracking

pub mod annotation_client;
pub mod event_publisher;
pub mod instrumentor;
pub mod link_lifecycle;
pub mod package_extractor;
pub mod sigv4;

pub use annotation_client::{AnnotationClient, PassthroughTagger, TaggedContent, TopicTagger};
pub use event_publisher::{run_publisher_bridge, SnsPublisher};
pub use link_lifecycle::{CompletionOutcome, LinkLifecycle};
