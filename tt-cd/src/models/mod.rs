//! Data models for tt-cd (Content Delivery service)

pub mod content;
pub mod link;
pub mod recipient;
pub mod score;

pub use content::{ContentItem, UploadKind};
pub use link::{LinkStatus, TrackingLink};
pub use recipient::Recipient;
pub use score::TopicScore;
