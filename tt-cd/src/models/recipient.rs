//! Recipient model
//!
//! Recipient management itself lives outside this service; rows are read
//! here only to validate link creation and to render the launch page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A person who receives launch links
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub id: i64,
    pub account_id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

impl Recipient {
    /// Display name for the launch page, falling back to the email address
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        if full.trim().is_empty() {
            self.email.clone()
        } else {
            full.trim().to_string()
        }
    }
}
