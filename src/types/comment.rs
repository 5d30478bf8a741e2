//! Comments attached to charts and graph nodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::UserId;

/// A user comment, optionally carrying an attachment reference.
///
/// The same shape is embedded at the chart level and inside graph nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Identity of the comment author.
    pub author: UserId,
    /// Free-text body.
    pub text: String,
    /// Opaque reference to an uploaded attachment, if any.
    pub attachment: Option<String>,
    /// When the comment was posted.
    pub posted_at: DateTime<Utc>,
}

impl Comment {
    /// Create a comment with no attachment, timestamped now.
    pub fn new(author: UserId, text: impl Into<String>) -> Self {
        Self {
            author,
            text: text.into(),
            attachment: None,
            posted_at: Utc::now(),
        }
    }

    /// Attach an uploaded resource reference.
    pub fn with_attachment(mut self, attachment: impl Into<String>) -> Self {
        self.attachment = Some(attachment.into());
        self
    }
}
