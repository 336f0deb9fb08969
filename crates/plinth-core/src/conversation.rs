//! Bot conversations.
//!
//! A conversation is a plain log entry linking an external user id to a
//! conversation id. It is not an audited record.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
  pub user_id:         String,
  pub conversation_id: String,
  pub timestamp:       DateTime<Utc>,
}

/// Append-only storage for [`Conversation`]s.
pub trait ConversationLog: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new conversation stamped with the current time.
  fn record_conversation(
    &self,
    user_id: String,
    conversation_id: String,
  ) -> impl Future<Output = Result<Conversation, Self::Error>> + Send + '_;
}
