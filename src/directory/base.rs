

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::models::{ChatKind, Identifier, MemberRole};


/// Structured failure reported by the messaging platform.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The identifier does not exist or is not visible to the bot.
    #[error("not found")]
    NotFound,

    /// The user is not present in the chat. A membership answer, not a fault.
    #[error("user not found")]
    UserNotFound,

    #[error("chat not found")]
    ChatNotFound,

    #[error("user_id invalid")]
    InvalidUserId,

    #[error("not enough rights")]
    NotEnoughRights,

    #[error("{description}")]
    Other { description: String },
}

impl DirectoryError {
    pub fn other(description: impl Into<String>) -> Self {
        Self::Other {
            description: description.into(),
        }
    }
}

// Bot API URLs embed the token, so the URL is stripped before formatting.
impl From<reqwest::Error> for DirectoryError {
    fn from(err: reqwest::Error) -> Self {
        Self::other(format!("HTTP request failed: {}", err.without_url()))
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatInfo {
    pub id: i64,
    pub title: Option<String>,
    pub kind: ChatKind,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
}


#[derive(Debug, Clone, PartialEq)]
pub struct MembershipRecord {
    pub role: MemberRole,
}


/// The three platform queries a membership check depends on. Bound to one bot credential.
#[async_trait]
pub trait ChatDirectory: Send + Sync {
    async fn resolve_chat(&self, chat: &Identifier) -> Result<ChatInfo, DirectoryError>;

    async fn resolve_user(&self, user: &Identifier) -> Result<UserInfo, DirectoryError>;

    async fn get_membership(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<MembershipRecord, DirectoryError>;

    fn directory_name(&self) -> &str;
}


#[async_trait]
impl ChatDirectory for Arc<dyn ChatDirectory> {
    async fn resolve_chat(&self, chat: &Identifier) -> Result<ChatInfo, DirectoryError> {
        (**self).resolve_chat(chat).await
    }

    async fn resolve_user(&self, user: &Identifier) -> Result<UserInfo, DirectoryError> {
        (**self).resolve_user(user).await
    }

    async fn get_membership(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<MembershipRecord, DirectoryError> {
        (**self).get_membership(chat_id, user_id).await
    }

    fn directory_name(&self) -> &str {
        (**self).directory_name()
    }
}


/// Hands out a [`ChatDirectory`] for the credential carried by one request.
pub trait DirectoryConnector: Send + Sync {
    fn connect(&self, credential: &str) -> Arc<dyn ChatDirectory>;
}
