

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use super::base::{
    ChatDirectory, ChatInfo, DirectoryConnector, DirectoryError, MembershipRecord, UserInfo,
};
use crate::core::config::CheckerConfig;
use crate::core::models::{ChatKind, Identifier, MemberRole};
use crate::utils::mask_token;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<i64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawChat {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawChatMember {
    status: String,
}

impl From<RawChat> for ChatInfo {
    fn from(raw: RawChat) -> Self {
        Self {
            id: raw.id,
            title: raw.title,
            kind: raw.kind.parse().unwrap_or(ChatKind::Unknown),
        }
    }
}


/// Maps a Bot API error description onto the typed error. Exact matches only.
pub fn classify_description(description: &str) -> DirectoryError {
    match description {
        "Bad Request: chat not found" => DirectoryError::ChatNotFound,
        "Bad Request: user not found" => DirectoryError::UserNotFound,
        "Bad Request: user_id invalid" | "Bad Request: USER_ID_INVALID" => {
            DirectoryError::InvalidUserId
        }
        "Bad Request: not enough rights" | "Bad Request: member list is inaccessible" => {
            DirectoryError::NotEnoughRights
        }
        other => DirectoryError::other(other),
    }
}

fn to_lookup_error(err: DirectoryError) -> DirectoryError {
    match err {
        DirectoryError::ChatNotFound | DirectoryError::UserNotFound => DirectoryError::NotFound,
        other => other,
    }
}


pub struct TelegramClient {
    client: Client,
    base_url: Url,
    token: String,
}

impl TelegramClient {
    pub fn new(client: Client, base_url: Url, token: impl Into<String>) -> Self {
        Self {
            client,
            base_url,
            token: token.into(),
        }
    }

    fn method_url(&self, method: &str) -> Result<Url, DirectoryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DirectoryError::other("API base URL cannot carry a path"))?
            .pop_if_empty()
            .push(&format!("bot{}", self.token))
            .push(method);
        Ok(url)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, DirectoryError> {
        debug!(
            "Bot API {} {:?} (bot {})",
            method,
            query,
            mask_token(&self.token)
        );

        let response = self
            .client
            .get(self.method_url(method)?)
            .query(query)
            .send()
            .await?
            .json::<ApiResponse<T>>()
            .await?;

        match response {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse {
                description: Some(description),
                error_code,
                ..
            } => {
                debug!("Bot API {} failed ({:?}): {}", method, error_code, description);
                Err(classify_description(&description))
            }
            ApiResponse { error_code, .. } => Err(DirectoryError::other(format!(
                "Bot API {method} returned no result (error_code={error_code:?})"
            ))),
        }
    }
}

#[async_trait]
impl ChatDirectory for TelegramClient {
    async fn resolve_chat(&self, chat: &Identifier) -> Result<ChatInfo, DirectoryError> {
        let raw: RawChat = self
            .call("getChat", &[("chat_id", chat.to_string())])
            .await
            .map_err(to_lookup_error)?;
        Ok(raw.into())
    }

    async fn resolve_user(&self, user: &Identifier) -> Result<UserInfo, DirectoryError> {
        let raw: RawChat = self
            .call("getChat", &[("chat_id", user.to_string())])
            .await
            .map_err(to_lookup_error)?;

        // A username can just as well belong to a group or channel.
        if raw.kind != "private" {
            return Err(DirectoryError::NotFound);
        }
        Ok(UserInfo { id: raw.id })
    }

    async fn get_membership(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<MembershipRecord, DirectoryError> {
        let raw: RawChatMember = self
            .call(
                "getChatMember",
                &[("chat_id", chat_id.to_string()), ("user_id", user_id.to_string())],
            )
            .await?;
        Ok(MembershipRecord {
            role: MemberRole::from_status(&raw.status),
        })
    }

    fn directory_name(&self) -> &str {
        "telegram"
    }
}


/// Shares one pooled HTTP client across requests; each request gets its own token binding.
pub struct TelegramConnector {
    client: Client,
    base_url: Url,
}

impl TelegramConnector {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn from_config(config: &CheckerConfig) -> Result<Self, DirectoryError> {
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| DirectoryError::other(format!("Invalid API base URL: {e}")))?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        info!(
            "Telegram connector initialized (base_url={}, timeout={}s)",
            base_url, config.request_timeout_secs
        );
        Ok(Self::new(client, base_url))
    }
}

impl DirectoryConnector for TelegramConnector {
    fn connect(&self, credential: &str) -> Arc<dyn ChatDirectory> {
        Arc::new(TelegramClient::new(
            self.client.clone(),
            self.base_url.clone(),
            credential,
        ))
    }
}
