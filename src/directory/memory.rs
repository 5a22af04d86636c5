

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::base::{
    ChatDirectory, ChatInfo, DirectoryConnector, DirectoryError, MembershipRecord, UserInfo,
};
use crate::core::models::{ChatKind, Identifier, MemberRole};


/// In-memory platform directory. Immutable once built; counts every query it answers.
#[derive(Default)]
pub struct InMemoryDirectory {
    chats: HashMap<Identifier, ChatInfo>,
    users: HashMap<String, i64>,
    members: HashMap<(i64, i64), MemberRole>,
    membership_errors: HashMap<i64, DirectoryError>,
    calls: AtomicUsize,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a chat under its numeric id and, if given, its `@username`.
    pub fn with_chat(
        mut self,
        id: i64,
        username: Option<&str>,
        title: &str,
        kind: ChatKind,
    ) -> Self {
        let info = ChatInfo {
            id,
            title: Some(title.to_string()),
            kind,
        };
        if let Some(name) = username {
            self.chats
                .insert(Identifier::Username(name.to_string()), info.clone());
        }
        self.chats.insert(Identifier::Id(id), info);
        self
    }

    pub fn with_user(mut self, username: &str, id: i64) -> Self {
        self.users.insert(username.to_string(), id);
        self
    }

    pub fn with_member(mut self, chat_id: i64, user_id: i64, status: &str) -> Self {
        self.members
            .insert((chat_id, user_id), MemberRole::from_status(status));
        self
    }

    /// Every membership query against `chat_id` fails with `error`.
    pub fn with_membership_error(mut self, chat_id: i64, error: DirectoryError) -> Self {
        self.membership_errors.insert(chat_id, error);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatDirectory for InMemoryDirectory {
    async fn resolve_chat(&self, chat: &Identifier) -> Result<ChatInfo, DirectoryError> {
        self.record_call();
        self.chats.get(chat).cloned().ok_or(DirectoryError::NotFound)
    }

    async fn resolve_user(&self, user: &Identifier) -> Result<UserInfo, DirectoryError> {
        self.record_call();
        match user {
            Identifier::Id(id) => Ok(UserInfo { id: *id }),
            Identifier::Username(name) => self
                .users
                .get(name)
                .map(|id| UserInfo { id: *id })
                .ok_or(DirectoryError::NotFound),
        }
    }

    async fn get_membership(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<MembershipRecord, DirectoryError> {
        self.record_call();
        if let Some(err) = self.membership_errors.get(&chat_id) {
            return Err(err.clone());
        }
        if !self.chats.contains_key(&Identifier::Id(chat_id)) {
            return Err(DirectoryError::ChatNotFound);
        }
        self.members
            .get(&(chat_id, user_id))
            .cloned()
            .map(|role| MembershipRecord { role })
            .ok_or(DirectoryError::UserNotFound)
    }

    fn directory_name(&self) -> &str {
        "memory"
    }
}


/// Serves the same [`InMemoryDirectory`] for every credential and counts connections.
pub struct InMemoryConnector {
    directory: Arc<InMemoryDirectory>,
    connections: AtomicUsize,
}

impl InMemoryConnector {
    pub fn new(directory: InMemoryDirectory) -> Self {
        Self {
            directory: Arc::new(directory),
            connections: AtomicUsize::new(0),
        }
    }

    pub fn directory(&self) -> &InMemoryDirectory {
        &self.directory
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl DirectoryConnector for InMemoryConnector {
    fn connect(&self, _credential: &str) -> Arc<dyn ChatDirectory> {
        self.connections.fetch_add(1, Ordering::SeqCst);
        self.directory.clone()
    }
}
