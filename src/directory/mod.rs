pub mod base;
pub mod memory;
pub mod telegram;

pub use base::{
    ChatDirectory, ChatInfo, DirectoryConnector, DirectoryError, MembershipRecord, UserInfo,
};
pub use memory::{InMemoryConnector, InMemoryDirectory};
pub use telegram::{TelegramClient, TelegramConnector};
