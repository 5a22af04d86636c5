use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString, IntoStaticStr};

lazy_static! {
    static ref USERNAME_PATTERN: Regex = Regex::new(r"^@[A-Za-z0-9_]{1,64}$").unwrap();
}


/// A chat or user reference as the caller supplied it: numeric id or `@username`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Identifier {
    Id(i64),
    Username(String),
}

impl Identifier {
    /// Returns `None` for anything that is neither an integer nor a well-formed `@username`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(id) = raw.parse::<i64>() {
            return Some(Self::Id(id));
        }
        if USERNAME_PATTERN.is_match(raw) {
            return Some(Self::Username(raw.to_string()));
        }
        None
    }

    pub fn is_username(&self) -> bool {
        matches!(self, Self::Username(_))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Username(name) => f.write_str(name),
        }
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckParams {
    pub credential: String,
    pub subject: Identifier,
    pub targets: Vec<Identifier>,
}


#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
    Unknown,
}

impl ChatKind {
    /// Membership only makes sense for shared chats; private dialogs are out of scope.
    pub fn is_aggregate(self) -> bool {
        matches!(self, Self::Group | Self::Supergroup | Self::Channel)
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberRole {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
    NonMember,
    Other(String),
}

impl MemberRole {
    pub fn from_status(status: &str) -> Self {
        match status {
            "creator" | "owner" => Self::Creator,
            "administrator" => Self::Administrator,
            "member" => Self::Member,
            "restricted" => Self::Restricted,
            "left" => Self::Left,
            "kicked" => Self::Kicked,
            "non_member" => Self::NonMember,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Creator => "creator",
            Self::Administrator => "administrator",
            Self::Member => "member",
            Self::Restricted => "restricted",
            Self::Left => "left",
            Self::Kicked => "kicked",
            Self::NonMember => "non_member",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_member(&self) -> bool {
        matches!(self, Self::Creator | Self::Administrator | Self::Member)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Creator | Self::Administrator)
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


/// Per-target failure taxonomy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ChatNotFound,
    UserNotFound,
    InvalidUserId,
    InsufficientRights,
    UnsupportedChatType,
    UnknownError,
}


#[derive(Debug, Clone, PartialEq)]
pub struct Membership {
    pub chat_title: Option<String>,
    pub chat_type: Option<ChatKind>,
    pub role: MemberRole,
}

impl Membership {
    pub fn is_member(&self) -> bool {
        self.role.is_member()
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct LookupFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Value,
}


#[derive(Debug, Clone, PartialEq)]
pub enum LookupResult {
    Success(Membership),
    Failure(LookupFailure),
}

impl LookupResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct ChatOutcome {
    pub target: Identifier,
    pub result: LookupResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_parse_numeric() {
        assert_eq!(Identifier::parse("123"), Some(Identifier::Id(123)));
        assert_eq!(
            Identifier::parse(" -1001234567890 "),
            Some(Identifier::Id(-1001234567890))
        );
    }

    #[test]
    fn test_identifier_parse_username() {
        assert_eq!(
            Identifier::parse("@alpha_chan"),
            Some(Identifier::Username("@alpha_chan".to_string()))
        );
        assert!(Identifier::parse("@alpha").unwrap().is_username());
    }

    #[test]
    fn test_identifier_parse_rejects_garbage() {
        assert_eq!(Identifier::parse(""), None);
        assert_eq!(Identifier::parse("   "), None);
        assert_eq!(Identifier::parse("alpha"), None);
        assert_eq!(Identifier::parse("@"), None);
        assert_eq!(Identifier::parse("@bad name"), None);
        assert_eq!(Identifier::parse("12abc"), None);
    }

    #[test]
    fn test_identifier_display() {
        assert_eq!(Identifier::Id(-42).to_string(), "-42");
        assert_eq!(Identifier::Username("@beta".into()).to_string(), "@beta");
    }

    #[test]
    fn test_identifier_serializes_as_given() {
        assert_eq!(serde_json::to_value(Identifier::Id(123)).unwrap(), serde_json::json!(123));
        assert_eq!(
            serde_json::to_value(Identifier::Username("@bob".into())).unwrap(),
            serde_json::json!("@bob")
        );
    }

    #[test]
    fn test_role_flags() {
        let creator = MemberRole::from_status("creator");
        assert!(creator.is_member() && creator.is_admin());

        let owner = MemberRole::from_status("owner");
        assert_eq!(owner, MemberRole::Creator);

        let admin = MemberRole::from_status("administrator");
        assert!(admin.is_member() && admin.is_admin());

        let member = MemberRole::from_status("member");
        assert!(member.is_member() && !member.is_admin());

        for status in ["restricted", "left", "kicked", "non_member"] {
            let role = MemberRole::from_status(status);
            assert!(!role.is_member(), "{status} should not count as member");
            assert!(!role.is_admin());
        }
    }

    #[test]
    fn test_unknown_role_passes_through() {
        let role = MemberRole::from_status("guest");
        assert_eq!(role, MemberRole::Other("guest".to_string()));
        assert_eq!(role.as_str(), "guest");
        assert!(!role.is_member());
        assert!(!role.is_admin());
    }

    #[test]
    fn test_chat_kind_parse() {
        assert_eq!("supergroup".parse::<ChatKind>().unwrap(), ChatKind::Supergroup);
        assert_eq!(ChatKind::Channel.to_string(), "channel");
        assert!(ChatKind::Group.is_aggregate());
        assert!(!ChatKind::Private.is_aggregate());
        assert!(!ChatKind::Unknown.is_aggregate());
        assert!("bogus".parse::<ChatKind>().is_err());
    }

    #[test]
    fn test_error_kind_names() {
        assert_eq!(ErrorKind::ChatNotFound.to_string(), "CHAT_NOT_FOUND");
        assert_eq!(ErrorKind::InsufficientRights.to_string(), "INSUFFICIENT_RIGHTS");
        let name: &'static str = ErrorKind::UnknownError.into();
        assert_eq!(name, "UNKNOWN_ERROR");
        assert_eq!(
            serde_json::to_value(ErrorKind::InvalidUserId).unwrap(),
            serde_json::json!("INVALID_USER_ID")
        );
    }
}
