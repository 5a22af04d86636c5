

use std::sync::Arc;

use futures::future::join_all;
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::aggregator::{CheckReport, aggregate};
use crate::core::config::CheckerConfig;
use crate::core::error::{CheckError, Result};
use crate::core::models::{
    ChatOutcome, CheckParams, ErrorKind, Identifier, LookupFailure, LookupResult, MemberRole,
    Membership,
};
use crate::directory::{ChatDirectory, DirectoryError};

#[derive(Debug, Clone, Copy)]
enum Stage {
    Chat,
    User,
    Membership,
}


/// Fans one request out into per-target lookups and collects them in input order.
pub struct MembershipChecker {
    directory: Arc<dyn ChatDirectory>,
    semaphore: Arc<Semaphore>,
    resolve_chat_ids: bool,
}

impl MembershipChecker {
    pub fn new(directory: Arc<dyn ChatDirectory>, max_parallel: usize, resolve_chat_ids: bool) -> Self {
        Self {
            directory,
            semaphore: Arc::new(Semaphore::new(max_parallel.max(1))),
            resolve_chat_ids,
        }
    }

    pub fn from_config(directory: Arc<dyn ChatDirectory>, config: &CheckerConfig) -> Self {
        Self::new(directory, config.max_parallel_lookups, config.resolve_chat_ids)
    }

    pub async fn check(&self, params: &CheckParams) -> Result<CheckReport> {
        let outcomes = self.lookup_all(&params.subject, &params.targets).await?;
        let report = aggregate(outcomes);

        info!(
            "Membership check for {} via {}: {} ({}/{} ok)",
            params.subject,
            self.directory.directory_name(),
            report.overall_status,
            report.successful,
            report.checked
        );
        Ok(report)
    }

    /// One outcome per target, same order as `targets`. A failing target never stops the others.
    pub async fn lookup_all(
        &self,
        subject: &Identifier,
        targets: &[Identifier],
    ) -> Result<Vec<ChatOutcome>> {
        debug!("Dispatching {} lookups for {}", targets.len(), subject);
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let user_id = self.resolve_subject(subject).await;

        let handles: Vec<_> = targets
            .iter()
            .map(|target| {
                let directory = self.directory.clone();
                let semaphore = self.semaphore.clone();
                let subject = subject.clone();
                let user_id = user_id.clone();
                let target = target.clone();
                let resolve_chat_ids = self.resolve_chat_ids;

                tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| CheckError::Internal(format!("lookup pool closed: {e}")))?;
                    let result =
                        lookup_target(directory.as_ref(), &subject, user_id, &target, resolve_chat_ids)
                            .await;
                    Ok::<_, CheckError>(ChatOutcome { target, result })
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for joined in join_all(handles).await {
            let outcome =
                joined.map_err(|e| CheckError::Internal(format!("lookup task failed: {e}")))??;
            if let LookupResult::Failure(failure) = &outcome.result {
                warn!(
                    "Lookup failed for {} in {}: {} ({})",
                    subject, outcome.target, failure.kind, failure.message
                );
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Usernames are resolved once per request; a failure is reported against every target.
    async fn resolve_subject(
        &self,
        subject: &Identifier,
    ) -> std::result::Result<i64, LookupFailure> {
        match subject {
            Identifier::Id(id) => Ok(*id),
            Identifier::Username(_) => self
                .directory
                .resolve_user(subject)
                .await
                .map(|user| user.id)
                .map_err(|e| classify(e, Stage::User, subject)),
        }
    }
}

async fn lookup_target(
    directory: &dyn ChatDirectory,
    subject: &Identifier,
    user_id: std::result::Result<i64, LookupFailure>,
    target: &Identifier,
    resolve_chat_ids: bool,
) -> LookupResult {
    match try_lookup(directory, subject, user_id, target, resolve_chat_ids).await {
        Ok(membership) => LookupResult::Success(membership),
        Err(failure) => LookupResult::Failure(failure),
    }
}

async fn try_lookup(
    directory: &dyn ChatDirectory,
    subject: &Identifier,
    user_id: std::result::Result<i64, LookupFailure>,
    target: &Identifier,
    resolve_chat_ids: bool,
) -> std::result::Result<Membership, LookupFailure> {
    let (chat_id, chat) = match target {
        Identifier::Id(id) if !resolve_chat_ids => (*id, None),
        _ => {
            let info = directory
                .resolve_chat(target)
                .await
                .map_err(|e| classify(e, Stage::Chat, subject))?;
            (info.id, Some(info))
        }
    };

    if let Some(info) = &chat {
        if !info.kind.is_aggregate() {
            return Err(LookupFailure {
                kind: ErrorKind::UnsupportedChatType,
                message: format!("Chat type '{}' has no membership to check", info.kind),
                details: json!({
                    "chat_type": info.kind,
                    "supported_types": ["channel", "supergroup", "group"],
                }),
            });
        }
    }

    // Chat failures take precedence over an unresolvable subject.
    let user_id = user_id?;

    let role = match directory.get_membership(chat_id, user_id).await {
        Ok(record) => record.role,
        Err(DirectoryError::UserNotFound) => MemberRole::NonMember,
        Err(e) => return Err(classify(e, Stage::Membership, subject)),
    };

    Ok(Membership {
        chat_title: chat.as_ref().and_then(|c| c.title.clone()),
        chat_type: chat.as_ref().map(|c| c.kind),
        role,
    })
}

fn classify(
    err: DirectoryError,
    stage: Stage,
    subject: &Identifier,
) -> LookupFailure {
    let (kind, message, details) = match (err, stage) {
        (DirectoryError::NotFound | DirectoryError::ChatNotFound, Stage::Chat)
        | (DirectoryError::ChatNotFound, _) => (
            ErrorKind::ChatNotFound,
            "The specified chat/channel was not found".to_string(),
            json!({
                "possible_reasons": [
                    "Bot is not a member of this chat",
                    "Chat ID is invalid",
                    "Chat does not exist",
                ]
            }),
        ),
        (DirectoryError::NotFound | DirectoryError::UserNotFound, _) => (
            ErrorKind::UserNotFound,
            "The specified user could not be resolved".to_string(),
            json!({ "provided_user": subject.to_string() }),
        ),
        (DirectoryError::InvalidUserId, _) => (
            ErrorKind::InvalidUserId,
            "The provided user ID is invalid".to_string(),
            json!({
                "provided_user_id": subject.to_string(),
                "expected_format": "Telegram user ID (number) or @username",
            }),
        ),
        (DirectoryError::NotEnoughRights, _) => (
            ErrorKind::InsufficientRights,
            "Bot does not have sufficient rights in this chat".to_string(),
            json!({
                "required_rights": "Bot must be a member with admin privileges to check membership"
            }),
        ),
        (DirectoryError::Other { description }, _) => (
            ErrorKind::UnknownError,
            description.clone(),
            json!({ "error_description": description }),
        ),
    };

    debug!("Classified {:?} failure for {} as {}", stage, subject, kind);
    LookupFailure {
        kind,
        message,
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ChatKind;
    use crate::core::services::aggregator::OverallStatus;
    use crate::directory::InMemoryDirectory;

    fn username(name: &str) -> Identifier {
        Identifier::Username(name.to_string())
    }

    fn checker(directory: InMemoryDirectory) -> (Arc<InMemoryDirectory>, MembershipChecker) {
        let directory = Arc::new(directory);
        let checker = MembershipChecker::new(directory.clone(), 4, true);
        (directory, checker)
    }

    fn params(subject: Identifier, targets: Vec<Identifier>) -> CheckParams {
        CheckParams {
            credential: "123:abc".to_string(),
            subject,
            targets,
        }
    }

    fn success(outcome: &ChatOutcome) -> &Membership {
        match &outcome.result {
            LookupResult::Success(m) => m,
            LookupResult::Failure(f) => panic!("expected success, got {:?}", f),
        }
    }

    fn failure(outcome: &ChatOutcome) -> &LookupFailure {
        match &outcome.result {
            LookupResult::Failure(f) => f,
            LookupResult::Success(m) => panic!("expected failure, got {:?}", m),
        }
    }

    #[tokio::test]
    async fn test_partial_success_example() {
        let (_, checker) = checker(
            InMemoryDirectory::new()
                .with_chat(-1, Some("@alpha"), "Alpha", ChatKind::Channel)
                .with_member(-1, 123, "member"),
        );

        let report = checker
            .check(&params(
                Identifier::Id(123),
                vec![username("@alpha"), username("@beta")],
            ))
            .await
            .unwrap();

        assert_eq!(report.overall_status, OverallStatus::PartialSuccess);
        assert_eq!((report.checked, report.successful, report.failed), (2, 1, 1));

        let alpha = success(&report.outcomes[0]);
        assert_eq!(alpha.role, MemberRole::Member);
        assert_eq!(alpha.chat_title.as_deref(), Some("Alpha"));
        assert!(alpha.is_member() && !alpha.is_admin());

        assert_eq!(report.outcomes[1].target, username("@beta"));
        assert_eq!(failure(&report.outcomes[1]).kind, ErrorKind::ChatNotFound);
    }

    #[tokio::test]
    async fn test_creator_is_member_and_admin() {
        let (_, checker) = checker(
            InMemoryDirectory::new()
                .with_chat(-5, None, "Five", ChatKind::Supergroup)
                .with_member(-5, 9, "creator"),
        );
        let outcomes = checker
            .lookup_all(&Identifier::Id(9), &[Identifier::Id(-5)])
            .await
            .unwrap();
        let membership = success(&outcomes[0]);
        assert!(membership.is_member());
        assert!(membership.is_admin());
        assert_eq!(membership.chat_type, Some(ChatKind::Supergroup));
    }

    #[tokio::test]
    async fn test_user_not_in_chat_is_domain_success() {
        let (_, checker) = checker(
            InMemoryDirectory::new().with_chat(-5, Some("@five"), "Five", ChatKind::Group),
        );
        let outcomes = checker
            .lookup_all(&Identifier::Id(77), &[username("@five")])
            .await
            .unwrap();
        let membership = success(&outcomes[0]);
        assert_eq!(membership.role, MemberRole::NonMember);
        assert_eq!(membership.role.as_str(), "non_member");
        assert!(!membership.is_member());
    }

    #[tokio::test]
    async fn test_order_and_duplicates_preserved() {
        let (directory, checker) = checker(
            InMemoryDirectory::new()
                .with_chat(-1, Some("@a"), "A", ChatKind::Channel)
                .with_chat(-2, Some("@b"), "B", ChatKind::Channel)
                .with_member(-1, 1, "member")
                .with_member(-2, 1, "administrator"),
        );
        let targets = vec![
            username("@b"),
            username("@a"),
            username("@missing"),
            username("@b"),
            Identifier::Id(-1),
        ];
        let outcomes = checker
            .lookup_all(&Identifier::Id(1), &targets)
            .await
            .unwrap();

        assert_eq!(outcomes.len(), targets.len());
        let order: Vec<_> = outcomes.iter().map(|o| o.target.clone()).collect();
        assert_eq!(order, targets);
        assert_eq!(outcomes[0], outcomes[3]);
        assert!(!outcomes[2].result.is_success());

        // 4 resolvable targets x (chat + membership) + 1 failed resolution
        assert_eq!(directory.call_count(), 9);
    }

    #[tokio::test]
    async fn test_private_chat_rejected() {
        let (directory, checker) = checker(
            InMemoryDirectory::new().with_chat(55, Some("@someone"), "Someone", ChatKind::Private),
        );
        let outcomes = checker
            .lookup_all(&Identifier::Id(1), &[username("@someone")])
            .await
            .unwrap();
        assert_eq!(failure(&outcomes[0]).kind, ErrorKind::UnsupportedChatType);
        assert_eq!(directory.call_count(), 1);
    }

    #[tokio::test]
    async fn test_subject_username_resolved() {
        let (_, checker) = checker(
            InMemoryDirectory::new()
                .with_chat(-1, Some("@a"), "A", ChatKind::Channel)
                .with_user("@bob", 7)
                .with_member(-1, 7, "administrator"),
        );
        let outcomes = checker
            .lookup_all(&username("@bob"), &[username("@a")])
            .await
            .unwrap();
        assert_eq!(success(&outcomes[0]).role, MemberRole::Administrator);
    }

    #[tokio::test]
    async fn test_username_subject_resolved_once() {
        let (directory, checker) = checker(
            InMemoryDirectory::new()
                .with_chat(-1, Some("@a"), "A", ChatKind::Channel)
                .with_chat(-2, Some("@b"), "B", ChatKind::Channel)
                .with_user("@bob", 7)
                .with_member(-1, 7, "member"),
        );
        let targets = vec![username("@a"), username("@b"), username("@a")];
        let outcomes = checker
            .lookup_all(&username("@bob"), &targets)
            .await
            .unwrap();

        assert!(outcomes.iter().all(|o| o.result.is_success()));
        // 1 user resolution + 3 x (chat + membership)
        assert_eq!(directory.call_count(), 7);
    }

    #[tokio::test]
    async fn test_missing_chat_reported_before_unresolvable_subject() {
        let (_, checker) = checker(
            InMemoryDirectory::new().with_chat(-1, Some("@a"), "A", ChatKind::Channel),
        );
        let outcomes = checker
            .lookup_all(&username("@ghost"), &[username("@nope"), username("@a")])
            .await
            .unwrap();
        assert_eq!(failure(&outcomes[0]).kind, ErrorKind::ChatNotFound);
        assert_eq!(failure(&outcomes[1]).kind, ErrorKind::UserNotFound);
        assert_eq!(failure(&outcomes[1]).details["provided_user"], "@ghost");
    }

    #[tokio::test]
    async fn test_unresolvable_subject_fails_per_target() {
        let (_, checker) = checker(
            InMemoryDirectory::new()
                .with_chat(-1, Some("@a"), "A", ChatKind::Channel)
                .with_chat(-2, Some("@b"), "B", ChatKind::Channel),
        );
        let outcomes = checker
            .lookup_all(&username("@ghost"), &[username("@a"), username("@b")])
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 2);
        for outcome in &outcomes {
            assert_eq!(failure(outcome).kind, ErrorKind::UserNotFound);
        }
    }

    #[tokio::test]
    async fn test_membership_errors_classified() {
        let (_, checker) = checker(
            InMemoryDirectory::new()
                .with_chat(-1, None, "A", ChatKind::Channel)
                .with_chat(-2, None, "B", ChatKind::Channel)
                .with_chat(-3, None, "C", ChatKind::Channel)
                .with_chat(-4, None, "D", ChatKind::Channel)
                .with_membership_error(-1, DirectoryError::NotEnoughRights)
                .with_membership_error(-2, DirectoryError::InvalidUserId)
                .with_membership_error(-3, DirectoryError::other("Too Many Requests: retry after 5"))
                .with_membership_error(-4, DirectoryError::ChatNotFound),
        );
        let targets: Vec<_> = (1..=4).map(|i| Identifier::Id(-i)).collect();
        let report = checker
            .check(&params(Identifier::Id(1), targets))
            .await
            .unwrap();

        let kinds: Vec<_> = report
            .outcomes
            .iter()
            .map(|o| failure(o).kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                ErrorKind::InsufficientRights,
                ErrorKind::InvalidUserId,
                ErrorKind::UnknownError,
                ErrorKind::ChatNotFound,
            ]
        );
        assert_eq!(
            failure(&report.outcomes[2]).message,
            "Too Many Requests: retry after 5"
        );
        assert_eq!(report.overall_status, OverallStatus::Error);
    }

    #[tokio::test]
    async fn test_numeric_targets_skip_resolution_when_disabled() {
        let directory = Arc::new(
            InMemoryDirectory::new()
                .with_chat(-1, None, "A", ChatKind::Channel)
                .with_member(-1, 3, "member"),
        );
        let checker = MembershipChecker::new(directory.clone(), 2, false);
        let outcomes = checker
            .lookup_all(&Identifier::Id(3), &[Identifier::Id(-1)])
            .await
            .unwrap();

        let membership = success(&outcomes[0]);
        assert!(membership.is_member());
        assert_eq!(membership.chat_title, None);
        assert_eq!(membership.chat_type, None);
        assert_eq!(directory.call_count(), 1);
    }

    #[tokio::test]
    async fn test_repeated_check_is_idempotent() {
        let (_, checker) = checker(
            InMemoryDirectory::new()
                .with_chat(-1, Some("@a"), "A", ChatKind::Channel)
                .with_member(-1, 1, "restricted"),
        );
        let request = params(Identifier::Id(1), vec![username("@a"), username("@zz")]);
        let first = checker.check(&request).await.unwrap();
        let second = checker.check(&request).await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_classify_chat_stage_not_found() {
        let failure = classify(
            DirectoryError::NotFound,
            Stage::Chat,
            &Identifier::Id(1),
        );
        assert_eq!(failure.kind, ErrorKind::ChatNotFound);
        assert!(failure.details["possible_reasons"].is_array());
    }

    #[test]
    fn test_classify_user_stage_not_found() {
        let failure = classify(
            DirectoryError::NotFound,
            Stage::User,
            &username("@ghost"),
        );
        assert_eq!(failure.kind, ErrorKind::UserNotFound);
        assert_eq!(failure.details["provided_user"], "@ghost");
    }
}
