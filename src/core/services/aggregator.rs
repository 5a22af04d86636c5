

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::core::models::{ChatOutcome, LookupResult};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OverallStatus {
    Success,
    PartialSuccess,
    Error,
}


#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub overall_status: OverallStatus,
    pub checked: usize,
    pub successful: usize,
    pub failed: usize,
    /// Every target answered and every answer was "member".
    pub is_member_in_all: bool,
    pub outcomes: Vec<ChatOutcome>,
}

impl CheckReport {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ChatOutcome> {
        self.outcomes.iter().filter(|o| !o.result.is_success())
    }
}


pub fn aggregate(outcomes: Vec<ChatOutcome>) -> CheckReport {
    let checked = outcomes.len();
    let successful = outcomes.iter().filter(|o| o.result.is_success()).count();
    let failed = checked - successful;

    let overall_status = if failed == 0 {
        OverallStatus::Success
    } else if failed == checked {
        OverallStatus::Error
    } else {
        OverallStatus::PartialSuccess
    };

    let is_member_in_all = failed == 0
        && outcomes.iter().all(|o| match &o.result {
            LookupResult::Success(membership) => membership.is_member(),
            LookupResult::Failure(_) => false,
        });

    CheckReport {
        overall_status,
        checked,
        successful,
        failed,
        is_member_in_all,
        outcomes,
    }
}
