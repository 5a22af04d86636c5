pub mod core;
pub mod directory;
pub mod http;
pub mod utils;

pub use crate::utils::{mask_token, split_list};

pub use crate::core::config::CheckerConfig;
pub use crate::core::error::{CheckError, Result};
pub use crate::core::models::{
    ChatKind, ChatOutcome, CheckParams, ErrorKind, Identifier, LookupFailure, LookupResult,
    MemberRole, Membership,
};
pub use crate::core::services::aggregator::{CheckReport, OverallStatus, aggregate};
pub use crate::core::services::executor::MembershipChecker;
pub use crate::directory::{ChatDirectory, DirectoryConnector, DirectoryError};
pub use crate::http::{AppState, create_router};


pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";


pub const DEFAULT_HOST: &str = "0.0.0.0";


pub const DEFAULT_PORT: u16 = 3000;


pub const DEFAULT_MAX_PARALLEL_LOOKUPS: usize = 8;


pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
