pub mod aggregator;
pub mod executor;
pub mod normalizer;

pub use aggregator::{CheckReport, OverallStatus, aggregate};
pub use executor::MembershipChecker;
pub use normalizer::RawParams;
