pub mod response;
pub mod routes;

pub use response::{CheckResponse, ErrorResponse, SERVICE_INFO, ServiceInfo};
pub use routes::{AppState, create_router};
