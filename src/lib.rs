pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod models;
pub mod services;
pub mod session;

pub use config::{config, ClientConfig};
pub use error::{ExportError, GatewayError, SessionError};
pub use gateway::{ApiRequest, ApiResponse, RequestGateway};
pub use services::Services;
pub use session::{Profile, SessionManager};
