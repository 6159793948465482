pub mod auth;
pub mod response;
pub mod viewer;

pub use auth::AuthUser;
pub use response::{ApiResponse, ApiResult};
pub use viewer::Viewer;
