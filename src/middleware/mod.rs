pub mod auth;
pub mod response;

pub use auth::{caller_middleware, Claims, TokenVerifier};
pub use response::{ApiResponse, ApiResult};
