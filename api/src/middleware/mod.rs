pub mod auth;
pub mod client_ip;
pub mod cors;
pub mod security;

pub use auth::{AuthContext, JwtAuth};
pub use client_ip::ClientIp;
pub use cors::create_cors;
pub use security::SecurityMiddleware;
