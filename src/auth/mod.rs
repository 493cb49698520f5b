pub mod audit_logger;
pub mod auth_middleware;
pub mod credentials;
pub mod gate;
pub mod token;
