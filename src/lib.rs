// Library root for the Registrar kernel

pub mod core;
pub mod state;
pub mod auth;
pub mod aggregate;
pub mod api;
pub mod config;
