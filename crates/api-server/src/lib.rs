#![warn(clippy::unwrap_used)]

pub mod rest;
pub mod server;
pub mod service;

pub use server::ApiServer;
pub use service::RotationService;
