// src/lib.rs
pub mod api;
pub mod classify;
pub mod client;
pub mod config;
pub mod form;
pub mod types;

pub use client::{FormReplayClient, Session};
pub use config::PortalConfig;
pub use types::{Coordinates, Credentials, PunchOutcome, PunchReport};
