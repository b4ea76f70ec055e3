pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod identity_sync;
pub mod media;
pub mod posts;
pub mod social;
pub mod telemetry;
pub mod users;
pub mod utils;
