pub mod app;
pub mod assistant_client;
pub mod config;
pub mod db;
pub mod polar_client;
pub mod setup;
pub mod transcript_client;
