pub mod categorization;
pub mod config;
pub mod events;
pub mod import;
pub mod models;
pub mod ports;
pub mod storage;
pub mod submission;
pub mod types;
