pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notion;
pub mod reader;
pub mod scheduler;
pub mod sync;
