pub mod cli;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod mock;
pub mod notify;
pub mod render;
pub mod scheduler;
pub mod scrape;
pub mod store;
pub mod tag;

pub use error::{Result, TagwatchError};
