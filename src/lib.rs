mod ai;
pub mod args;
pub mod commands;
mod config;
mod db;
mod error;
mod mcp;
pub mod model;
mod notify;
pub mod settle;
mod utils;

pub use ai::{DealSuggestion, ItinerarySuggestion, Mode};
pub use config::Config;
pub use error::{Error, ErrorType, Result};
pub use notify::{Change, ChangeFeed, SettlementCache, Table};
