pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod services;

pub use error::{AppError, Result};
