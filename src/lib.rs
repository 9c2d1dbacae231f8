pub mod app;
pub mod board;
pub mod config;
pub mod error;
pub mod form;
pub mod interchange;
pub mod reminder;
pub mod store;
pub mod task;
pub mod ui;

pub use error::{Error, Result};
