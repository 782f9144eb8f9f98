mod catalog;
mod config;
mod database;
mod error;
mod utils;

pub use catalog::*;
pub use config::*;
pub use error::*;
pub use utils::*;

pub(crate) use database::*;
