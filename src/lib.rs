//! Questions with publication times, choices with vote counters, and the
//! admin surface that edits them.
//!
//! ```no_run
//! use chrono::Utc;
//! use poll_catalog::{Catalog, Config};
//!
//! # async fn run() -> Result<(), poll_catalog::Error> {
//! let catalog = Catalog::open(&Config::load().await?).await?;
//!
//! for question in catalog.index(Utc::now()).await? {
//!     println!("{question}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod admin;
mod common;

pub use common::*;
