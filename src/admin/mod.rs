//! Declarative admin configuration and the operations behind the admin pages

mod options;
mod site;

pub use options::*;
pub use site::*;
