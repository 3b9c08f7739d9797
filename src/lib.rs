// Core infrastructure modules
pub mod core;

// Feature-specific modules
pub mod assertion;
pub mod config;
pub mod keywords;
pub mod repl;
pub mod script;

pub use crate::core::{DbAssertError, Result};
pub use keywords::{Keyword, KeywordLibrary, KeywordOutput};

#[cfg(test)]
mod test_utils;
