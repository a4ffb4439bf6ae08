//! Sable Core Types and Definitions
//!
//! This crate provides the foundational types shared by the Sable parser and
//! compiler. It includes:
//!
//! - **Values**: SassScript literal values and their operators ([`value`] module)
//! - **Style**: Output styles and source syntaxes ([`style`] module)
//! - **Selectors**: The selector model and the `@extend` algebra ([`selector`] module)
//! - **Subset map**: A multimap keyed by sets ([`subset_map::SubsetMap`])

pub mod error;
pub mod selector;
pub mod style;
pub mod subset_map;
pub mod value;

pub use error::{SelectorError, ValueError};
