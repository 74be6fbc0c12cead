//! Theme engine and template rendering.
//!
//! Provides Tera-based page rendering with the filters the catalogue
//! templates use.

mod engine;

pub use engine::ThemeEngine;
