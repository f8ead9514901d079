//! URL handling module
//!
//! This module provides URL normalization and host extraction. Normalized URLs
//! are the unique keys of the content store, and host equality is the
//! same-domain filter applied to discovered links.

mod domain;
mod normalize;

pub use domain::{extract_domain, is_same_host};
pub use normalize::normalize_url;
