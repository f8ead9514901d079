//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageStatus`: Status of a stored page (pending, crawled, error)
//! - `DomainState`: Per-host request timing used for rate limiting

mod domain_state;
mod page_status;

pub use domain_state::DomainState;
pub use page_status::PageStatus;
