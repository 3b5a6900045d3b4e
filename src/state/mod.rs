//! State module for tracking traversal progress
//!
//! # Components
//!
//! - `CrawlCursor`: current date, page and exhaustion flags of a run
//! - `CrawlPhase`: the traversal state machine's phases (listing, dispatching, done)
//! - `DoneReason`: why a traversal reached its terminal phase

mod cursor;

pub use cursor::{CrawlCursor, CrawlPhase, DoneReason};
