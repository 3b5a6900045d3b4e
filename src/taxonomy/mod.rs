//! Topic taxonomy and classification
//!
//! # Components
//!
//! - `Topic`: the normalized topics articles are filed under
//! - `TopicClassifier`: base code table plus table-driven override rows
//! - `topic_code_from_path`: derives the raw section code from a section link

mod classifier;
mod topic;

pub use classifier::{
    default_overrides, topic_code_from_path, Classification, TopicClassifier, TopicOverride,
};
pub use topic::Topic;
