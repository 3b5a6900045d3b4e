//! Topic classification
//!
//! Raw topic codes come from the article's section link. A fixed table maps
//! codes to topics; override rows, checked first, remap selected codes to a
//! different topic and prefix the sub-topic label.

use crate::taxonomy::Topic;
use serde::Deserialize;
use std::collections::HashMap;

/// Section codes and the topic each one belongs to
const BASE_TOPICS: &[(&str, Topic)] = &[
    ("POL", Topic::Politics),
    ("ECO", Topic::Economy),
    ("SOC", Topic::Social),
    ("CUL", Topic::Culture),
    ("SCI", Topic::Science),
    ("SPO", Topic::Sports),
];

/// One remapping rule: (code, optional exact sub-topic) -> (topic, prefix)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TopicOverride {
    /// Raw section code, compared case-insensitively
    pub code: String,

    /// When set, the rule only applies to this exact sub-topic label
    #[serde(rename = "sub-topic-equals", default)]
    pub sub_topic_equals: Option<String>,

    /// Topic assigned when the rule matches
    pub topic: Topic,

    /// Text prepended to the sub-topic label
    #[serde(rename = "sub-topic-prefix", default)]
    pub sub_topic_prefix: String,
}

impl TopicOverride {
    fn matches(&self, code: &str, sub_topic: &str) -> bool {
        self.code.eq_ignore_ascii_case(code)
            && self
                .sub_topic_equals
                .as_deref()
                .map_or(true, |expected| expected == sub_topic)
    }
}

/// The built-in override rows
pub fn default_overrides() -> Vec<TopicOverride> {
    vec![
        // World desk is filed under politics
        TopicOverride {
            code: "WOR".to_string(),
            sub_topic_equals: None,
            topic: Topic::Politics,
            sub_topic_prefix: "بین‌الملل: ".to_string(),
        },
        TopicOverride {
            code: "MAR".to_string(),
            sub_topic_equals: Some("خبر بازار".to_string()),
            topic: Topic::Economy,
            sub_topic_prefix: "بازار: ".to_string(),
        },
    ]
}

/// Result of classifying one article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub topic: Topic,
    pub sub_topic: String,
}

/// Maps raw section codes to topics
#[derive(Debug, Clone)]
pub struct TopicClassifier {
    base: HashMap<String, Topic>,
    overrides: Vec<TopicOverride>,
}

impl TopicClassifier {
    /// Builds a classifier from the base table plus the given override rows
    pub fn new(overrides: Vec<TopicOverride>) -> Self {
        let base = BASE_TOPICS
            .iter()
            .map(|(code, topic)| (code.to_string(), *topic))
            .collect();

        Self { base, overrides }
    }

    /// Builds a classifier with the built-in overrides followed by `extra`
    pub fn with_extra_overrides(extra: &[TopicOverride]) -> Self {
        let mut overrides = default_overrides();
        overrides.extend_from_slice(extra);
        Self::new(overrides)
    }

    /// Classifies a raw section code and sub-topic label
    ///
    /// Returns None when the code is outside the tracked taxonomy.
    pub fn classify(&self, raw_code: &str, sub_topic: &str) -> Option<Classification> {
        let code = raw_code.trim().to_uppercase();

        if let Some(rule) = self.overrides.iter().find(|r| r.matches(&code, sub_topic)) {
            return Some(Classification {
                topic: rule.topic,
                sub_topic: format!("{}{}", rule.sub_topic_prefix, sub_topic),
            });
        }

        self.base.get(&code).map(|topic| Classification {
            topic: *topic,
            sub_topic: sub_topic.to_string(),
        })
    }
}

impl Default for TopicClassifier {
    fn default() -> Self {
        Self::new(default_overrides())
    }
}

/// Derives the raw section code from a section link
///
/// The code is the first three characters of the last non-empty path
/// segment, uppercased: `/service/Politics` gives `POL`.
pub fn topic_code_from_path(path: &str) -> Option<String> {
    let path = path.split(['?', '#']).next().unwrap_or("");
    let segment = path.split('/').filter(|s| !s.is_empty()).last()?;
    let code: String = segment.chars().take(3).collect();
    Some(code.to_uppercase())
}
