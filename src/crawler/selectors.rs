//! Compiled page selectors

use crate::config::SelectorConfig;
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;

/// Path pattern of an article link; the capture is the article id
pub const NEWS_PATH_PATTERN: &str = r"/news/(\d+)/";

/// Selectors from [`SelectorConfig`], parsed once per run
#[derive(Debug, Clone)]
pub struct PageSelectors {
    pub listing_link: Selector,
    pub news_path: Regex,
    pub title: Selector,
    pub body: Selector,
    pub summary: Selector,
    pub author: Selector,
    pub author_position: usize,
    pub sub_topic: Selector,
    pub topic_link: Selector,
    pub published: Selector,
}

impl PageSelectors {
    pub fn compile(config: &SelectorConfig) -> Result<Self, ConfigError> {
        let news_path = Regex::new(NEWS_PATH_PATTERN)
            .map_err(|e| ConfigError::Validation(format!("news path pattern: {}", e)))?;

        Ok(Self {
            listing_link: parse(&config.listing_link)?,
            news_path,
            title: parse(&config.title)?,
            body: parse(&config.body)?,
            summary: parse(&config.summary)?,
            author: parse(&config.author)?,
            author_position: config.author_position,
            sub_topic: parse(&config.sub_topic)?,
            topic_link: parse(&config.topic_link)?,
            published: parse(&config.published)?,
        })
    }
}

fn parse(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}
