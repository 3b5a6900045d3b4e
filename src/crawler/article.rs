//! Article page extraction
//!
//! Turns a fetched article page into an [`ArticleRecord`], or explains why
//! the page cannot become one.

use crate::calendar::{JalaliDate, TargetDateSet};
use crate::crawler::{ArticleReference, PageSelectors};
use crate::storage::{ArticleRecord, SUB_TOPIC_MAX_CHARS, TITLE_MAX_CHARS};
use crate::taxonomy::{topic_code_from_path, TopicClassifier};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Why an article page was not turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("unparseable published timestamp '{0}'")]
    BadTimestamp(String),

    #[error("topic code '{0}' is outside the tracked taxonomy")]
    UnknownTopic(String),

    #[error("published {0}, outside the target dates")]
    OutsideTargetDates(DateTime<FixedOffset>),
}

/// Inputs shared by every extraction in a run
#[derive(Debug, Clone)]
pub struct ExtractionContext<'a> {
    pub selectors: &'a PageSelectors,
    pub classifier: &'a TopicClassifier,
    pub source_name: &'a str,
    pub timezone: FixedOffset,
    pub targets: &'a TargetDateSet,
}

/// Extracts and classifies one article page
///
/// The publication day is checked first: a page from outside the target
/// dates is reported as such even when the rest of it is unusable.
pub fn extract_article(
    html: &str,
    reference: &ArticleReference,
    ctx: &ExtractionContext<'_>,
) -> Result<ArticleRecord, SkipReason> {
    let document = Html::parse_document(html);
    let selectors = ctx.selectors;

    let published = document
        .select(&selectors.published)
        .find_map(|element| element.value().attr("content"))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(SkipReason::MissingField("published"))?;
    let published_at = parse_published(published, ctx.timezone)
        .ok_or_else(|| SkipReason::BadTimestamp(published.to_string()))?;
    let in_range = published_native_date(&published_at, ctx.timezone)
        .map_or(false, |date| ctx.targets.contains(&date));
    if !in_range {
        return Err(SkipReason::OutsideTargetDates(published_at));
    }

    let title =
        first_text(&document, &selectors.title).ok_or(SkipReason::MissingField("title"))?;

    let body_text = document
        .select(&selectors.body)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if body_text.is_empty() {
        return Err(SkipReason::MissingField("body"));
    }

    let topic_href = document
        .select(&selectors.topic_link)
        .find_map(|element| element.value().attr("href"))
        .ok_or(SkipReason::MissingField("topic"))?;
    let topic_code = section_code(topic_href, &reference.url)
        .ok_or(SkipReason::MissingField("topic"))?;

    let summary = first_text(&document, &selectors.summary).unwrap_or_default();
    let author_code = document
        .select(&selectors.author)
        .nth(selectors.author_position)
        .map(element_text)
        .unwrap_or_default();
    let raw_sub_topic = first_text(&document, &selectors.sub_topic).unwrap_or_default();

    let classification = ctx
        .classifier
        .classify(&topic_code, &raw_sub_topic)
        .ok_or_else(|| SkipReason::UnknownTopic(topic_code.clone()))?;

    Ok(ArticleRecord {
        source_name: ctx.source_name.to_string(),
        article_id: reference.article_id.clone(),
        title: truncate_chars(&title, TITLE_MAX_CHARS),
        body_text,
        summary,
        published_at,
        topic: classification.topic,
        sub_topic: truncate_chars(&classification.sub_topic, SUB_TOPIC_MAX_CHARS),
        author_code,
        canonical_url: reference.url.clone(),
    })
}

/// The archive-calendar day an article was published on
pub fn published_native_date(
    published_at: &DateTime<FixedOffset>,
    timezone: FixedOffset,
) -> Option<JalaliDate> {
    JalaliDate::from_gregorian(published_at.with_timezone(&timezone).date_naive())
}

/// Parses an RFC 3339 timestamp; one without an offset is read in `timezone`
pub fn parse_published(value: &str, timezone: FixedOffset) -> Option<DateTime<FixedOffset>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed);
    }

    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .and_then(|naive| timezone.from_local_datetime(&naive).single())
}

/// Keeps at most `max` characters, never splitting one
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((cut, _)) => value[..cut].to_string(),
        None => value.to_string(),
    }
}

fn section_code(href: &str, page_url: &str) -> Option<String> {
    let resolved = Url::parse(page_url).and_then(|base| base.join(href.trim()));
    match resolved {
        Ok(url) => topic_code_from_path(url.path()),
        Err(_) => topic_code_from_path(href),
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorConfig;
    use crate::taxonomy::Topic;

    struct Page<'a> {
        title: Option<&'a str>,
        body: &'a str,
        summary: Option<&'a str>,
        published: &'a str,
        section: &'a str,
        sub_topic: &'a str,
        author: &'a str,
    }

    impl Default for Page<'_> {
        fn default() -> Self {
            Self {
                title: Some("عنوان خبر"),
                body: "<p>بند اول</p><p>بند دوم</p>",
                summary: Some("خلاصه"),
                published: "2020-03-21T10:15:00+03:30",
                section: "/service/Politics",
                sub_topic: "مجلس",
                author: "71234",
            }
        }
    }

    fn render(page: &Page<'_>) -> String {
        let title = page
            .title
            .map(|t| format!(r#"<h1 class="first-title">{}</h1>"#, t))
            .unwrap_or_default();
        let summary = page
            .summary
            .map(|s| format!(r#"<p class="summary">{}</p>"#, s))
            .unwrap_or_default();

        format!(
            r#"<html><body>
            <div class="service-title"><a href="{section}">section</a></div>
            <div class="news-info"><div class="meta-news">
              <meta itemprop="datePublished" content="{published}">
              <ul>
                <li><span class="text-meta">date</span></li>
                <li><span class="text-meta">{sub_topic}</span></li>
                <li><span class="text-meta">code</span></li>
                <li><span class="text-meta">{author}</span></li>
              </ul>
            </div></div>
            <div class="full-news-text">{title}{summary}<div class="item-text">{body}</div></div>
            </body></html>"#,
            section = page.section,
            published = page.published,
            sub_topic = page.sub_topic,
            author = page.author,
            title = title,
            summary = summary,
            body = page.body,
        )
    }

    fn reference() -> ArticleReference {
        ArticleReference {
            article_id: "99010100001".to_string(),
            url: "http://www.isna.ir/news/99010100001/".to_string(),
        }
    }

    fn tehran() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600 + 1800).unwrap()
    }

    fn extract(page: &Page<'_>) -> Result<ArticleRecord, SkipReason> {
        // 1399-01-01 and 1399-01-02
        let targets = TargetDateSet::between(
            JalaliDate::from_yyyymmdd(13990101).unwrap(),
            JalaliDate::from_yyyymmdd(13990102).unwrap(),
        )
        .unwrap();
        let selectors = PageSelectors::compile(&SelectorConfig::default()).unwrap();
        let classifier = TopicClassifier::default();
        let ctx = ExtractionContext {
            selectors: &selectors,
            classifier: &classifier,
            source_name: "ISNA",
            timezone: tehran(),
            targets: &targets,
        };
        extract_article(&render(page), &reference(), &ctx)
    }

    #[test]
    fn test_extracts_full_record() {
        let record = extract(&Page::default()).unwrap();

        assert_eq!(record.source_name, "ISNA");
        assert_eq!(record.article_id, "99010100001");
        assert_eq!(record.title, "عنوان خبر");
        assert_eq!(record.body_text, "بند اولبند دوم");
        assert_eq!(record.summary, "خلاصه");
        assert_eq!(record.topic, Topic::Politics);
        assert_eq!(record.sub_topic, "مجلس");
        assert_eq!(record.author_code, "71234");
        assert_eq!(record.canonical_url, "http://www.isna.ir/news/99010100001/");
        assert_eq!(record.published_at.to_rfc3339(), "2020-03-21T10:15:00+03:30");
    }

    #[test]
    fn test_missing_title_is_skipped() {
        let page = Page {
            title: None,
            ..Page::default()
        };
        assert_eq!(extract(&page), Err(SkipReason::MissingField("title")));
    }

    #[test]
    fn test_blank_body_is_skipped() {
        let page = Page {
            body: "   ",
            ..Page::default()
        };
        assert_eq!(extract(&page), Err(SkipReason::MissingField("body")));
    }

    #[test]
    fn test_missing_summary_is_empty() {
        let page = Page {
            summary: None,
            ..Page::default()
        };
        assert_eq!(extract(&page).unwrap().summary, "");
    }

    #[test]
    fn test_bad_timestamp_is_skipped() {
        let page = Page {
            published: "yesterday",
            ..Page::default()
        };
        assert_eq!(
            extract(&page),
            Err(SkipReason::BadTimestamp("yesterday".to_string()))
        );
    }

    #[test]
    fn test_unknown_topic_is_skipped() {
        let page = Page {
            section: "/service/Photo",
            ..Page::default()
        };
        assert_eq!(
            extract(&page),
            Err(SkipReason::UnknownTopic("PHO".to_string()))
        );
    }

    #[test]
    fn test_old_article_is_reported_before_field_checks() {
        // Off-taxonomy and untitled, but the date alone decides
        let page = Page {
            title: None,
            section: "/service/Photo",
            published: "2020-03-19T12:00:00+03:30",
            ..Page::default()
        };
        let expected = DateTime::parse_from_rfc3339("2020-03-19T12:00:00+03:30").unwrap();
        assert_eq!(extract(&page), Err(SkipReason::OutsideTargetDates(expected)));
    }

    #[test]
    fn test_later_article_is_outside_targets() {
        let page = Page {
            published: "2020-03-22T08:00:00+03:30",
            ..Page::default()
        };
        assert!(matches!(
            extract(&page),
            Err(SkipReason::OutsideTargetDates(_))
        ));
    }

    #[test]
    fn test_world_section_becomes_international_politics() {
        let page = Page {
            section: "/service/World",
            sub_topic: "آسیا",
            ..Page::default()
        };
        let record = extract(&page).unwrap();

        assert_eq!(record.topic, Topic::Politics);
        assert_eq!(record.sub_topic, "بین‌الملل: آسیا");
    }

    #[test]
    fn test_title_and_sub_topic_are_truncated() {
        let long_title = "خ".repeat(300);
        let long_sub = "ب".repeat(40);
        let page = Page {
            title: Some(long_title.as_str()),
            sub_topic: long_sub.as_str(),
            ..Page::default()
        };
        let record = extract(&page).unwrap();

        assert_eq!(record.title.chars().count(), TITLE_MAX_CHARS);
        assert_eq!(record.sub_topic.chars().count(), SUB_TOPIC_MAX_CHARS);
    }

    #[test]
    fn test_naive_timestamp_uses_configured_zone() {
        let parsed = parse_published("2020-03-21T01:00:00", tehran()).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2020-03-21T01:00:00+03:30");
    }

    #[test]
    fn test_native_date_follows_configured_zone() {
        // 22:00 UTC on 2020-03-19 is already 1399-01-01 in Tehran
        let published = DateTime::parse_from_rfc3339("2020-03-19T22:00:00+00:00").unwrap();
        let date = published_native_date(&published, tehran()).unwrap();
        assert_eq!(date.to_yyyymmdd(), 13990101);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 3), "ab");
        assert_eq!(truncate_chars("سلام", 2), "سل");
    }
}
