//! Statistics generation from the article database
//!
//! This module provides functionality for extracting and displaying
//! archive statistics from the storage layer.

use crate::storage::{ArticleStore, RunRecord, StorageResult};
use crate::taxonomy::Topic;
use std::collections::HashMap;

/// Archive statistics summary
#[derive(Debug, Clone)]
pub struct ArchiveStatistics {
    /// Total number of stored articles
    pub total_articles: u64,

    /// Count of articles by topic
    pub articles_by_topic: HashMap<Topic, u64>,

    /// The most recent crawl run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn ArticleStore) -> StorageResult<ArchiveStatistics> {
    Ok(ArchiveStatistics {
        total_articles: storage.count_articles()?,
        articles_by_topic: storage.count_articles_by_topic()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Topic counts sorted by count (descending), then by topic name
pub fn topic_breakdown(stats: &ArchiveStatistics) -> Vec<(Topic, u64)> {
    let mut counts: Vec<_> = Topic::all_topics()
        .into_iter()
        .map(|topic| {
            let count = stats.articles_by_topic.get(&topic).copied().unwrap_or(0);
            (topic, count)
        })
        .collect();
    counts.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| a.0.to_db_string().cmp(b.0.to_db_string()))
    });
    counts
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ArchiveStatistics) {
    println!("=== Archive Statistics ===\n");

    println!("Articles: {}", stats.total_articles);
    println!();

    println!("Articles by Topic:");
    for (topic, count) in topic_breakdown(stats) {
        let percentage = if stats.total_articles > 0 {
            (count as f64 / stats.total_articles as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", topic, count, percentage);
    }
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  ID: {}", run.id);
            println!("  Window: {} to {}", run.date_from, run.date_to);
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Status: {}", run.status.to_db_string());
            if let Some(reason) = &run.done_reason {
                println!("  Stopped because: {}", reason);
            }
            println!(
                "  Articles: {} inserted, {} already stored, {} skipped, {} failed",
                run.counters.articles_inserted,
                run.counters.articles_conflicted,
                run.counters.articles_skipped,
                run.counters.articles_failed
            );
        }
        None => println!("No crawl runs recorded yet"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ArticleRecord, SqliteStorage};
    use chrono::DateTime;

    fn article(id: &str, topic: Topic) -> ArticleRecord {
        ArticleRecord {
            source_name: "ISNA".to_string(),
            article_id: id.to_string(),
            title: "t".to_string(),
            body_text: "b".to_string(),
            summary: String::new(),
            published_at: DateTime::parse_from_rfc3339("2020-03-21T10:00:00+03:30").unwrap(),
            topic,
            sub_topic: String::new(),
            author_code: String::new(),
            canonical_url: format!("http://www.isna.ir/news/{}/", id),
        }
    }

    #[test]
    fn test_load_statistics() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.store(&article("1", Topic::Sports)).unwrap();
        storage.store(&article("2", Topic::Sports)).unwrap();
        storage.store(&article("3", Topic::Economy)).unwrap();
        storage.create_run("hash", "13990101", "13990102").unwrap();

        let stats = load_statistics(&storage).unwrap();

        assert_eq!(stats.total_articles, 3);
        assert_eq!(stats.articles_by_topic.get(&Topic::Sports), Some(&2));
        assert_eq!(stats.latest_run.unwrap().date_to, "13990102");
    }

    #[test]
    fn test_topic_breakdown_lists_every_topic() {
        let mut articles_by_topic = HashMap::new();
        articles_by_topic.insert(Topic::Culture, 5);
        articles_by_topic.insert(Topic::Politics, 9);

        let stats = ArchiveStatistics {
            total_articles: 14,
            articles_by_topic,
            latest_run: None,
        };
        let breakdown = topic_breakdown(&stats);

        assert_eq!(breakdown.len(), Topic::all_topics().len());
        assert_eq!(breakdown[0], (Topic::Politics, 9));
        assert_eq!(breakdown[1], (Topic::Culture, 5));
        assert_eq!(breakdown[2].1, 0);
    }
}
