//! End-of-run report

use crate::crawler::CrawlReport;

/// Formats a finished run for the terminal
pub fn format_crawl_report(report: &CrawlReport) -> String {
    let c = &report.counters;
    let mut out = String::new();

    out.push_str(&format!("=== Crawl Run {} ===\n\n", report.run_id));
    out.push_str(&format!("Stopped: {}\n", report.done));
    out.push_str(&format!("Duration: {:.1}s\n\n", report.elapsed.as_secs_f64()));

    out.push_str("Listings:\n");
    out.push_str(&format!("  Pages fetched: {}\n", c.listing_pages));
    out.push_str(&format!("  Empty pages: {}\n", c.empty_pages));
    out.push_str(&format!("  Failed pages: {}\n", c.listing_failures));
    out.push_str(&format!("  Days rolled back: {}\n\n", c.days_rolled_back));

    out.push_str("Articles:\n");
    out.push_str(&format!("  Dispatched: {}\n", c.articles_dispatched));
    out.push_str(&format!("  Inserted: {}\n", c.articles_inserted));
    out.push_str(&format!("  Already stored: {}\n", c.articles_conflicted));
    out.push_str(&format!("  Skipped: {}\n", c.articles_skipped));
    out.push_str(&format!("  Failed: {}\n", c.articles_failed));

    if c.listing_failures > 0 {
        out.push_str(&format!(
            "\nWarning: {} listing page(s) could not be fetched and were treated as empty; \
             re-run the same window to fill any gaps.\n",
            c.listing_failures
        ));
    }

    out
}
