//! Integration tests driving the real HTTP fetcher against mock archives

mod crawl_tests;
mod fetcher_tests;
