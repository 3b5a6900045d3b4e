//! Raw article archive
//!
//! Every fetched article page is written to `<dir>/<article_id>.html` before
//! extraction runs, so the original markup survives even when extraction
//! later rejects the page.

use std::io;
use std::path::{Path, PathBuf};

/// Flat directory of raw article pages
#[derive(Debug, Clone)]
pub struct RawArchive {
    dir: PathBuf,
}

impl RawArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the page for `article_id` is kept
    pub fn path_for(&self, article_id: &str) -> io::Result<PathBuf> {
        if article_id.is_empty()
            || !article_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("article id '{}' is not a safe file name", article_id),
            ));
        }
        Ok(self.dir.join(format!("{}.html", article_id)))
    }

    /// Writes the page content, replacing any earlier copy
    pub async fn save(&self, article_id: &str, content: &str) -> io::Result<PathBuf> {
        let path = self.path_for(article_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, content).await?;
        Ok(path)
    }
}
