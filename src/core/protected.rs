use crate::domain::ports::Storage;
use crate::utils::error::{EtlError, Result};
use std::collections::HashSet;
use std::io::ErrorKind;

/// Articles whose stock row must never be zeroed by the reset step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedArticles {
    articles: HashSet<String>,
}

impl ProtectedArticles {
    pub fn empty() -> Self {
        Self::default()
    }

    /// 檔案只有一行，以 ", " 分隔
    pub fn parse(text: &str) -> Self {
        let line = text.lines().next().unwrap_or_default();
        let articles = line
            .split(',')
            .map(str::trim)
            .filter(|article| !article.is_empty())
            .map(str::to_string)
            .collect();
        Self { articles }
    }

    /// Loads the list; a missing file means nothing is protected.
    pub async fn load<S: Storage>(storage: &S, path: Option<&str>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::empty());
        };

        match storage.read_file(path).await {
            Ok(bytes) => {
                let protected = Self::parse(&String::from_utf8_lossy(&bytes));
                tracing::info!("🔒 {} protected article(s) loaded", protected.len());
                Ok(protected)
            }
            Err(EtlError::IoError(e)) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("Protected article list {} not found, nothing is protected", path);
                Ok(Self::empty())
            }
            Err(e) => Err(e),
        }
    }

    pub fn contains(&self, article: &str) -> bool {
        self.articles.contains(article)
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ProtectedArticles {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            articles: iter.into_iter().map(Into::into).collect(),
        }
    }
}

pub fn is_protected(article: &str, protected: &ProtectedArticles) -> bool {
    protected.contains(article)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalStorage;
    use tempfile::TempDir;

    #[test]
    fn test_parse_single_line() {
        let protected = ProtectedArticles::parse("A1, A2, A3\nignored, line");
        assert_eq!(protected.len(), 3);
        assert!(is_protected("A2", &protected));
        assert!(!is_protected("ignored", &protected));
        assert!(!is_protected("A", &protected));
    }

    #[test]
    fn test_parse_empty_text() {
        assert!(ProtectedArticles::parse("").is_empty());
        assert!(ProtectedArticles::parse("  \n").is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_protects_nothing() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().to_string_lossy().to_string());

        let protected = ProtectedArticles::load(&storage, Some("untouchable_articles.txt"))
            .await
            .unwrap();
        assert!(protected.is_empty());

        let none = ProtectedArticles::load(&storage, None).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("untouchable.txt"), "K1, K2").unwrap();
        let storage = LocalStorage::new(dir.path().to_string_lossy().to_string());

        let protected = ProtectedArticles::load(&storage, Some("untouchable.txt"))
            .await
            .unwrap();
        assert!(protected.contains("K1"));
        assert!(protected.contains("K2"));
    }
}
