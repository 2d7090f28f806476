//! Document source trait.
//!
//! A [`DocumentSource`] produces the [`SourceDocument`]s an index is built
//! from. The filesystem source lives in the app crate; [`StaticCorpus`] is
//! an in-memory source for tests and library users.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::SourceDocument;

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// One-line description for logs (e.g. `"filesystem:./Data"`).
    fn describe(&self) -> String;

    /// Load every document currently in the source.
    ///
    /// Called only when an index is (re)built. Documents that fail to
    /// extract should be skipped by the implementation; an error here
    /// means the source as a whole is unusable.
    async fn load_documents(&self) -> Result<Vec<SourceDocument>>;
}

/// A fixed, in-memory set of documents.
#[derive(Debug, Clone, Default)]
pub struct StaticCorpus {
    documents: Vec<SourceDocument>,
}

impl StaticCorpus {
    pub fn new(documents: Vec<SourceDocument>) -> Self {
        Self { documents }
    }

    /// Build from `(source_id, text)` pairs.
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(source_id, text)| SourceDocument {
                    source_id: source_id.into(),
                    text: text.into(),
                })
                .collect(),
        )
    }
}

#[async_trait]
impl DocumentSource for StaticCorpus {
    fn describe(&self) -> String {
        format!("static:{} documents", self.documents.len())
    }

    async fn load_documents(&self) -> Result<Vec<SourceDocument>> {
        Ok(self.documents.clone())
    }
}
