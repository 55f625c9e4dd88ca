//! Uniform result envelope returned by every retrieval call.

use crate::vector_index::{Match, Metadata};

/// Matched passages with parallel metadata and distances, or an error.
///
/// If `error` is set all sequences are empty; otherwise the three sequences
/// have equal length and index `i` describes one match. Fields are private so
/// both hold by construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    documents: Vec<String>,
    metadata: Vec<Metadata>,
    distances: Vec<f32>,
    error: Option<String>,
}

impl SearchResults {
    /// Envelope over backend matches, keeping their order.
    pub fn from_matches(matches: Vec<Match>) -> Self {
        let mut results = Self::default();
        for m in matches {
            results.documents.push(m.document);
            results.metadata.push(m.metadata);
            results.distances.push(m.distance);
        }
        results
    }

    /// Failed lookup carrying a readable message.
    pub fn empty(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// True when there are no matches (failed or not).
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn metadata(&self) -> &[Metadata] {
        &self.metadata
    }

    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    /// Matches as `(document, metadata, distance)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Metadata, f32)> {
        self.documents
            .iter()
            .zip(&self.metadata)
            .zip(&self.distances)
            .map(|((doc, meta), distance)| (doc.as_str(), meta, *distance))
    }
}
