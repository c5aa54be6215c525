//! Per-request vector cache.
//!
//! Embedding calls dominate retrieval latency; the cache batches all misses
//! of a lookup into a single provider call and serves every later lookup in
//! O(1). One cache exists per request (or per FAC worker) and is dropped at
//! the request boundary, so it can never grow unboundedly or serve vectors
//! from a stale embedding configuration.

use super::provider::{vectors_with_retry, EmbeddingLevel, EmbeddingProvider, ProviderError, TextVectors};
use super::NlpConfig;
use std::collections::HashMap;

/// Cache mapping text to its embedding vectors.
#[derive(Debug, Default)]
pub struct VectorCache {
    entries: HashMap<String, TextVectors>,
}

impl VectorCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Number of cached texts
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all cached vectors.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Fetch vectors for `texts`, batching all cache misses into a single
    /// provider call. Returns one [`TextVectors`] per input text, in input
    /// order.
    pub fn fetch(
        &mut self,
        provider: &dyn EmbeddingProvider,
        config: &NlpConfig,
        level: EmbeddingLevel,
        texts: &[&str],
    ) -> Result<Vec<TextVectors>, ProviderError> {
        let mut misses: Vec<&str> = Vec::new();
        for text in texts {
            if !self.entries.contains_key(*text) && !misses.contains(text) {
                misses.push(*text);
            }
        }

        if !misses.is_empty() {
            let fetched = vectors_with_retry(provider, &misses, level, config)?;
            for (text, vectors) in misses.iter().zip(fetched) {
                self.entries.insert((*text).to_string(), vectors);
            }
        }

        Ok(texts
            .iter()
            .map(|text| self.entries[*text].clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider counting how many calls it receives and how many texts each
    /// call carried.
    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
        texts_seen: AtomicUsize,
    }

    impl EmbeddingProvider for CountingProvider {
        fn vectors(
            &self,
            texts: &[&str],
            _level: EmbeddingLevel,
            _config: &NlpConfig,
        ) -> Result<Vec<TextVectors>, ProviderError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.texts_seen.fetch_add(texts.len(), Ordering::Relaxed);
            Ok(texts
                .iter()
                .map(|t| TextVectors::Document(vec![t.len() as f32]))
                .collect())
        }
    }

    #[test]
    fn misses_are_batched_into_one_call() {
        let provider = CountingProvider::default();
        let mut cache = VectorCache::new();
        let result = cache
            .fetch(
                &provider,
                &NlpConfig::default(),
                EmbeddingLevel::Document,
                &["a", "bb", "ccc"],
            )
            .unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(provider.calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn cached_texts_do_not_hit_the_provider_again() {
        let provider = CountingProvider::default();
        let mut cache = VectorCache::new();
        let config = NlpConfig::default();
        cache
            .fetch(&provider, &config, EmbeddingLevel::Document, &["a", "bb"])
            .unwrap();
        cache
            .fetch(&provider, &config, EmbeddingLevel::Document, &["bb", "ccc"])
            .unwrap();
        assert_eq!(provider.calls.load(Ordering::Relaxed), 2);
        // Second call only fetched the one missing text.
        assert_eq!(provider.texts_seen.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn duplicate_texts_in_one_lookup_are_fetched_once() {
        let provider = CountingProvider::default();
        let mut cache = VectorCache::new();
        cache
            .fetch(
                &provider,
                &NlpConfig::default(),
                EmbeddingLevel::Document,
                &["a", "a", "a"],
            )
            .unwrap();
        assert_eq!(provider.texts_seen.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn clear_empties_the_cache() {
        let provider = CountingProvider::default();
        let mut cache = VectorCache::new();
        cache
            .fetch(
                &provider,
                &NlpConfig::default(),
                EmbeddingLevel::Document,
                &["a"],
            )
            .unwrap();
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
