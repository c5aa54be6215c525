//! The embedding provider contract.
//!
//! The engine never computes embeddings itself; it consumes a provider that
//! maps texts to vectors at document or token level. Providers are
//! synchronous and idempotent, so retrying a transient failure is always
//! safe. Production deployments point this at an external embedding service;
//! the optional `embeddings` feature bundles a fastembed-backed provider so
//! the CLI works standalone.

use super::NlpConfig;
use std::time::Duration;
use thiserror::Error;

/// Granularity of the requested embeddings.
///
/// Document-level vectors are strictly smaller, so they are the default;
/// token-level vectors are requested only by the fuzzy-set similarity
/// methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingLevel {
    Document,
    Tokens,
}

/// Embeddings for one text at the requested level.
#[derive(Debug, Clone, PartialEq)]
pub enum TextVectors {
    /// One vector for the whole text
    Document(Vec<f32>),
    /// One vector per token
    Tokens(Vec<Vec<f32>>),
}

/// Error type for embedding provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider failed but a retry may succeed (timeouts, overload)
    #[error("transient embedding provider failure: {0}")]
    Transient(String),

    /// The provider failed permanently (bad model, unsupported level)
    #[error("embedding provider failure: {0}")]
    Permanent(String),
}

/// Trait for turning texts into vectors.
///
/// Implementations must be idempotent: the same texts with the same config
/// yield the same vectors. Shared immutably across FAC workers; any interior
/// state must be synchronised by the implementation.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, returning one [`TextVectors`] per input text,
    /// in input order.
    fn vectors(
        &self,
        texts: &[&str],
        level: EmbeddingLevel,
        config: &NlpConfig,
    ) -> Result<Vec<TextVectors>, ProviderError>;
}

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(50);

/// Call the provider, retrying transient failures with exponential backoff.
pub(crate) fn vectors_with_retry(
    provider: &dyn EmbeddingProvider,
    texts: &[&str],
    level: EmbeddingLevel,
    config: &NlpConfig,
) -> Result<Vec<TextVectors>, ProviderError> {
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 1;

    loop {
        match provider.vectors(texts, level, config) {
            Err(ProviderError::Transient(msg)) if attempt < MAX_ATTEMPTS => {
                tracing::warn!(attempt, error = %msg, "transient embedding failure, backing off");
                std::thread::sleep(backoff);
                backoff *= 2;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Deterministic offline provider hashing tokens into a fixed-dimension
/// bag-of-words space.
///
/// Not semantically meaningful: identical texts map to identical vectors and
/// token overlap yields partial similarity, nothing more. Serves as the CLI
/// fallback when no real provider is configured and as a convenient fixture
/// in tests.
#[derive(Debug, Default)]
pub struct HashingProvider;

impl HashingProvider {
    const DIMENSIONS: usize = 64;

    pub fn new() -> Self {
        Self
    }

    fn token_vector(token: &str) -> Vec<f32> {
        // FNV-1a, folded into a one-hot-ish vector with a sign bit.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in token.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        let mut vector = vec![0.0; Self::DIMENSIONS];
        let index = (hash % Self::DIMENSIONS as u64) as usize;
        let sign = if hash & (1u64 << 63) == 0 { 1.0 } else { -1.0 };
        vector[index] = sign;
        vector
    }

    fn document_vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; Self::DIMENSIONS];
        for token in text.split_whitespace() {
            for (slot, value) in vector.iter_mut().zip(Self::token_vector(token)) {
                *slot += value;
            }
        }
        vector
    }
}

impl EmbeddingProvider for HashingProvider {
    fn vectors(
        &self,
        texts: &[&str],
        level: EmbeddingLevel,
        _config: &NlpConfig,
    ) -> Result<Vec<TextVectors>, ProviderError> {
        Ok(texts
            .iter()
            .map(|text| match level {
                EmbeddingLevel::Document => TextVectors::Document(Self::document_vector(text)),
                EmbeddingLevel::Tokens => TextVectors::Tokens(
                    text.split_whitespace().map(Self::token_vector).collect(),
                ),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// FastEmbedProvider — bundled embedder behind the `embeddings` feature
// ---------------------------------------------------------------------------

#[cfg(feature = "embeddings")]
mod fastembed_impl {
    use super::{EmbeddingLevel, EmbeddingProvider, ProviderError, TextVectors};
    use crate::nlp::NlpConfig;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use std::sync::Mutex;

    /// Provider backed by fastembed (ONNX Runtime).
    ///
    /// Wraps `fastembed::TextEmbedding` in a `Mutex` because its `embed`
    /// method requires `&mut self`, while the provider trait uses `&self`.
    /// Document-level only; token-level requests fail permanently.
    pub struct FastEmbedProvider {
        model: Mutex<TextEmbedding>,
    }

    impl FastEmbedProvider {
        /// Create a provider with a specific model.
        pub fn new(model: EmbeddingModel) -> Result<Self, ProviderError> {
            let options = InitOptions::new(model).with_show_download_progress(false);
            let embedding = TextEmbedding::try_new(options)
                .map_err(|e| ProviderError::Permanent(e.to_string()))?;
            Ok(Self {
                model: Mutex::new(embedding),
            })
        }

        /// Create a provider with the default model (nomic-embed-text-v1.5).
        pub fn default_model() -> Result<Self, ProviderError> {
            Self::new(EmbeddingModel::NomicEmbedTextV15)
        }
    }

    impl EmbeddingProvider for FastEmbedProvider {
        fn vectors(
            &self,
            texts: &[&str],
            level: EmbeddingLevel,
            _config: &NlpConfig,
        ) -> Result<Vec<TextVectors>, ProviderError> {
            if level == EmbeddingLevel::Tokens {
                return Err(ProviderError::Permanent(
                    "token-level embeddings are not supported by the fastembed backend".into(),
                ));
            }
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let mut model = self.model.lock().map_err(|_| {
                ProviderError::Permanent("embedding model mutex poisoned".into())
            })?;
            let embeddings = model
                .embed(texts.to_vec(), None)
                .map_err(|e| ProviderError::Transient(e.to_string()))?;
            Ok(embeddings.into_iter().map(TextVectors::Document).collect())
        }
    }
}

#[cfg(feature = "embeddings")]
pub use fastembed_impl::FastEmbedProvider;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Provider that fails transiently a fixed number of times before
    /// succeeding.
    struct FlakyProvider {
        failures: u32,
        calls: AtomicU32,
    }

    impl EmbeddingProvider for FlakyProvider {
        fn vectors(
            &self,
            texts: &[&str],
            _level: EmbeddingLevel,
            _config: &NlpConfig,
        ) -> Result<Vec<TextVectors>, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::Relaxed);
            if call < self.failures {
                Err(ProviderError::Transient("overloaded".into()))
            } else {
                Ok(texts
                    .iter()
                    .map(|_| TextVectors::Document(vec![1.0]))
                    .collect())
            }
        }
    }

    #[test]
    fn retries_transient_failures() {
        let provider = FlakyProvider {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        let result = vectors_with_retry(
            &provider,
            &["x"],
            EmbeddingLevel::Document,
            &NlpConfig::default(),
        );
        assert!(result.is_ok());
        assert_eq!(provider.calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn gives_up_after_three_attempts() {
        let provider = FlakyProvider {
            failures: 10,
            calls: AtomicU32::new(0),
        };
        let result = vectors_with_retry(
            &provider,
            &["x"],
            EmbeddingLevel::Document,
            &NlpConfig::default(),
        );
        assert!(matches!(result, Err(ProviderError::Transient(_))));
        assert_eq!(provider.calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn permanent_failures_are_not_retried() {
        struct Broken;
        impl EmbeddingProvider for Broken {
            fn vectors(
                &self,
                _texts: &[&str],
                _level: EmbeddingLevel,
                _config: &NlpConfig,
            ) -> Result<Vec<TextVectors>, ProviderError> {
                Err(ProviderError::Permanent("no such model".into()))
            }
        }
        let result = vectors_with_retry(
            &Broken,
            &["x"],
            EmbeddingLevel::Document,
            &NlpConfig::default(),
        );
        assert!(matches!(result, Err(ProviderError::Permanent(_))));
    }

    #[test]
    fn hashing_provider_is_deterministic() {
        let provider = HashingProvider::new();
        let config = NlpConfig::default();
        let a = provider
            .vectors(&["birds can fly"], EmbeddingLevel::Document, &config)
            .unwrap();
        let b = provider
            .vectors(&["birds can fly"], EmbeddingLevel::Document, &config)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn hashing_provider_token_level_has_one_vector_per_token() {
        let provider = HashingProvider::new();
        let result = provider
            .vectors(&["birds can fly"], EmbeddingLevel::Tokens, &NlpConfig::default())
            .unwrap();
        match &result[0] {
            TextVectors::Tokens(tokens) => assert_eq!(tokens.len(), 3),
            TextVectors::Document(_) => panic!("expected token vectors"),
        }
    }
}
