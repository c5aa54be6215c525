//! Vector similarity measures.
//!
//! Cosine over document vectors is the default. The fuzzy-set measures
//! (DynaMax and max-pooling variants) operate on per-token vectors and
//! follow Zhelezniak et al., "Don't Settle for Average, Go for the Max"
//! (NAACL 2019). All measures return values in [0, 1].

use super::provider::{EmbeddingLevel, TextVectors};
use serde::{Deserialize, Serialize};

/// The configured similarity measure for text comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMethod {
    /// Cosine similarity of document vectors (default)
    #[default]
    Cosine,
    /// Fuzzy Jaccard with dynamic max-pooling over the pair's token union
    DynamaxJaccard,
    /// Fuzzy Jaccard with per-dimension max-pooling
    MaxpoolJaccard,
    /// Fuzzy Dice coefficient with dynamic max-pooling
    DynamaxDice,
    /// Fuzzy Otsuka coefficient with dynamic max-pooling
    DynamaxOtsuka,
}

impl SimilarityMethod {
    /// The embedding granularity this method needs from the provider.
    pub fn embedding_level(self) -> EmbeddingLevel {
        match self {
            SimilarityMethod::Cosine => EmbeddingLevel::Document,
            SimilarityMethod::DynamaxJaccard
            | SimilarityMethod::MaxpoolJaccard
            | SimilarityMethod::DynamaxDice
            | SimilarityMethod::DynamaxOtsuka => EmbeddingLevel::Tokens,
        }
    }
}

/// Score a pair of embedded texts with the given method.
///
/// Vector variants that do not match the method's level score 0.
pub fn score(method: SimilarityMethod, a: &TextVectors, b: &TextVectors) -> f64 {
    match (method, a, b) {
        (SimilarityMethod::Cosine, TextVectors::Document(x), TextVectors::Document(y)) => {
            cosine(x, y)
        }
        (SimilarityMethod::DynamaxJaccard, TextVectors::Tokens(x), TextVectors::Tokens(y)) => {
            dynamax_jaccard(x, y)
        }
        (SimilarityMethod::MaxpoolJaccard, TextVectors::Tokens(x), TextVectors::Tokens(y)) => {
            maxpool_jaccard(x, y)
        }
        (SimilarityMethod::DynamaxDice, TextVectors::Tokens(x), TextVectors::Tokens(y)) => {
            dynamax_dice(x, y)
        }
        (SimilarityMethod::DynamaxOtsuka, TextVectors::Tokens(x), TextVectors::Tokens(y)) => {
            dynamax_otsuka(x, y)
        }
        _ => 0.0,
    }
}

/// Cosine similarity, clamped to [0, 1].
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    f64::from(dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// Max-pooled fuzzy membership of token set `s` over universe `u`, clipped
/// at zero.
fn fuzzify(s: &[Vec<f32>], u: &[Vec<f32>]) -> Vec<f64> {
    u.iter()
        .map(|feature| {
            s.iter()
                .map(|token| dot(token, feature))
                .fold(0.0_f64, f64::max)
        })
        .collect()
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| f64::from(x * y)).sum()
}

fn fuzzy_memberships(x: &[Vec<f32>], y: &[Vec<f32>]) -> (Vec<f64>, Vec<f64>) {
    let universe: Vec<Vec<f32>> = x.iter().chain(y.iter()).cloned().collect();
    (fuzzify(x, &universe), fuzzify(y, &universe))
}

fn intersection(mx: &[f64], my: &[f64]) -> f64 {
    mx.iter().zip(my).map(|(a, b)| a.min(*b)).sum()
}

/// Fuzzy Jaccard over the dynamic universe of both token sets.
pub fn dynamax_jaccard(x: &[Vec<f32>], y: &[Vec<f32>]) -> f64 {
    let (mx, my) = fuzzy_memberships(x, y);
    let inter = intersection(&mx, &my);
    let union: f64 = mx.iter().zip(&my).map(|(a, b)| a.max(*b)).sum();
    ratio(inter, union)
}

/// Fuzzy Jaccard with per-dimension max-pooled membership vectors.
pub fn maxpool_jaccard(x: &[Vec<f32>], y: &[Vec<f32>]) -> f64 {
    let mx = maxpool(x);
    let my = maxpool(y);
    let inter = intersection(&mx, &my);
    let union: f64 = mx.iter().zip(&my).map(|(a, b)| a.max(*b)).sum();
    ratio(inter, union)
}

/// Fuzzy Dice coefficient over the dynamic universe.
pub fn dynamax_dice(x: &[Vec<f32>], y: &[Vec<f32>]) -> f64 {
    let (mx, my) = fuzzy_memberships(x, y);
    let inter = intersection(&mx, &my);
    let denominator: f64 = mx.iter().sum::<f64>() + my.iter().sum::<f64>();
    ratio(2.0 * inter, denominator)
}

/// Fuzzy Otsuka coefficient over the dynamic universe.
pub fn dynamax_otsuka(x: &[Vec<f32>], y: &[Vec<f32>]) -> f64 {
    let (mx, my) = fuzzy_memberships(x, y);
    let inter = intersection(&mx, &my);
    let denominator = (mx.iter().sum::<f64>() * my.iter().sum::<f64>()).sqrt();
    ratio(inter, denominator)
}

fn maxpool(tokens: &[Vec<f32>]) -> Vec<f64> {
    let Some(first) = tokens.first() else {
        return Vec::new();
    };
    (0..first.len())
        .map(|dim| {
            tokens
                .iter()
                .map(|t| f64::from(t[dim]))
                .fold(0.0_f64, f64::max)
        })
        .collect()
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        (numerator / denominator).clamp(0.0, 1.0)
    }
}
