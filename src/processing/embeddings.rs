//! Embedding providers and the batch embedder used by every pipeline stage

use crate::config::{EmbeddingBackend, EmbeddingConfig, RetryConfig};
use crate::error::{Result, SkillGapError};
use crate::processing::deadline::Deadline;
use model2vec_rs::model::StaticModel;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of dense text vectors.
///
/// Implementations must return one vector per input, in input order. A
/// transient failure should be reported as `SkillGapError::EmbeddingProvider`
/// so the caller can retry it.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, texts: &[String], timeout: Duration) -> Result<Vec<Vec<f32>>>;

    /// Identifier reported alongside analysis results
    fn name(&self) -> &str;

    /// False for providers whose similarity reflects spelling rather than
    /// meaning; validation then applies `validation.lexical_threshold`
    fn is_semantic(&self) -> bool {
        true
    }
}

/// Build the provider selected in configuration
pub fn build_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.backend {
        EmbeddingBackend::Model2Vec => Ok(Arc::new(Model2VecProvider::load(&config.model, config.batch_size)?)),
        EmbeddingBackend::Hash => Ok(Arc::new(HashEmbeddingProvider::new(config.hash_dimensions)?)),
    }
}

/// Normalize in place; returns false for zero or non-finite vectors
pub fn l2_normalize(vector: &mut [f32]) -> bool {
    if vector.iter().any(|v| !v.is_finite()) {
        return false;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return false;
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
    true
}

/// Cosine similarity of two unit vectors
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>().clamp(-1.0, 1.0)
}

/// Wraps a provider with retry, deadline handling and output checks.
///
/// Everything downstream relies on vectors from here being unit length and
/// of one dimension.
pub struct BatchEmbedder<'a> {
    provider: &'a dyn EmbeddingProvider,
    retry: &'a RetryConfig,
    call_timeout: Duration,
}

impl<'a> BatchEmbedder<'a> {
    pub fn new(provider: &'a dyn EmbeddingProvider, retry: &'a RetryConfig, call_timeout: Duration) -> Self {
        Self {
            provider,
            retry,
            call_timeout,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Embed `texts` in one provider call (plus retries).
    ///
    /// Empty input returns immediately without calling the provider.
    pub fn embed(&self, texts: &[String], expected_dim: Option<usize>, deadline: &Deadline) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let attempts = self.retry.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            deadline.check("embedding")?;
            let timeout = deadline.budget(self.call_timeout);

            match self.provider.embed(texts, timeout) {
                Ok(vectors) => return self.check_output(texts.len(), vectors, expected_dim),
                Err(e) if e.is_recoverable() => {
                    log::warn!(
                        "Embedding attempt {}/{} via {} failed: {}",
                        attempt + 1,
                        attempts,
                        self.provider.name(),
                        e
                    );
                    last_error = Some(e);

                    if attempt + 1 < attempts {
                        let delay = self.retry.delay_for_attempt(attempt);
                        if matches!(deadline.remaining(), Some(left) if left < delay) {
                            return Err(deadline.timeout("embedding"));
                        }
                        std::thread::sleep(delay);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
        Err(SkillGapError::EmbeddingProvider(format!(
            "gave up after {} attempts: {}",
            attempts, reason
        )))
    }

    fn check_output(&self, count: usize, mut vectors: Vec<Vec<f32>>, expected_dim: Option<usize>) -> Result<Vec<Vec<f32>>> {
        let violation = |reason: String| {
            SkillGapError::EmbeddingProvider(format!("{} returned invalid output: {}", self.provider.name(), reason))
        };

        if vectors.len() != count {
            return Err(violation(format!("{} vectors for {} texts", vectors.len(), count)));
        }

        let dimension = expected_dim.unwrap_or_else(|| vectors[0].len());
        for (i, vector) in vectors.iter_mut().enumerate() {
            if vector.len() != dimension {
                return Err(violation(format!(
                    "vector {} has dimension {}, expected {}",
                    i,
                    vector.len(),
                    dimension
                )));
            }
            if !l2_normalize(vector) {
                return Err(violation(format!("vector {} is zero or non-finite", i)));
            }
        }

        Ok(vectors)
    }
}

/// Static Model2Vec embeddings with an in-process cache
pub struct Model2VecProvider {
    model: StaticModel,
    model_name: String,
    batch_size: usize,
    cache: RwLock<HashMap<String, Vec<f32>>>,
}

impl Model2VecProvider {
    /// Load from a local directory or a Hugging Face repository id
    pub fn load(model: &str, batch_size: usize) -> Result<Self> {
        let start_time = Instant::now();
        log::info!("Loading Model2Vec embedding model: {}", model);

        let static_model = StaticModel::from_pretrained(
            model, None, // token
            None, // normalize
            None, // subfolder
        )
        .map_err(|e| SkillGapError::EmbeddingProvider(format!("Failed to load model '{}': {}", model, e)))?;

        log::info!("Model loaded in {:.2?}", start_time.elapsed());

        Ok(Self {
            model: static_model,
            model_name: model.to_string(),
            batch_size: batch_size.max(1),
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn cache_size(&self) -> usize {
        self.cache.read().len()
    }
}

impl EmbeddingProvider for Model2VecProvider {
    fn embed(&self, texts: &[String], timeout: Duration) -> Result<Vec<Vec<f32>>> {
        let start_time = Instant::now();

        let uncached: Vec<String> = {
            let cache = self.cache.read();
            let mut seen = std::collections::HashSet::new();
            texts
                .iter()
                .filter(|t| !cache.contains_key(*t) && seen.insert(t.as_str()))
                .cloned()
                .collect()
        };

        for batch in uncached.chunks(self.batch_size) {
            if start_time.elapsed() > timeout {
                return Err(SkillGapError::EmbeddingProvider(format!(
                    "encoding exceeded {:?}",
                    timeout
                )));
            }
            let vectors = self.model.encode(batch);
            let mut cache = self.cache.write();
            for (text, vector) in batch.iter().zip(vectors) {
                cache.insert(text.clone(), vector);
            }
        }

        let cache = self.cache.read();
        texts
            .iter()
            .map(|text| {
                cache
                    .get(text)
                    .cloned()
                    .ok_or_else(|| SkillGapError::EmbeddingProvider(format!("no vector produced for '{}'", text)))
            })
            .collect()
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

/// Feature-hashed character trigrams.
///
/// Needs no model download, so it backs offline runs and tests. Similar
/// spellings land close together; unrelated words are near-orthogonal.
pub struct HashEmbeddingProvider {
    dimensions: usize,
    name: String,
}

impl HashEmbeddingProvider {
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(SkillGapError::Configuration(
                "embedding.hash_dimensions must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            dimensions,
            name: format!("hash-trigram-{}", dimensions),
        })
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let padded: Vec<char> = format!(" {} ", text.trim().to_lowercase()).chars().collect();

        for window in padded.windows(3) {
            let gram: String = window.iter().collect();
            let hash = fnv1a_hash(gram.as_bytes());
            let index = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        vector
    }
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn embed(&self, texts: &[String], _timeout: Duration) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_semantic(&self) -> bool {
        false
    }
}

fn fnv1a_hash(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
