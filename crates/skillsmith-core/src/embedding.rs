//! Dense embeddings for the hybrid search vector leg (C6/C7, spec §3).
//!
//! Spec §3 defines the embedding as "a fixed-dimension (default 384) dense
//! vector over the concatenation of name + description" without mandating a
//! provider. Rather than pulling in a network-calling model (OpenAI, Ollama,
//! fastembed), this computes a deterministic hashing-trick bag-of-words
//! vector in-process: every token hashes to a bucket and a sign, and the
//! result is L2-normalized so cosine similarity behaves like a unit-vector
//! dot product. Two skills that share vocabulary land closer together; it's
//! a weak substitute for a learned embedding model but needs no network
//! calls, API keys, or GPU, and is good enough to drive k-NN ranking.

/// Default dimensionality of a computed embedding (spec §3).
pub const EMBEDDING_DIM: usize = 384;

/// Identifies the embedding function version stored alongside each vector,
/// so a future change in `embed_text` can be detected and vectors re-indexed.
pub const EMBEDDING_MODEL_ID: &str = "hashing-trick-v1";

/// Computes a deterministic `EMBEDDING_DIM`-dimension embedding for `text`.
pub fn embed_text(text: &str) -> Vec<f32> {
    let mut vector = vec![0f32; EMBEDDING_DIM];
    for token in text.to_lowercase().split_whitespace() {
        let hash = blake3::hash(token.as_bytes());
        let bytes = hash.as_bytes();
        let bucket = (u64::from_le_bytes(bytes[0..8].try_into().unwrap()) as usize) % EMBEDDING_DIM;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }
    normalize(&mut vector);
    vector
}

/// Embedding of a skill's searchable text, per spec §3 (name + description).
pub fn embed_skill_text(name: &str, description: &str) -> Vec<f32> {
    embed_text(&format!("{name} {description}"))
}

fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity between two vectors, 0.0 for empty or mismatched
/// dimensions (treated as unrelated rather than an error).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_has_default_dimension() {
        let v = embed_text("kubernetes deployment helper");
        assert_eq!(v.len(), EMBEDDING_DIM);
    }

    #[test]
    fn embedding_is_deterministic() {
        assert_eq!(embed_text("hello world"), embed_text("hello world"));
    }

    #[test]
    fn embedding_is_unit_normalized() {
        let v = embed_text("hello world foo bar baz");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_vocabulary_scores_higher_than_disjoint() {
        let a = embed_text("kubernetes deployment helper");
        let b = embed_text("kubernetes deployment assistant");
        let c = embed_text("pastry baking recipe guide");
        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
    }

    #[test]
    fn empty_text_yields_zero_vector() {
        let v = embed_text("");
        assert!(v.iter().all(|x| *x == 0.0));
        assert_eq!(cosine_similarity(&v, &v), 0.0);
    }
}
