//! Vector similarity and nearest-neighbour ranking.

use uhpm_core::memory::{MemoryEntry, MemoryHit};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Cosine distance: `1 - cosine_similarity`, in [0, 2].
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Rank entries nearest-first against a query embedding.
///
/// Entries without an embedding rank as orthogonal. Equal distances keep
/// insertion order.
pub fn rank(entries: &[MemoryEntry], query_embedding: &[f32], k: usize) -> Vec<MemoryHit> {
    let mut scored: Vec<(f32, &MemoryEntry)> = entries
        .iter()
        .map(|entry| {
            let distance = entry
                .embedding
                .as_deref()
                .map_or(1.0, |emb| cosine_distance(emb, query_embedding));
            (distance, entry)
        })
        .collect();

    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .take(k)
        .map(|(distance, entry)| MemoryHit {
            text: entry.content.clone(),
            tags: entry.tags.clone(),
            distance,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uhpm_core::memory::Tags;

    fn entry(id: &str, embedding: Option<Vec<f32>>) -> MemoryEntry {
        MemoryEntry {
            id: id.into(),
            content: format!("Content for {id}"),
            tags: Tags::new(),
            created_at: Utc::now(),
            embedding,
        }
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
        assert!(cosine_distance(&v, &v).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn cosine_known_value() {
        // [1,1] · [1,0] = 1, |[1,1]| = sqrt(2), |[1,0]| = 1
        let sim = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]);
        assert!((sim - 0.7071).abs() < 0.001);
    }

    #[test]
    fn rank_orders_nearest_first() {
        let query = vec![1.0, 0.0, 0.0];
        let entries = vec![
            entry("a", Some(vec![0.0, 1.0, 0.0])),
            entry("b", Some(vec![1.0, 0.0, 0.0])),
            entry("c", Some(vec![0.5, 0.5, 0.0])),
        ];

        let hits = rank(&entries, &query, 10);
        let texts: Vec<_> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["Content for b", "Content for c", "Content for a"]);
        assert!(hits[0].distance < hits[1].distance);
    }

    #[test]
    fn rank_respects_k_and_ties() {
        let query = vec![1.0, 0.0];
        let entries = vec![
            entry("first", Some(vec![0.0, 1.0])),
            entry("second", None),
            entry("third", Some(vec![0.0, 2.0])),
        ];

        let hits = rank(&entries, &query, 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "Content for first");
        assert_eq!(hits[1].text, "Content for second");
    }

    #[test]
    fn rank_empty() {
        assert!(rank(&[], &[1.0], 3).is_empty());
        assert!(rank(&[entry("a", None)], &[1.0], 0).is_empty());
    }
}
