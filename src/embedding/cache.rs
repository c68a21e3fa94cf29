use dashmap::DashMap;

/// Embeddings are deterministic for a given `(model, text)` pair, so a
/// process-lifetime cache avoids re-paying for repeated chunks (common
/// across near-duplicate documents and retried ingests).
#[derive(Default)]
pub struct EmbeddingCache {
    entries: DashMap<(String, String), Vec<f32>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    pub fn get(&self, model: &str, text: &str) -> Option<Vec<f32>> {
        self.entries.get(&(model.to_string(), text.to_string())).map(|v| v.clone())
    }

    pub fn insert(&self, model: &str, text: &str, embedding: Vec<f32>) {
        self.entries.insert((model.to_string(), text.to_string()), embedding);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_retrieves_by_model_and_text() {
        let cache = EmbeddingCache::new();
        assert!(cache.get("m1", "hello").is_none());
        cache.insert("m1", "hello", vec![1.0, 2.0]);
        assert_eq!(cache.get("m1", "hello"), Some(vec![1.0, 2.0]));
        assert!(cache.get("m2", "hello").is_none());
    }
}
