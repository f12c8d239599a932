/// Newlines never appear in a URL, so they cannot blur identifier boundaries.
const SOURCE_SEPARATOR: &str = "\n";
const QUESTION_DELIMITER: &str = "\n#question\n";

/// Deterministic fingerprint of a request's sources and question.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Order of `sources` is irrelevant; duplicates collapse.
    pub fn build<I, S>(sources: I, question: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids: Vec<String> = sources.into_iter().map(Into::into).collect();
        ids.sort();
        ids.dedup();

        let mut key = ids.join(SOURCE_SEPARATOR);
        key.push_str(QUESTION_DELIMITER);
        key.push_str(question.unwrap_or(""));
        Self(key)
    }

    /// Bounded-length key for the backing store.
    pub fn store_key(&self) -> String {
        format!("analysis/{}", blake3::hash(self.0.as_bytes()).to_hex())
    }
}
