use std::{fmt, fs, path::Path};

use serde::Deserialize;
use serde_json::Value;

const EMBEDDED_SAMPLES: &str = include_str!("../data/sample-query-cache.json");

/// A canned quick-answer exchange.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Sample {
    pub query: Value,
    pub response: Value,
}

/// Demo queries answered from memory instead of an ARA.
///
/// Matching is structural: key order inside objects is ignored, while array
/// order and scalar types must agree.
#[derive(Clone, Debug, Default)]
pub struct SampleCache {
    samples: Vec<Sample>,
}

#[derive(Debug)]
pub enum SampleError {
    Read { path: String, source: std::io::Error },
    Parse(serde_json::Error),
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleError::Read { path, source } => {
                write!(f, "failed to read sample cache {path}: {source}")
            }
            SampleError::Parse(err) => write!(f, "sample cache is not valid JSON: {err}"),
        }
    }
}

impl std::error::Error for SampleError {}

impl SampleCache {
    pub fn embedded() -> Result<Self, SampleError> {
        Self::from_json(EMBEDDED_SAMPLES)
    }

    pub fn from_path(path: &Path) -> Result<Self, SampleError> {
        let text = fs::read_to_string(path).map_err(|source| SampleError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, SampleError> {
        let samples = serde_json::from_str(text).map_err(SampleError::Parse)?;
        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn lookup(&self, body: &Value) -> Option<&Value> {
        self.samples
            .iter()
            .find(|sample| &sample.query == body)
            .map(|sample| &sample.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn embedded_cache_answers_its_own_queries() {
        let cache = SampleCache::embedded().expect("embedded samples should parse");
        assert_eq!(cache.len(), 2);
        for sample in cache.samples() {
            assert_eq!(cache.lookup(&sample.query), Some(&sample.response));
        }
    }

    #[test]
    fn lookup_ignores_key_order_but_not_values() {
        let cache = SampleCache::from_json(
            r#"[{"query": {"a": 1, "b": [1, 2]}, "response": {"hit": true}}]"#,
        )
        .expect("samples should parse");
        assert_eq!(
            cache.lookup(&json!({"b": [1, 2], "a": 1})),
            Some(&json!({"hit": true}))
        );
        assert_eq!(cache.lookup(&json!({"a": 1, "b": [2, 1]})), None);
        assert_eq!(cache.lookup(&json!({"a": "1", "b": [1, 2]})), None);
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let err = SampleCache::from_path(Path::new("/nonexistent/samples.json"))
            .expect_err("missing file should fail");
        assert!(err.to_string().contains("/nonexistent/samples.json"));
    }
}
