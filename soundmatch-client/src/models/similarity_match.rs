//! Ranked similarity result

use serde::{Deserialize, Serialize};

/// One ranked result returned by the similarity service
///
/// On the wire a match is a two-element array `[path, score]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(String, f64)", into = "(String, f64)")]
pub struct SimilarityMatch {
    /// Service-assigned lookup key; compared by equality only
    pub path: String,
    /// Similarity score, nominally 0.0 to 1.0
    pub score: f64,
}

impl SimilarityMatch {
    pub fn new(path: impl Into<String>, score: f64) -> Self {
        Self {
            path: path.into(),
            score,
        }
    }
}

impl From<(String, f64)> for SimilarityMatch {
    fn from((path, score): (String, f64)) -> Self {
        Self { path, score }
    }
}

impl From<SimilarityMatch> for (String, f64) {
    fn from(m: SimilarityMatch) -> Self {
        (m.path, m.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_from_pair() {
        let matches: Vec<SimilarityMatch> =
            serde_json::from_str(r#"[["a/b/Track One.mp3", 0.82], ["c/Track2.wav", 0.4]]"#)
                .unwrap();
        assert_eq!(
            matches,
            vec![
                SimilarityMatch::new("a/b/Track One.mp3", 0.82),
                SimilarityMatch::new("c/Track2.wav", 0.4),
            ]
        );
    }

    #[test]
    fn test_rejects_wrong_shape() {
        assert!(serde_json::from_str::<SimilarityMatch>(r#"{"path": "x", "score": 1}"#).is_err());
        assert!(serde_json::from_str::<SimilarityMatch>(r#"["x"]"#).is_err());
        assert!(serde_json::from_str::<SimilarityMatch>(r#"[0.5, "x"]"#).is_err());
    }
}
