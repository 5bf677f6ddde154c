//! Display helpers for similarity matches
//!
//! Pure functions, no failure modes.

/// Scores above this are shown as strong matches
pub const STRONG_MATCH_THRESHOLD: f64 = 0.7;

/// Human-readable label for a match path identifier
///
/// Strips everything up to the last `/` or `\`, then a trailing extension.
/// Dot-files (`.hidden`) keep their name.
///
/// ```
/// use soundmatch_client::formatting::display_label;
///
/// assert_eq!(display_label("a/b/Track One.mp3"), "Track One");
/// assert_eq!(display_label("c\\Track2.wav"), "Track2");
/// ```
pub fn display_label(path: &str) -> String {
    let file_name = path.rsplit(&['/', '\\'][..]).next().unwrap_or(path);
    strip_extension(file_name).to_string()
}

fn strip_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < file_name.len() => &file_name[..idx],
        _ => file_name,
    }
}

/// Score as a percentage with two decimals, e.g. `0.82` → `"82.00%"`
pub fn format_similarity(score: f64) -> String {
    format!("{:.2}%", score * 100.0)
}

/// Heading for the match at zero-based `rank`
pub fn match_heading(rank: usize) -> String {
    format!("Similar Song {}", rank + 1)
}

/// Coarse strength of a match, used for highlighting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityTier {
    Strong,
    Moderate,
}

impl SimilarityTier {
    pub fn of(score: f64) -> Self {
        if score > STRONG_MATCH_THRESHOLD {
            SimilarityTier::Strong
        } else {
            SimilarityTier::Moderate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_label() {
        assert_eq!(display_label("a/b/Track One.mp3"), "Track One");
        assert_eq!(display_label("c/Track2.wav"), "Track2");
        assert_eq!(display_label("dir\\sub\\Mixed/Seps.flac"), "Seps");
        assert_eq!(display_label("no_dir.ogg"), "no_dir");
        assert_eq!(display_label("archive.tar.gz"), "archive.tar");
    }

    #[test]
    fn test_display_label_edge_cases() {
        assert_eq!(display_label("noext"), "noext");
        assert_eq!(display_label("trailing."), "trailing.");
        assert_eq!(display_label("dir/.hidden"), ".hidden");
        assert_eq!(display_label("dir/"), "");
        assert_eq!(display_label(""), "");
    }

    #[test]
    fn test_format_similarity() {
        assert_eq!(format_similarity(0.82), "82.00%");
        assert_eq!(format_similarity(0.4), "40.00%");
        assert_eq!(format_similarity(1.0), "100.00%");
        assert_eq!(format_similarity(0.0), "0.00%");
    }

    #[test]
    fn test_match_heading_is_one_based() {
        assert_eq!(match_heading(0), "Similar Song 1");
        assert_eq!(match_heading(4), "Similar Song 5");
    }

    #[test]
    fn test_similarity_tier() {
        assert_eq!(SimilarityTier::of(0.82), SimilarityTier::Strong);
        assert_eq!(SimilarityTier::of(0.7), SimilarityTier::Moderate);
        assert_eq!(SimilarityTier::of(0.4), SimilarityTier::Moderate);
    }
}
