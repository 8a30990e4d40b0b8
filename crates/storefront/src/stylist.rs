//! Style suggestions for the stylist page.

use fitroom_core::{Occasion, SkinTone, style_suggestions};
use serde::Serialize;
use tracing::{debug, instrument};

/// What the stylist page renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleAdvice {
    /// Tone the rules were picked for.
    pub skin_tone: SkinTone,
    /// Occasion the rules were picked for.
    pub occasion: Occasion,
    pub suggestions: Vec<String>,
}

/// Suggest colors, an outfit and a tip for free-form tone and occasion input.
///
/// Never fails: unknown input falls back to a medium tone and a casual occasion.
#[instrument]
#[must_use]
pub fn suggest(skin_tone: &str, occasion: &str) -> StyleAdvice {
    let advice = StyleAdvice {
        skin_tone: SkinTone::from_input(skin_tone),
        occasion: Occasion::from_input(occasion),
        suggestions: style_suggestions(skin_tone, occasion),
    };
    debug!(tone = ?advice.skin_tone, occasion = advice.occasion.as_str(), "Style rules matched");
    advice
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_suggest_matches_aliases() {
        let advice = suggest("ebony", "club");
        assert_eq!(advice.skin_tone, SkinTone::Dark);
        assert_eq!(advice.occasion, Occasion::Party);
        assert_eq!(
            advice.suggestions[1],
            "Outfit Idea: A fuchsia bodycon dress or silver statement jewelry."
        );
    }

    #[test]
    fn test_advice_serializes_for_the_page() {
        let json = serde_json::to_value(suggest("pale", "wedding")).unwrap();
        assert_eq!(json["skin_tone"], "fair");
        assert_eq!(json["occasion"], "wedding");
        assert_eq!(json["suggestions"].as_array().unwrap().len(), 4);
    }
}
