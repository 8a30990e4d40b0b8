//! Rule-based style advice: skin tone × occasion to colors, outfit and tip.
//!
//! Free-form input is folded onto three [`SkinTone`]s and four [`Occasion`]s
//! through a small alias table. Unknown values fall back to `medium` and
//! `casual`.

use serde::{Deserialize, Serialize};

/// Skin tone groups the rules are written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkinTone {
    Fair,
    #[default]
    Medium,
    Dark,
}

impl SkinTone {
    /// Fold user input onto a tone; unknown input is `Medium`.
    #[must_use]
    pub fn from_input(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "fair" | "pale" | "light" => Self::Fair,
            "dark" | "deep" | "ebony" => Self::Dark,
            _ => Self::Medium,
        }
    }
}

/// Occasions the rules are written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Occasion {
    #[default]
    Casual,
    Professional,
    Party,
    Wedding,
}

impl Occasion {
    /// Fold user input onto an occasion; unknown input is `Casual`.
    #[must_use]
    pub fn from_input(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "professional" | "office" | "work" | "formal" => Self::Professional,
            "party" | "night" | "club" => Self::Party,
            "wedding" | "festive" => Self::Wedding,
            _ => Self::Casual,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Casual => "casual",
            Self::Professional => "professional",
            Self::Party => "party",
            Self::Wedding => "wedding",
        }
    }
}

/// Advice for one tone and occasion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleRule {
    /// Two main colors followed by two accessory colors.
    pub colors: [&'static str; 4],
    pub tip: &'static str,
    pub outfit: &'static str,
}

/// The rule for a tone and occasion.
#[must_use]
pub const fn style_rule(tone: SkinTone, occasion: Occasion) -> StyleRule {
    use Occasion::{Casual, Party, Professional, Wedding};
    use SkinTone::{Dark, Fair, Medium};

    match (tone, occasion) {
        (Fair, Casual) => StyleRule {
            colors: ["Dusty Pink", "Baby Blue", "Lavender", "Soft Grey"],
            tip: "Pastels look fresh and airy on you for daytime wear.",
            outfit: "A soft pastel sundress or light wash denim with a lavender top.",
        },
        (Fair, Professional) => StyleRule {
            colors: ["Navy Blue", "Camel", "Charcoal", "Crisp White"],
            tip: "Avoid harsh blacks near your face; opt for navy or charcoal instead.",
            outfit: "A tailored navy blazer paired with a crisp white blouse.",
        },
        (Fair, Party) => StyleRule {
            colors: ["Emerald Green", "Ruby Red", "Royal Blue", "Silver"],
            tip: "Jewel tones provide a stunning contrast to your porcelain skin.",
            outfit: "A velvet emerald green dress or a silver sequin top.",
        },
        (Fair, Wedding) => StyleRule {
            colors: ["Blush Pink", "Sage Green", "Lilac", "Gold"],
            tip: "Soft, romantic hues will complement your undertones perfectly.",
            outfit: "A flowing sage green gown with gold accessories.",
        },
        (Medium, Casual) => StyleRule {
            colors: ["Beige", "Olive Green", "Rust", "Cream"],
            tip: "Earth tones are your best friend for a relaxed, natural look.",
            outfit: "Cargo pants in olive paired with a cream linen shirt.",
        },
        (Medium, Professional) => StyleRule {
            colors: ["Burgundy", "Forest Green", "Dark Brown", "Teal"],
            tip: "Rich, warm colors convey confidence and professionalism on you.",
            outfit: "A forest green shift dress or a burgundy knit sweater.",
        },
        (Medium, Party) => StyleRule {
            colors: ["Metallic Gold", "Electric Blue", "Hot Pink", "Bronze"],
            tip: "Don't be afraid of metallics, especially gold and bronze.",
            outfit: "A metallic gold slip dress or an electric blue jumpsuit.",
        },
        (Medium, Wedding) => StyleRule {
            colors: ["Coral", "Turquoise", "Saffron", "Magenta"],
            tip: "Vibrant colors pop beautifully against wheatish skin tones.",
            outfit: "A coral silk saree or a turquoise cocktail dress.",
        },
        (Dark, Casual) => StyleRule {
            colors: ["Bright Yellow", "Cobalt Blue", "White", "Orange"],
            tip: "High contrast colors look incredibly modern and chic on you.",
            outfit: "A bright yellow summer dress or white linen trousers.",
        },
        (Dark, Professional) => StyleRule {
            colors: ["Plum", "Black", "Dark Teal", "Cream"],
            tip: "Deep, saturated colors look authoritative and elegant.",
            outfit: "A monochrome plum power suit or a classic black sheath dress.",
        },
        (Dark, Party) => StyleRule {
            colors: ["Neon Green", "Fuchsia", "Silver", "Bright Red"],
            tip: "You can pull off neon and bold brights better than anyone else.",
            outfit: "A fuchsia bodycon dress or silver statement jewelry.",
        },
        (Dark, Wedding) => StyleRule {
            colors: ["Royal Purple", "Gold", "Emerald", "Bright Red"],
            tip: "Regal colors like purple and gold look majestic on deep skin tones.",
            outfit: "A royal purple gown with heavy gold detailing.",
        },
    }
}

/// Four lines of advice for free-form tone and occasion input.
///
/// The first line echoes the occasion as the user typed it (lowercased and
/// trimmed), or the matched occasion when the input is blank.
#[must_use]
pub fn style_suggestions(skin_tone: &str, occasion: &str) -> Vec<String> {
    let matched = Occasion::from_input(occasion);
    let rule = style_rule(SkinTone::from_input(skin_tone), matched);

    let typed = occasion.trim().to_lowercase();
    let label = if typed.is_empty() { matched.as_str() } else { typed.as_str() };
    let [main, second, accent, other_accent] = rule.colors;

    vec![
        format!("For a {label} event, we recommend: {main}, {second}."),
        format!("Outfit Idea: {}", rule.outfit),
        format!("Stylist Tip: {}", rule.tip),
        format!("Color Palette: Try {accent} or {other_accent} for accessories."),
    ]
}
