//! Style suggestions. Runs locally; no configuration needed.

use fitroom_storefront::stylist;
use tracing::info;

/// Log the four suggestion lines for a skin tone and occasion.
pub fn suggest(skin_tone: &str, occasion: &str) {
    let advice = stylist::suggest(skin_tone, occasion);
    info!(tone = ?advice.skin_tone, occasion = advice.occasion.as_str(), "Style advice");
    for line in &advice.suggestions {
        info!("{line}");
    }
}
