use serde::Serialize;

/// Display attributes for one emotion label.
#[derive(Debug, Clone, Serialize)]
pub struct EmotionMeta {
    #[serde(skip)]
    pub label: &'static str,
    pub emoji: &'static str,
    pub color: &'static str,
    pub bg_color: &'static str,
}

/// Recommended follow-up actions for one emotion label.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionSet {
    #[serde(skip)]
    pub label: &'static str,
    pub music: &'static str,
    pub activity: &'static str,
    pub meditation: &'static str,
}

/// The canonical label set the service presents. The loaded model may expose
/// a different set; lookups below stay total either way.
pub const CANONICAL_LABELS: [&str; 7] = [
    "happy",
    "sad",
    "angry",
    "surprised",
    "fear",
    "disgust",
    "neutral",
];

static METADATA: &[EmotionMeta] = &[
    EmotionMeta { label: "happy", emoji: "\u{1F604}", color: "#28a745", bg_color: "#d4edda" },
    EmotionMeta { label: "sad", emoji: "\u{1F622}", color: "#6c757d", bg_color: "#e2e3e5" },
    EmotionMeta { label: "angry", emoji: "\u{1F620}", color: "#dc3545", bg_color: "#f8d7da" },
    EmotionMeta { label: "surprised", emoji: "\u{1F62E}", color: "#ffc107", bg_color: "#fff3cd" },
    EmotionMeta { label: "fear", emoji: "\u{1F628}", color: "#6f42c1", bg_color: "#e2d9f3" },
    EmotionMeta { label: "disgust", emoji: "\u{1F922}", color: "#fd7e14", bg_color: "#ffeaa7" },
    EmotionMeta { label: "neutral", emoji: "\u{1F610}", color: "#17a2b8", bg_color: "#d1ecf1" },
];

static SUGGESTIONS: &[SuggestionSet] = &[
    SuggestionSet {
        label: "happy",
        music: "https://www.youtube.com/results?search_query=happy+upbeat+music",
        activity: "Share your positive mood with friends and family!",
        meditation: "Try gratitude meditation to enhance your happiness.",
    },
    SuggestionSet {
        label: "sad",
        music: "https://www.youtube.com/results?search_query=uplifting+inspirational+music",
        activity: "Consider talking to a friend or engaging in a favorite hobby.",
        meditation: "Try self-compassion meditation to lift your spirits.",
    },
    SuggestionSet {
        label: "angry",
        music: "https://www.youtube.com/results?search_query=calming+meditation+music",
        activity: "Take deep breaths and try some physical exercise.",
        meditation: "Practice anger management meditation techniques.",
    },
    SuggestionSet {
        label: "surprised",
        music: "https://www.youtube.com/results?search_query=exciting+adventure+music",
        activity: "Channel your surprise into creative activities!",
        meditation: "Try mindfulness meditation to process the surprise.",
    },
    SuggestionSet {
        label: "fear",
        music: "https://www.youtube.com/results?search_query=soothing+calm+music",
        activity: "Practice grounding techniques and reach out for support.",
        meditation: "Try anxiety-reducing meditation practices.",
    },
    SuggestionSet {
        label: "disgust",
        music: "https://www.youtube.com/results?search_query=refreshing+clean+music",
        activity: "Engage in activities that bring you joy and comfort.",
        meditation: "Practice cleansing meditation techniques.",
    },
    SuggestionSet {
        label: "neutral",
        music: "https://www.youtube.com/results?search_query=peaceful+ambient+music",
        activity: "Perfect time for reflection and planning.",
        meditation: "Try balanced meditation for inner peace.",
    },
];

/// Total lookup: unrecognized labels fall back to the neutral entry.
pub fn metadata_for(label: &str) -> &'static EmotionMeta {
    METADATA
        .iter()
        .find(|m| m.label == label)
        .unwrap_or_else(|| &METADATA[METADATA.len() - 1])
}

/// Total lookup: unrecognized labels fall back to the neutral entry.
pub fn suggestions_for(label: &str) -> &'static SuggestionSet {
    SUGGESTIONS
        .iter()
        .find(|s| s.label == label)
        .unwrap_or_else(|| &SUGGESTIONS[SUGGESTIONS.len() - 1])
}

/// Parse a `#rrggbb` display color into unit-range RGB. Unparseable input
/// falls back to black.
pub fn hex_to_rgb(hex: &str) -> (f32, f32, f32) {
    let hex = hex.trim_start_matches('#');
    // Byte-range slicing below requires single-byte characters.
    if hex.len() != 6 || !hex.is_ascii() {
        return (0.0, 0.0, 0.0);
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).unwrap_or(0) as f32 / 255.0
    };
    (channel(0..2), channel(2..4), channel(4..6))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_canonical_label_has_metadata_and_suggestions() {
        for label in CANONICAL_LABELS {
            assert_eq!(metadata_for(label).label, label);
            assert_eq!(suggestions_for(label).label, label);
        }
    }

    #[test]
    fn unknown_labels_default_to_neutral() {
        assert_eq!(metadata_for("ecstatic").label, "neutral");
        assert_eq!(suggestions_for("").label, "neutral");
    }

    #[test]
    fn parses_display_colors() {
        assert_eq!(hex_to_rgb("#ffffff"), (1.0, 1.0, 1.0));
        let (r, g, b) = hex_to_rgb("#28a745");
        assert!((r - 40.0 / 255.0).abs() < 1e-6);
        assert!((g - 167.0 / 255.0).abs() < 1e-6);
        assert!((b - 69.0 / 255.0).abs() < 1e-6);
        assert_eq!(hex_to_rgb("nope"), (0.0, 0.0, 0.0));
    }

    #[test]
    fn multibyte_input_falls_back_without_panicking() {
        // Six bytes but not six ASCII characters.
        assert_eq!(hex_to_rgb("#a\u{e9}0\u{e9}"), (0.0, 0.0, 0.0));
        assert_eq!(hex_to_rgb("\u{1F604}ab"), (0.0, 0.0, 0.0));
    }
}
