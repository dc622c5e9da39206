//! Score quality bands for display

/// Display band for a similarity score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityBand {
    pub label: &'static str,
    pub color: &'static str,
    pub emoji: &'static str,
}

impl QualityBand {
    /// Map a similarity score to its display band
    pub fn for_score(score: u8) -> Self {
        if score >= 85 {
            Self {
                label: "Excellent Match!",
                color: "#22c55e",
                emoji: "🎯",
            }
        } else if score >= 70 {
            Self {
                label: "Very Good Match",
                color: "#65a30d",
                emoji: "👍",
            }
        } else if score >= 55 {
            Self {
                label: "Good Match",
                color: "#84cc16",
                emoji: "👌",
            }
        } else if score >= 40 {
            Self {
                label: "Fair Match",
                color: "#ca8a04",
                emoji: "🤔",
            }
        } else if score >= 25 {
            Self {
                label: "Poor Match",
                color: "#ea580c",
                emoji: "😐",
            }
        } else {
            Self {
                label: "Very Poor Match",
                color: "#dc2626",
                emoji: "😟",
            }
        }
    }
}
