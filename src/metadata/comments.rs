/// Human-readable comments derived from a verdict
///
/// Comments are display text only; they are rebuilt from the stored
/// verdict every time and never persisted.

use super::record::{Attribute, Verdict};

/// Scores at or above this emit the attribute's positive phrase
pub const POSITIVE_THRESHOLD: f32 = 0.10;
/// Scores at or below this emit the attribute's negative phrase
pub const NEGATIVE_THRESHOLD: f32 = -0.10;

/// Highlights and potential improvements, one phrase per line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments {
    pub highlights: String,
    pub improvements: String,
}

impl Comments {
    pub fn from_verdict(verdict: &Verdict) -> Self {
        let mut comments = Comments::default();

        for (attribute, value) in verdict.iter() {
            if value >= POSITIVE_THRESHOLD {
                push_line(&mut comments.highlights, positive_phrase(attribute));
            } else if value <= NEGATIVE_THRESHOLD {
                if let Some(phrase) = negative_phrase(attribute) {
                    push_line(&mut comments.improvements, phrase);
                }
            }
        }

        comments
    }
}

fn push_line(text: &mut String, phrase: &str) {
    text.push_str(phrase);
    text.push('\n');
}

fn positive_phrase(attribute: Attribute) -> &'static str {
    match attribute {
        Attribute::BalancingElement => "Balanced elements",
        Attribute::ColorHarmony => "Colour harmony",
        Attribute::Content => "Interesting content.",
        Attribute::DepthOfField => "Good Depth of Field.",
        Attribute::Light => "Interesting lighting.",
        Attribute::MotionBlur => "Good motion blur.",
        Attribute::Object => "Clear/emphasized object.",
        Attribute::Repetition => "Repeated pattern.",
        Attribute::Symmetry => "Symmetry pattern.",
        Attribute::RuleOfThirds => "Good usage of Rule of Thirds",
        Attribute::VividColor => "Vivid colour.",
    }
}

/// Repetition and symmetry are only ever praised, never criticised
fn negative_phrase(attribute: Attribute) -> Option<&'static str> {
    match attribute {
        Attribute::BalancingElement => Some("Unbalanced elements."),
        Attribute::ColorHarmony => Some("Bad colour combination."),
        Attribute::Content => Some("Boring content."),
        Attribute::DepthOfField => Some("Out of Focus on Foreground."),
        Attribute::Light => Some("Bad lighting."),
        Attribute::MotionBlur => Some("Undesired motion blur."),
        Attribute::Object => Some("No object emphasis."),
        Attribute::Repetition | Attribute::Symmetry => None,
        Attribute::RuleOfThirds => Some("Bad component placement(Rule of Thirds)."),
        Attribute::VividColor => Some("Dull/boring colour."),
    }
}
