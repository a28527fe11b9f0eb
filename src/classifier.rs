//! Element classification
//!
//! Maps an element to the human-readable description used in every event's
//! `element` field, e.g. `image [hero] (Logo)` or `text (Lorem ipsum dolor...)`.

use crate::config::DEFAULT_TRACK_ID_ATTRIBUTE;
use crate::dom::Element;

/// Paragraph text is cut to this many characters
const PARAGRAPH_PREVIEW_CHARS: usize = 30;

/// List item text is cut to this many characters
const LIST_ITEM_PREVIEW_CHARS: usize = 20;

/// Describes elements by tag, text and optional tracking identifier
#[derive(Debug, Clone)]
pub struct ElementClassifier {
    track_id_attribute: String,
}

impl Default for ElementClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_TRACK_ID_ATTRIBUTE)
    }
}

impl ElementClassifier {
    pub fn new(track_id_attribute: &str) -> Self {
        Self {
            track_id_attribute: track_id_attribute.to_string(),
        }
    }

    /// Describe an element. Missing attributes fall back to empty strings.
    pub fn describe(&self, element: &Element) -> String {
        let track = match element.attr(&self.track_id_attribute) {
            Some(id) if !id.is_empty() => format!(" [{}]", id),
            _ => String::new(),
        };
        let text = element.text.trim();

        match element.tag.to_ascii_uppercase().as_str() {
            "IMG" => {
                let label = match element.attr("alt") {
                    Some(alt) if !alt.is_empty() => alt,
                    _ => element
                        .attr("src")
                        .and_then(|src| src.rsplit('/').next())
                        .unwrap_or(""),
                };
                format!("image{} ({})", track, label)
            }
            "A" => {
                let label = if text.is_empty() {
                    element.attr("href").unwrap_or("")
                } else {
                    text
                };
                format!("link{} ({})", track, label)
            }
            "P" => format!("text{} ({})", track, preview(text, PARAGRAPH_PREVIEW_CHARS)),
            "BUTTON" => format!("button{} ({})", track, text),
            "SELECT" => format!("drop-down{}", track),
            "INPUT" => format!("input{} ({})", track, element.attr("type").unwrap_or("text")),
            "LI" => format!(
                "list-item{} ({})",
                track,
                preview(text, LIST_ITEM_PREVIEW_CHARS)
            ),
            "H1" | "H2" | "H3" => format!("heading{} ({})", track, text),
            _ => {
                let classes = if element.classes.is_empty() {
                    "no-class".to_string()
                } else {
                    element.classes.join(" ")
                };
                format!("{}{} ({})", element.tag.to_lowercase(), track, classes)
            }
        }
    }
}

/// First `limit` characters, with `...` appended when the text was longer
pub fn preview(text: &str, limit: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(limit).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// First `limit` characters, without any marker
pub fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn describe(element: &Element) -> String {
        ElementClassifier::default().describe(element)
    }

    #[test]
    fn test_image_with_track_id_and_alt() {
        let img = Element::new(1, "IMG")
            .with_attr("data-track-id", "hero")
            .with_attr("alt", "Logo")
            .with_attr("src", "https://cdn.example.com/img/logo.png");
        assert_eq!(describe(&img), "image [hero] (Logo)");
    }

    #[test]
    fn test_image_falls_back_to_filename() {
        let img = Element::new(1, "img").with_attr("src", "https://cdn.example.com/img/logo.png");
        assert_eq!(describe(&img), "image (logo.png)");
    }

    #[test]
    fn test_image_without_alt_or_src() {
        let img = Element::new(1, "IMG");
        assert_eq!(describe(&img), "image ()");
    }

    #[test]
    fn test_link_text_or_href() {
        let link = Element::new(1, "A")
            .with_text("  Pricing  ")
            .with_attr("href", "/pricing");
        assert_eq!(describe(&link), "link (Pricing)");

        let bare = Element::new(2, "A").with_attr("href", "/pricing");
        assert_eq!(describe(&bare), "link (/pricing)");
    }

    #[test]
    fn test_paragraph_preview() {
        let short = Element::new(1, "P").with_text("Short text");
        assert_eq!(describe(&short), "text (Short text)");

        let long = Element::new(2, "P")
            .with_attr("data-track-id", "intro")
            .with_text("Lorem ipsum dolor sit amet, consectetur adipiscing elit");
        assert_eq!(describe(&long), "text [intro] (Lorem ipsum dolor sit amet, co...)");
    }

    #[test]
    fn test_paragraph_exactly_at_limit_has_no_ellipsis() {
        let text = "a".repeat(30);
        let p = Element::new(1, "P").with_text(&text);
        assert_eq!(describe(&p), format!("text ({})", text));
    }

    #[test]
    fn test_button_select_input() {
        let button = Element::new(1, "BUTTON").with_text(" Buy now ");
        assert_eq!(describe(&button), "button (Buy now)");

        let select = Element::new(2, "SELECT").with_attr("data-track-id", "size");
        assert_eq!(describe(&select), "drop-down [size]");

        let input = Element::new(3, "INPUT").with_attr("type", "email");
        assert_eq!(describe(&input), "input (email)");

        let untyped = Element::new(4, "INPUT");
        assert_eq!(describe(&untyped), "input (text)");
    }

    #[test]
    fn test_list_item_and_headings() {
        let li = Element::new(1, "LI").with_text("Free shipping on all orders");
        assert_eq!(describe(&li), "list-item (Free shipping on all...)");

        for tag in ["H1", "H2", "H3"] {
            let h = Element::new(2, tag).with_text(" Features ");
            assert_eq!(describe(&h), "heading (Features)");
        }

        let h4 = Element::new(3, "H4").with_text("Minor");
        assert_eq!(describe(&h4), "h4 (no-class)");
    }

    #[test]
    fn test_default_branch_lists_classes() {
        let section = Element::new(1, "SECTION")
            .with_class("track-view")
            .with_class("pricing");
        assert_eq!(describe(&section), "section (track-view pricing)");
    }

    #[test]
    fn test_custom_track_attribute() {
        let classifier = ElementClassifier::new("data-analytics");
        let button = Element::new(1, "BUTTON")
            .with_attr("data-analytics", "cta")
            .with_attr("data-track-id", "ignored")
            .with_text("Go");
        assert_eq!(classifier.describe(&button), "button [cta] (Go)");
    }

    #[test]
    fn test_preview_counts_characters() {
        assert_eq!(preview("héllo wörld", 5), "héllo...");
        assert_eq!(truncate("héllo", 2), "hé");
    }
}
