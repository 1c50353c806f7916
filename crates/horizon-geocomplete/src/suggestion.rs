//! Display-ready suggestions built from place predictions.
//!
//! The service reports matched substrings as UTF-16 offsets into the main
//! text. They are converted to byte ranges, merged, and used to split the text
//! into plain and emphasized segments. The markup form wraps emphasized runs
//! in `<strong>` and escapes every piece of interpolated text.

use std::fmt;
use std::ops::Range;

use horizon_geocomplete_net::places::{MatchedSubstring, Prediction};
use quick_xml::escape::escape;

/// A run of text that is either plain or emphasized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextSegment {
    /// The raw, unescaped text.
    pub text: String,
    /// Whether the run matched the query.
    pub emphasized: bool,
}

impl TextSegment {
    /// A plain run.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasized: false,
        }
    }

    /// An emphasized run.
    pub fn emphasized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasized: true,
        }
    }
}

/// A prediction prepared for display in the suggestion list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Suggestion {
    /// Place identifier, used to geocode the selection.
    pub place_id: String,
    /// Full description; this is what goes into the input when selected.
    pub description: String,
    /// Main text split into matched and unmatched runs.
    pub main_segments: Vec<TextSegment>,
    /// Main text as escaped markup with `<strong>` around matches.
    pub main_markup: String,
    /// Secondary text, unescaped.
    pub secondary_text: String,
    /// Secondary text, escaped.
    pub secondary_markup: String,
}

impl Suggestion {
    /// Build a suggestion from a prediction.
    pub fn from_prediction(prediction: &Prediction) -> Self {
        let formatting = &prediction.structured_formatting;
        let main_segments = segments(
            &formatting.main_text,
            &formatting.main_text_matched_substrings,
        );
        Self {
            place_id: prediction.place_id.clone(),
            description: prediction.description.clone(),
            main_markup: markup(&main_segments),
            main_segments,
            secondary_text: formatting.secondary_text.clone(),
            secondary_markup: escape(formatting.secondary_text.as_str()).into_owned(),
        }
    }

    /// The unformatted main text.
    pub fn main_text(&self) -> String {
        self.main_segments.iter().map(|s| s.text.as_str()).collect()
    }
}

impl From<&Prediction> for Suggestion {
    fn from(prediction: &Prediction) -> Self {
        Self::from_prediction(prediction)
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Split `text` into runs, emphasizing the matched substrings.
///
/// Out-of-range, empty and overlapping matches are tolerated.
pub fn segments(text: &str, matches: &[MatchedSubstring]) -> Vec<TextSegment> {
    let mut out = Vec::new();
    let mut cursor = 0;
    for range in byte_ranges(text, matches) {
        if range.start > cursor {
            out.push(TextSegment::plain(&text[cursor..range.start]));
        }
        out.push(TextSegment::emphasized(&text[range.clone()]));
        cursor = range.end;
    }
    if cursor < text.len() {
        out.push(TextSegment::plain(&text[cursor..]));
    }
    out
}

/// Render runs as escaped markup.
pub fn markup(segments: &[TextSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        let text = escape(segment.text.as_str());
        if segment.emphasized {
            out.push_str("<strong>");
            out.push_str(&text);
            out.push_str("</strong>");
        } else {
            out.push_str(&text);
        }
    }
    out
}

/// Convert UTF-16 matches into sorted, merged, non-empty byte ranges.
fn byte_ranges(text: &str, matches: &[MatchedSubstring]) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = matches
        .iter()
        .map(|m| {
            let start = utf16_to_byte(text, m.offset);
            let end = utf16_to_byte(text, m.offset.saturating_add(m.length));
            start..end
        })
        .filter(|r| r.start < r.end)
        .collect();
    ranges.sort_by_key(|r| r.start);

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

/// Byte offset of the char boundary at or after `offset` UTF-16 units.
fn utf16_to_byte(text: &str, offset: usize) -> usize {
    let mut units = 0;
    for (byte, ch) in text.char_indices() {
        if units >= offset {
            return byte;
        }
        units += ch.len_utf16();
    }
    text.len()
}

#[cfg(test)]
mod tests {
    use horizon_geocomplete_net::places::StructuredFormatting;

    use super::*;

    fn prediction(main: &str, matches: Vec<MatchedSubstring>, secondary: &str) -> Prediction {
        Prediction {
            description: format!("{main}, {secondary}"),
            place_id: "place".to_string(),
            structured_formatting: StructuredFormatting {
                main_text: main.to_string(),
                main_text_matched_substrings: matches,
                secondary_text: secondary.to_string(),
            },
            ..Prediction::default()
        }
    }

    #[test]
    fn test_prefix_match_is_emphasized() {
        let segments = segments("Berlin, Germany", &[MatchedSubstring::new(0, 4)]);
        assert_eq!(
            segments,
            vec![
                TextSegment::emphasized("Berl"),
                TextSegment::plain("in, Germany"),
            ]
        );
        assert_eq!(markup(&segments), "<strong>Berl</strong>in, Germany");
    }

    #[test]
    fn test_no_matches_is_single_plain_run() {
        assert_eq!(segments("Berlin", &[]), vec![TextSegment::plain("Berlin")]);
        assert!(segments("", &[MatchedSubstring::new(0, 3)]).is_empty());
    }

    #[test]
    fn test_overlapping_and_out_of_range_matches() {
        let matches = [
            MatchedSubstring::new(4, 2),
            MatchedSubstring::new(0, 2),
            MatchedSubstring::new(1, 2),
            MatchedSubstring::new(50, 3),
        ];
        let segments = segments("Potsdam", &matches);
        assert_eq!(
            segments,
            vec![
                TextSegment::emphasized("Pot"),
                TextSegment::plain("s"),
                TextSegment::emphasized("da"),
                TextSegment::plain("m"),
            ]
        );
    }

    #[test]
    fn test_utf16_offsets() {
        // "Ö" is one UTF-16 unit but two bytes; the emoji is two units.
        let segments = segments("Öland 🏝 Island", &[MatchedSubstring::new(0, 3), MatchedSubstring::new(9, 6)]);
        assert_eq!(segments[0], TextSegment::emphasized("Öla"));
        assert_eq!(segments[1], TextSegment::plain("nd 🏝 "));
        assert_eq!(segments[2], TextSegment::emphasized("Island"));
    }

    #[test]
    fn test_markup_escapes_text() {
        let suggestion = Suggestion::from_prediction(&prediction(
            "<b>Tom & Jerry</b>",
            vec![MatchedSubstring::new(3, 3)],
            "\"Cartoon\" Land",
        ));
        assert_eq!(
            suggestion.main_markup,
            "&lt;b&gt;<strong>Tom</strong> &amp; Jerry&lt;/b&gt;"
        );
        assert_eq!(suggestion.secondary_markup, "&quot;Cartoon&quot; Land");
        assert_eq!(suggestion.main_text(), "<b>Tom & Jerry</b>");
    }

    #[test]
    fn test_display_is_description() {
        let suggestion = Suggestion::from(&prediction("Berlin", vec![], "Germany"));
        assert_eq!(suggestion.to_string(), "Berlin, Germany");
    }
}
