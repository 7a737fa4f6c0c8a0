//! Markdown emphasis to rich text tags for long-form tweets.
//!
//! Long-form posts carry plain text plus a list of ranges with formatting
//! types. This module strips `**bold**`, `__bold__`, `*italic*` and `_italic_`
//! markers from the text and reports the formatted ranges. Indices count
//! characters of the resulting plain text.

use serde::Serialize;

/// Formatting applied to a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RichtextType {
    Bold,
    Italic,
}

/// A formatted range of the plain text, `from_index..to_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RichtextTag {
    pub from_index: usize,
    pub to_index: usize,
    pub richtext_types: Vec<RichtextType>,
}

#[derive(Debug, Clone, Copy)]
struct Mark {
    start: usize,
    end: usize,
    kind: RichtextType,
}

impl Mark {
    fn marker_width(&self) -> usize {
        match self.kind {
            RichtextType::Bold => 2,
            RichtextType::Italic => 1,
        }
    }
}

/// Converts markdown emphasis into plain text and rich text tags.
///
/// A `*` marker is only recognised when it is not part of a longer run of
/// `*`; the same holds for the single `_` marker. Marks that overlap an
/// earlier mark are left in the text untouched.
pub fn parse_markdown_to_richtext(text: &str) -> (String, Vec<RichtextTag>) {
    let chars: Vec<char> = text.chars().collect();

    let mut marks = find_marks(&chars, RichtextType::Bold);
    marks.extend(find_marks(&chars, RichtextType::Italic));
    marks.sort_by_key(|m| (m.start, m.end));

    let mut plain = String::with_capacity(text.len());
    let mut tags = Vec::new();
    let mut plain_len = 0usize;
    let mut consumed = 0usize;

    for mark in marks {
        if mark.start < consumed {
            continue;
        }
        let width = mark.marker_width();

        plain.extend(&chars[consumed..mark.start]);
        plain_len += mark.start - consumed;

        let content = &chars[mark.start + width..mark.end - width];
        plain.extend(content);
        tags.push(RichtextTag {
            from_index: plain_len,
            to_index: plain_len + content.len(),
            richtext_types: vec![mark.kind],
        });
        plain_len += content.len();
        consumed = mark.end;
    }
    plain.extend(&chars[consumed..]);

    (plain, tags)
}

/// Leftmost non-overlapping marks of one kind.
fn find_marks(chars: &[char], kind: RichtextType) -> Vec<Mark> {
    let mut marks = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let end = match_marker(chars, i, '*', kind).or_else(|| match_marker(chars, i, '_', kind));
        match end {
            Some(end) => {
                marks.push(Mark { start: i, end, kind });
                i = end;
            }
            None => i += 1,
        }
    }
    marks
}

/// Exclusive end of an emphasis span opening at `start`, if there is one.
fn match_marker(chars: &[char], start: usize, marker: char, kind: RichtextType) -> Option<usize> {
    let width = match kind {
        RichtextType::Bold => 2,
        RichtextType::Italic => 1,
    };
    // `__bold__` is the only form not guarded against adjacent markers.
    let guarded = !(kind == RichtextType::Bold && marker == '_');
    let is_marker = |idx: usize| chars.get(idx) == Some(&marker);

    if !(start..start + width).all(is_marker) {
        return None;
    }
    if guarded && start > 0 && is_marker(start - 1) {
        return None;
    }

    let content_start = start + width;
    let content_end = (content_start..chars.len())
        .find(|&idx| is_marker(idx))
        .unwrap_or(chars.len());
    if content_end == content_start {
        return None;
    }

    if !(content_end..content_end + width).all(is_marker) {
        return None;
    }
    let end = content_end + width;
    if guarded && is_marker(end) {
        return None;
    }
    Some(end)
}
