//! Rich-text flattening: turns editor HTML into the plain text that gets
//! sectioned and read aloud.
//!
//! Emphasis survives as inline markers the voice model understands
//! (`**bold**`, `*italic*`, `_underline_`); block structure survives as line
//! breaks, with paragraphs separated by a blank line so the sectionizer can
//! find them.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

// ─────────────────────────────────────────────────────────────────────────────
// Compiled regexes (lazily initialised once)
// ─────────────────────────────────────────────────────────────────────────────

static RE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<\s*(/?)\s*([a-zA-Z][a-zA-Z0-9]*)\b[^>]*>").unwrap());
static RE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static RE_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap());
static RE_EXTRA_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

// ─────────────────────────────────────────────────────────────────────────────
// Entities
// ─────────────────────────────────────────────────────────────────────────────

fn named_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        "mdash" => "—",
        "ndash" => "–",
        "hellip" => "…",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        _ => return None,
    })
}

/// Decode the character references an editor typically emits.  Unknown
/// references are left untouched.
pub fn decode_entities(text: &str) -> String {
    RE_ENTITY
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32).map(String::from)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32).map(String::from)
            } else {
                named_entity(body).map(str::to_string)
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Flattening
// ─────────────────────────────────────────────────────────────────────────────

enum List {
    Bulleted,
    Numbered(usize),
}

fn open_tag(tag: &str, lists: &mut [List], out: &mut String) {
    match tag {
        "strong" | "b" => out.push_str("**"),
        "em" | "i" => out.push('*'),
        "u" => out.push('_'),
        "br" => out.push('\n'),
        "h1" | "h2" | "h3" => out.push_str("\n\n"),
        "li" => match lists.last_mut() {
            Some(List::Bulleted) => out.push_str("• "),
            Some(List::Numbered(n)) => {
                *n += 1;
                out.push_str(&format!("{}. ", n));
            }
            None => {}
        },
        _ => {}
    }
}

fn close_tag(tag: &str, in_list: bool, out: &mut String) {
    match tag {
        "strong" | "b" => out.push_str("**"),
        "em" | "i" => out.push('*'),
        "u" => out.push('_'),
        "p" | "h1" | "h2" | "h3" => out.push_str("\n\n"),
        "li" if in_list => out.push('\n'),
        _ => {}
    }
}

/// Convert editor HTML to plain text for speech.
///
/// ```
/// use storyvoice::format::flatten_html;
///
/// let text = flatten_html("<p>It was <b>dark</b>.</p><p>Very <i>dark</i>.</p>");
/// assert_eq!(text, "It was **dark**.\n\nVery *dark*.");
/// ```
pub fn flatten_html(html: &str) -> String {
    let html = RE_COMMENT.replace_all(html, "");
    let mut out = String::with_capacity(html.len());
    let mut lists: Vec<List> = Vec::new();
    let mut last = 0;

    for caps in RE_TAG.captures_iter(&html) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        out.push_str(&decode_entities(&html[last..whole.start()]));
        last = whole.end();

        let tag = name.as_str().to_ascii_lowercase();
        let closing = !caps[1].is_empty();
        match (tag.as_str(), closing) {
            ("ul", false) => lists.push(List::Bulleted),
            ("ol", false) => lists.push(List::Numbered(0)),
            ("ul" | "ol", true) => {
                lists.pop();
            }
            (_, false) => open_tag(&tag, &mut lists, &mut out),
            (_, true) => close_tag(&tag, !lists.is_empty(), &mut out),
        }
    }
    out.push_str(&decode_entities(&html[last..]));

    RE_EXTRA_NEWLINES.replace_all(&out, "\n\n").trim().to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_markers() {
        assert_eq!(
            flatten_html("<strong>A</strong> <em>b</em> <u>c</u> <B>d</B>"),
            "**A** *b* _c_ **d**"
        );
    }

    #[test]
    fn test_paragraphs_and_breaks() {
        assert_eq!(
            flatten_html("<p>One<br>two</p>\n<p>Three<br/></p>"),
            "One\ntwo\n\nThree"
        );
    }

    #[test]
    fn test_headings_collapse_newlines() {
        assert_eq!(
            flatten_html("<h1>Title</h1><p>Body.</p>"),
            "Title\n\nBody."
        );
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            flatten_html("<ul><li>apples</li><li>pears</li></ul>"),
            "• apples\n• pears"
        );
        assert_eq!(
            flatten_html("<ol><li>first</li><li>second</li></ol>"),
            "1. first\n2. second"
        );
    }

    #[test]
    fn test_nested_lists_keep_their_own_numbering() {
        let html = "<ol><li>a<ul><li>x</li></ul></li><li>b</li></ol>";
        assert_eq!(flatten_html(html), "1. a• x\n\n2. b");
    }

    #[test]
    fn test_entities_and_unknown_tags() {
        assert_eq!(
            flatten_html("<div class=\"x\">Fish &amp; chips&nbsp;&#8212; &#x41;&bogus;</div>"),
            "Fish & chips — A&bogus;"
        );
    }

    #[test]
    fn test_comments_removed() {
        assert_eq!(flatten_html("a<!-- <b>hidden</b> -->b"), "ab");
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(flatten_html("  Just text.\n\n\n\nMore.  "), "Just text.\n\nMore.");
    }

    #[test]
    fn test_flattened_output_sections_on_paragraphs() {
        let text = flatten_html("<p>First part.</p><p>Second part.</p>");
        let sections = crate::sectionize::sectionize(&text, 14).unwrap();
        assert_eq!(sections, vec!["First part.", "Second part."]);
    }
}
