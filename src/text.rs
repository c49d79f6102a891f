//! Text cleanup helpers for extracted document content
//!
//! Used on the output of text extraction before it is indexed: mail
//! addresses from message headers, plain and HTML bodies, attachment payloads
//! that may still be base64, and short content fingerprints.

use std::io::Cursor;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Node};
use tracing::warn;

/// Cleaned text is cut to this many characters
pub const MAX_TEXT_LENGTH: usize = 20_000_000;

/// Elements that start a new line in the extracted text
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "footer",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre",
    "section", "table", "td", "th", "tr", "ul",
];

/// Elements whose text is never shown
const HIDDEN_ELEMENTS: &[&str] = &["head", "script", "style", "template", "title"];

fn whitespace_regex() -> &'static Regex {
    static WHITESPACE_REGEX: OnceLock<Regex> = OnceLock::new();
    WHITESPACE_REGEX.get_or_init(|| Regex::new(r"\s+").expect("Invalid whitespace regex"))
}

fn edge_quotes_regex() -> &'static Regex {
    static EDGE_QUOTES_REGEX: OnceLock<Regex> = OnceLock::new();
    EDGE_QUOTES_REGEX
        .get_or_init(|| Regex::new(r#"^["']+|["']+$"#).expect("Invalid quote regex"))
}

fn parenthesized_regex() -> &'static Regex {
    static PARENTHESIZED_REGEX: OnceLock<Regex> = OnceLock::new();
    PARENTHESIZED_REGEX
        .get_or_init(|| Regex::new(r"\(([^)]+)\)").expect("Invalid parenthesis regex"))
}

fn dash_line_regex() -> &'static Regex {
    static DASH_LINE_REGEX: OnceLock<Regex> = OnceLock::new();
    DASH_LINE_REGEX.get_or_init(|| Regex::new(r"^[-\s]*$").expect("Invalid separator regex"))
}

fn tabs_regex() -> &'static Regex {
    static TABS_REGEX: OnceLock<Regex> = OnceLock::new();
    TABS_REGEX.get_or_init(|| Regex::new(r"\t+").expect("Invalid tab regex"))
}

// =============================================================================
// Mail Addresses
// =============================================================================

/// Normalise a raw address header value.
///
/// Whitespace runs collapse to one space, surrounding quotes go, unbalanced
/// parentheses are dropped and `Name (addr)` becomes `Name <addr>`.
pub fn sanitize_email_address(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let collapsed = whitespace_regex().replace_all(raw, " ");
    let mut cleaned = edge_quotes_regex().replace_all(collapsed.trim(), "").into_owned();

    let open = cleaned.matches('(').count();
    let close = cleaned.matches(')').count();
    if close > open {
        cleaned = cleaned.replace(')', "");
    } else if open > close {
        cleaned = cleaned.replace('(', "");
    }

    parenthesized_regex().replace_all(&cleaned, "<$1>").into_owned()
}

// =============================================================================
// Plain Text and HTML
// =============================================================================

/// Trim every line, drop blank and dash-only lines, turn tab runs into a
/// space and cap the length
pub fn clean_text(text: &str) -> String {
    let cleaned = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty() && !dash_line_regex().is_match(line))
        .map(|line| tabs_regex().replace_all(line, " "))
        .collect::<Vec<_>>()
        .join("\n");

    match cleaned.char_indices().nth(MAX_TEXT_LENGTH) {
        Some((cut, _)) => cleaned[..cut].to_string(),
        None => cleaned,
    }
}

/// Visible text of an HTML fragment or document, one block per line
pub fn clean_html_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();

    for node in document.root_element().descendants() {
        // content after a closed block starts on its own line
        if is_block(node.prev_sibling().map(|sibling| sibling.value())) {
            text.push('\n');
        }
        match node.value() {
            Node::Element(element) if BLOCK_ELEMENTS.contains(&element.name()) => {
                text.push('\n');
            }
            Node::Text(fragment) => {
                let hidden = node
                    .parent()
                    .and_then(|parent| parent.value().as_element())
                    .is_some_and(|parent| HIDDEN_ELEMENTS.contains(&parent.name()));
                if !hidden {
                    text.push_str(&whitespace_regex().replace_all(fragment, " "));
                }
            }
            _ => {}
        }
    }

    clean_text(&text)
}

fn is_block(node: Option<&Node>) -> bool {
    matches!(node, Some(Node::Element(element)) if BLOCK_ELEMENTS.contains(&element.name()))
}

// =============================================================================
// Payload Checks and Fingerprints
// =============================================================================

/// True if `data` is non-empty and only holds base64 alphabet characters
/// once line breaks are ignored
pub fn looks_like_base64(data: &[u8]) -> bool {
    let mut payload = data.iter().filter(|&&b| b != b'\r' && b != b'\n').peekable();
    payload.peek().is_some()
        && payload.all(|&b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
}

/// 32-bit MurmurHash3 (seed 0) of the UTF-8 text as eight lowercase hex digits
pub fn murmur_hash_hex(text: &str) -> String {
    match murmur3::murmur3_32(&mut Cursor::new(text.as_bytes()), 0) {
        Ok(hash) => format!("{:08x}", hash),
        Err(e) => {
            warn!(error = %e, "MurmurHash computation failed");
            String::new()
        }
    }
}
