//! House-style normalization transforms applied to a document body (and its
//! footnotes) before renumbering. All of them are pure tree rewrites.

pub mod fields;
pub mod placeholders;
pub mod runs;
pub mod scrub;
pub mod styles;
pub mod tables;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::docx::xml::Element;

/// A brace-delimited production marker (`{APPENDIX}`, `{insert source}` ...).
pub static BRACE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^{}]+\}").expect("regex"));

pub(crate) fn contains_brace_token(el: &Element) -> bool {
    BRACE_TOKEN.is_match(&el.text())
}
