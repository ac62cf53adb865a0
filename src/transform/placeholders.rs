//! Brace-delimited production markers. `{APPENDIX}` and `{BIBLIOGRAPHY}` are
//! resolved to heading styles; any other `{...}` is an insert request left
//! for human review, flagged with a highlight rather than resolved.

use crate::config::HouseStyle;
use crate::docx::xml::{Element, Node};
use crate::transform::styles::set_paragraph_style;
use crate::transform::BRACE_TOKEN;

const APPENDIX_TOKEN: &str = "{APPENDIX}";
const BIBLIOGRAPHY_TOKEN: &str = "{BIBLIOGRAPHY}";

pub fn resolve_placeholders(root: &Element, style: &HouseStyle) -> Element {
    let mut out = Element {
        name: root.name.clone(),
        attrs: root.attrs.clone(),
        children: Vec::with_capacity(root.children.len()),
    };
    for child in &root.children {
        match child {
            Node::Text(t) => out.children.push(Node::Text(t.clone())),
            Node::Element(e) if e.name == "w:p" => {
                out.children.push(Node::Element(resolve_paragraph(e, style)));
            }
            Node::Element(e) => out
                .children
                .push(Node::Element(resolve_placeholders(e, style))),
        }
    }
    out
}

fn resolve_paragraph(p: &Element, style: &HouseStyle) -> Element {
    let text = p.text();
    if text.contains(APPENDIX_TOKEN) {
        let mut out = rewrite_texts(p, &|t| t.replace(APPENDIX_TOKEN, "").trim().to_string());
        set_paragraph_style(&mut out, &style.appendix_heading);
        return out;
    }
    if text.contains(BIBLIOGRAPHY_TOKEN) {
        let mut out = rewrite_texts(p, &|t| t.replace(BIBLIOGRAPHY_TOKEN, "Bibliography"));
        set_paragraph_style(&mut out, &style.pre_heading);
        return out;
    }
    if BRACE_TOKEN.is_match(&text) {
        return highlight_token_runs(p, style);
    }
    p.clone()
}

fn rewrite_texts(el: &Element, f: &impl Fn(&str) -> String) -> Element {
    let mut out = Element {
        name: el.name.clone(),
        attrs: el.attrs.clone(),
        children: Vec::with_capacity(el.children.len()),
    };
    for child in &el.children {
        match child {
            Node::Element(e) if e.name == "w:t" => {
                let mut t = e.clone();
                t.children = vec![Node::Text(f(&e.text()))];
                out.children.push(Node::Element(t));
            }
            Node::Element(e) => out.children.push(Node::Element(rewrite_texts(e, f))),
            Node::Text(t) => out.children.push(Node::Text(t.clone())),
        }
    }
    out
}

/// Flag runs whose text carries a `{...}` token with the insert-request
/// highlight so the unresolved marker is visible in review.
fn highlight_token_runs(p: &Element, style: &HouseStyle) -> Element {
    let mut out = Element {
        name: p.name.clone(),
        attrs: p.attrs.clone(),
        children: Vec::with_capacity(p.children.len()),
    };
    for child in &p.children {
        match child {
            Node::Element(e) if e.name == "w:r" && BRACE_TOKEN.is_match(&e.text()) => {
                out.children
                    .push(Node::Element(with_highlight(e, &style.insert_request_highlight)));
            }
            Node::Element(e) => out
                .children
                .push(Node::Element(highlight_token_runs(e, style))),
            Node::Text(t) => out.children.push(Node::Text(t.clone())),
        }
    }
    out
}

fn with_highlight(run: &Element, color: &str) -> Element {
    let mut out = run.clone();
    let highlight = Element::new("w:highlight").with_attr("w:val", color);
    for child in out.children.iter_mut() {
        if let Node::Element(e) = child {
            if e.name == "w:rPr" {
                if e.child("w:highlight").is_none() {
                    e.push(Node::Element(highlight));
                }
                return out;
            }
        }
    }
    out.children.insert(
        0,
        Node::Element(Element::new("w:rPr").with_child(highlight)),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::resolve_placeholders;
    use crate::config::HouseStyle;
    use crate::docx::xml::Element;

    fn para(text: &str) -> Element {
        Element::new("w:p")
            .with_child(Element::new("w:r").with_child(Element::new("w:t").with_text(text)))
    }

    fn p_style(p: &Element) -> Option<&str> {
        p.child("w:pPr")?.child("w:pStyle")?.attr("w:val")
    }

    #[test]
    fn appendix_token_retags_and_strips() {
        let body = Element::new("w:body").with_child(para("{APPENDIX} Trade data"));
        let out = resolve_placeholders(&body, &HouseStyle::default());
        let p = out.child("w:p").expect("p");
        assert_eq!(p_style(p), Some("AppendixHeading"));
        assert_eq!(p.text(), "Trade data");
    }

    #[test]
    fn bibliography_token_becomes_human_readable() {
        let body = Element::new("w:body").with_child(para("{BIBLIOGRAPHY}"));
        let out = resolve_placeholders(&body, &HouseStyle::default());
        let p = out.child("w:p").expect("p");
        assert_eq!(p_style(p), Some("PreHeading"));
        assert_eq!(p.text(), "Bibliography");
    }

    #[test]
    fn other_tokens_are_highlighted_not_resolved() {
        let body = Element::new("w:body").with_child(para("see {insert chart 3}"));
        let out = resolve_placeholders(&body, &HouseStyle::default());
        let p = out.child("w:p").expect("p");
        assert_eq!(p.text(), "see {insert chart 3}");
        let highlight = p
            .descendants()
            .find(|el| el.name == "w:highlight")
            .expect("highlight");
        assert_eq!(highlight.attr("w:val"), Some("yellow"));
    }

    #[test]
    fn plain_paragraphs_pass_through() {
        let body = Element::new("w:body").with_child(para("no markers here"));
        let out = resolve_placeholders(&body, &HouseStyle::default());
        assert_eq!(out, body);
    }
}
