//! Direct-formatting reclassification: bold/italic/superscript markers become
//! named character styles, and underlined paragraphs are promoted to caption
//! styles based on what their siblings contain.
//!
//! The sibling-adjacency rules are deliberately kept exactly as authored
//! documents expect them; they are heuristics, and a paragraph whose context
//! matches none of them is left untouched.

use crate::config::HouseStyle;
use crate::docx::xml::{Element, Node};
use crate::transform::contains_brace_token;
use crate::transform::fields::caption_prefix;

/// Marker elements treated as "on" unless their `w:val` turns them off.
fn toggle_on(rpr: &Element, name: &str) -> bool {
    rpr.children_named(name).any(|el| {
        !matches!(el.attr("w:val"), Some("0") | Some("false") | Some("none"))
    })
}

fn has_underline(p: &Element) -> bool {
    p.descendants()
        .filter(|el| el.name == "w:rPr")
        .any(|rpr| toggle_on(rpr, "w:u"))
}

/// Convert bold/italic/superscript direct formatting into character-style
/// references throughout the tree.
pub fn reclassify_runs(root: &Element, style: &HouseStyle) -> Element {
    let mut out = Element {
        name: root.name.clone(),
        attrs: root.attrs.clone(),
        children: Vec::with_capacity(root.children.len()),
    };
    for child in &root.children {
        match child {
            Node::Text(t) => out.children.push(Node::Text(t.clone())),
            Node::Element(e) if e.name == "w:r" => {
                out.children.push(Node::Element(reclassify_run(e, style)));
            }
            Node::Element(e) => out.children.push(Node::Element(reclassify_runs(e, style))),
        }
    }
    out
}

fn reclassify_run(run: &Element, style: &HouseStyle) -> Element {
    let Some(rpr) = run.child("w:rPr") else {
        return run.clone();
    };

    let target = if toggle_on(rpr, "w:b") {
        Some(style.strong.as_str())
    } else if toggle_on(rpr, "w:i") {
        Some(style.emphasis.as_str())
    } else if rpr
        .children_named("w:vertAlign")
        .any(|el| el.attr("w:val") == Some("superscript"))
    {
        Some(style.footnote_reference.as_str())
    } else {
        None
    };
    let Some(target) = target else {
        return run.clone();
    };

    let mut new_rpr = Element::new("w:rPr");
    if rpr.child("w:rStyle").is_none() {
        new_rpr.push(Node::Element(
            Element::new("w:rStyle").with_attr("w:val", target),
        ));
    }
    for child in &rpr.children {
        match child {
            Node::Element(e)
                if matches!(
                    e.name.as_str(),
                    "w:b" | "w:bCs" | "w:i" | "w:iCs" | "w:vertAlign"
                ) => {}
            other => new_rpr.children.push(other.clone()),
        }
    }

    let mut out = run.clone();
    for child in out.children.iter_mut() {
        if let Node::Element(e) = child {
            if e.name == "w:rPr" {
                *e = new_rpr;
                break;
            }
        }
    }
    out
}

/// What a caption-promoted paragraph turns into.
enum CaptionKind {
    Table,
    Figure,
    SourceNote,
}

/// Promote underlined paragraphs to caption styles by sibling context:
/// - next sibling is a table (or carries a `{...}` placeholder): table caption;
/// - next sibling contains a drawing (or placeholder): figure caption;
/// - previous sibling contains a table, drawing, underline or placeholder:
///   source note.
pub fn promote_captions(root: &Element, style: &HouseStyle) -> Element {
    let mut out = Element {
        name: root.name.clone(),
        attrs: root.attrs.clone(),
        children: Vec::new(),
    };

    let elements: Vec<(usize, &Element)> = root
        .children
        .iter()
        .enumerate()
        .filter_map(|(i, n)| n.as_element().map(|el| (i, el)))
        .collect();

    for (i, child) in root.children.iter().enumerate() {
        let Node::Element(el) = child else {
            out.children.push(child.clone());
            continue;
        };
        if el.name != "w:p" || !has_underline(el) {
            out.children.push(Node::Element(promote_captions(el, style)));
            continue;
        }

        let pos = elements
            .iter()
            .position(|(idx, _)| *idx == i)
            .expect("element position");
        let next = elements.get(pos + 1).map(|(_, el)| *el);
        let prev = pos.checked_sub(1).and_then(|p| elements.get(p)).map(|(_, el)| *el);

        match classify(next, prev) {
            Some(kind) => out.children.push(Node::Element(promote(el, &kind, style))),
            None => out.children.push(Node::Element(el.clone())),
        }
    }
    out
}

fn classify(next: Option<&Element>, prev: Option<&Element>) -> Option<CaptionKind> {
    if let Some(next) = next {
        if next.name == "w:tbl" || contains_brace_token(next) {
            return Some(CaptionKind::Table);
        }
        if next.has_descendant("w:drawing") {
            return Some(CaptionKind::Figure);
        }
    }
    if let Some(prev) = prev {
        if prev.name == "w:tbl"
            || prev.has_descendant("w:tbl")
            || prev.has_descendant("w:drawing")
            || has_underline(prev)
            || contains_brace_token(prev)
        {
            return Some(CaptionKind::SourceNote);
        }
    }
    None
}

fn promote(p: &Element, kind: &CaptionKind, style: &HouseStyle) -> Element {
    let (style_id, label) = match kind {
        CaptionKind::Table => (style.table_caption.as_str(), Some("Table")),
        CaptionKind::Figure => (style.figure_caption.as_str(), Some("Figure")),
        CaptionKind::SourceNote => (style.source_note.as_str(), None),
    };

    let mut out = strip_underlines(p);
    set_paragraph_style(&mut out, style_id);

    if let Some(label) = label {
        let appendix = p.text().to_ascii_uppercase().contains("APPENDIX");
        let prefix = caption_prefix(label, appendix);
        // Insert after pPr, before the caption text runs.
        let at = out
            .children
            .iter()
            .position(|n| !matches!(n, Node::Element(e) if e.name == "w:pPr"))
            .unwrap_or(out.children.len());
        for (offset, node) in prefix.into_iter().enumerate() {
            out.children.insert(at + offset, node);
        }
    }
    out
}

fn strip_underlines(p: &Element) -> Element {
    crate::docx::tree::remove_where(p, |el| el.name == "w:u")
}

/// Set (or replace) the paragraph style, creating `w:pPr` at the front when
/// the paragraph has none.
pub fn set_paragraph_style(p: &mut Element, style_id: &str) {
    for child in p.children.iter_mut() {
        if let Node::Element(ppr) = child {
            if ppr.name == "w:pPr" {
                if let Some(existing) = ppr
                    .children
                    .iter_mut()
                    .filter_map(|n| match n {
                        Node::Element(e) if e.name == "w:pStyle" => Some(e),
                        _ => None,
                    })
                    .next()
                {
                    existing.set_attr("w:val", style_id);
                } else {
                    ppr.children.insert(
                        0,
                        Node::Element(Element::new("w:pStyle").with_attr("w:val", style_id)),
                    );
                }
                return;
            }
        }
    }
    let ppr = Element::new("w:pPr")
        .with_child(Element::new("w:pStyle").with_attr("w:val", style_id));
    p.children.insert(0, Node::Element(ppr));
}
