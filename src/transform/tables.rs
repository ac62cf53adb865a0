//! Table normalization: canonical table style by column count, and the `@>`
//! indentation micro-syntax found in cell text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::HouseStyle;
use crate::docx::xml::{Element, Node};

/// Twips of left indent per `>` in an `@>`-token.
const INDENT_STEP: i64 = 144;

/// Leading `@>`, `@>>`, ... token in cell text.
static INDENT_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*@(>+)\s*").expect("regex"));

pub fn normalize_tables(root: &Element, style: &HouseStyle) -> Element {
    let mut out = Element {
        name: root.name.clone(),
        attrs: root.attrs.clone(),
        children: Vec::with_capacity(root.children.len()),
    };
    for child in &root.children {
        match child {
            Node::Text(t) => out.children.push(Node::Text(t.clone())),
            Node::Element(e) if e.name == "w:tbl" => {
                out.children.push(Node::Element(normalize_table(e, style)));
            }
            Node::Element(e) => out.children.push(Node::Element(normalize_tables(e, style))),
        }
    }
    out
}

fn normalize_table(tbl: &Element, style: &HouseStyle) -> Element {
    let columns = tbl
        .child("w:tblGrid")
        .map(|grid| grid.children_named("w:gridCol").count())
        .unwrap_or(0);
    let style_id = if columns == 1 {
        style.box_table.as_str()
    } else {
        style.blue_table.as_str()
    };

    let mut out = Element {
        name: tbl.name.clone(),
        attrs: tbl.attrs.clone(),
        children: Vec::with_capacity(tbl.children.len() + 1),
    };
    // Table style properties are replaced wholesale, not merged.
    out.push(Node::Element(canonical_tbl_pr(style_id)));
    for child in &tbl.children {
        match child {
            Node::Element(e) if e.name == "w:tblPr" => {}
            Node::Element(e) if e.name == "w:tr" => {
                out.children.push(Node::Element(normalize_row(e, style)));
            }
            other => out.children.push(other.clone()),
        }
    }
    out
}

fn canonical_tbl_pr(style_id: &str) -> Element {
    Element::new("w:tblPr")
        .with_child(Element::new("w:tblStyle").with_attr("w:val", style_id))
        .with_child(
            Element::new("w:tblW")
                .with_attr("w:w", "5000")
                .with_attr("w:type", "pct"),
        )
        .with_child(Element::new("w:tblLayout").with_attr("w:type", "fixed"))
        .with_child(
            Element::new("w:tblLook")
                .with_attr("w:firstRow", "1")
                .with_attr("w:lastRow", "0")
                .with_attr("w:firstColumn", "1")
                .with_attr("w:lastColumn", "0")
                .with_attr("w:noHBand", "0")
                .with_attr("w:noVBand", "1"),
        )
}

fn normalize_row(tr: &Element, style: &HouseStyle) -> Element {
    let mut out = Element {
        name: tr.name.clone(),
        attrs: tr.attrs.clone(),
        children: Vec::with_capacity(tr.children.len()),
    };
    for child in &tr.children {
        match child {
            Node::Element(e) if e.name == "w:tc" => {
                let mut tc = Element {
                    name: e.name.clone(),
                    attrs: e.attrs.clone(),
                    children: Vec::with_capacity(e.children.len()),
                };
                for cell_child in &e.children {
                    match cell_child {
                        Node::Element(p) if p.name == "w:p" => {
                            tc.children.push(Node::Element(apply_indent_token(p)));
                        }
                        // Nested tables.
                        Node::Element(other) => {
                            tc.children.push(Node::Element(normalize_tables(other, style)));
                        }
                        Node::Text(t) => tc.children.push(Node::Text(t.clone())),
                    }
                }
                out.children.push(Node::Element(tc));
            }
            other => out.children.push(other.clone()),
        }
    }
    out
}

/// Convert a leading `@>`-token into paragraph left indent and strip it from
/// the visible text. Paragraphs without the token pass through unchanged.
fn apply_indent_token(p: &Element) -> Element {
    let text = p.text();
    let Some(caps) = INDENT_TOKEN.captures(&text) else {
        return p.clone();
    };
    let depth = caps.get(1).map(|m| m.as_str().len()).unwrap_or(0) as i64;
    let indent = depth * INDENT_STEP;

    let mut out = strip_leading_token(p);
    set_left_indent(&mut out, indent);
    out
}

fn strip_leading_token(p: &Element) -> Element {
    let mut stripped = false;
    let mut out = Element {
        name: p.name.clone(),
        attrs: p.attrs.clone(),
        children: Vec::with_capacity(p.children.len()),
    };
    for child in &p.children {
        match child {
            Node::Element(e) if !stripped && e.name == "w:r" => {
                let mut run = e.clone();
                for rc in run.children.iter_mut() {
                    if let Node::Element(t) = rc {
                        if t.name == "w:t" {
                            let old = t.text();
                            if let Some(m) = INDENT_TOKEN.find(&old) {
                                t.children = vec![Node::Text(old[m.end()..].to_string())];
                                stripped = true;
                            }
                            break;
                        }
                    }
                }
                out.children.push(Node::Element(run));
            }
            other => out.children.push(other.clone()),
        }
    }
    out
}

fn set_left_indent(p: &mut Element, indent: i64) {
    let ind = Element::new("w:ind").with_attr("w:left", indent.to_string());
    for child in p.children.iter_mut() {
        if let Node::Element(ppr) = child {
            if ppr.name == "w:pPr" {
                ppr.children
                    .retain(|n| !matches!(n, Node::Element(e) if e.name == "w:ind"));
                ppr.push(Node::Element(ind));
                return;
            }
        }
    }
    p.children
        .insert(0, Node::Element(Element::new("w:pPr").with_child(ind)));
}
