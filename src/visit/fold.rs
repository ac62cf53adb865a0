//! Folding one visited snapshot into the accumulator. The incoming side has
//! already been renumbered past the accumulator's maxima, so every union here
//! is collision-free by construction.

use anyhow::Context;

use crate::docx::parts::union_children;
use crate::docx::xml::{Element, Node};
use crate::visit::Snapshot;

pub fn fold(acc: &Snapshot, incoming: &Snapshot) -> anyhow::Result<Snapshot> {
    let mut out = acc.clone();

    out.document = fold_document(acc, incoming)?;
    out.footnotes = union_children(&acc.footnotes, &incoming.footnotes);
    out.document_relations = acc.document_relations.union(&incoming.document_relations);
    out.footnote_relations = acc.footnote_relations.union(&incoming.footnote_relations);
    out.content_types = acc.content_types.union(&incoming.content_types);
    out.styles = fold_styles(&acc.styles, &incoming.styles);
    out.numbering = union_children(&acc.numbering, &incoming.numbering);
    // One theme per report; the last source's wins.
    out.theme = incoming.theme.clone();

    for chart in &incoming.charts {
        if !out.charts.contains(chart) {
            out.charts.push(chart.clone());
        }
    }
    Ok(out)
}

fn fold_document(acc: &Snapshot, incoming: &Snapshot) -> anyhow::Result<Element> {
    let acc_body = acc.body().context("fold: accumulator")?;
    let in_body = incoming.body().context("fold: incoming")?;

    let mut body = acc_body.clone();
    body.children.extend(in_body.children.iter().cloned());
    let body = collapse_section_markers(&body);

    let mut document = acc.document.clone();
    for child in document.children.iter_mut() {
        if let Node::Element(el) = child {
            if el.name == "w:body" {
                *el = body;
                break;
            }
        }
    }
    Ok(document)
}

/// Concatenation can leave two section markers back to back (each source
/// carries its own trailing one). Word reads a section from its trailing
/// marker, so an adjacent run of markers with the same page orientation
/// collapses to the last. Markers with differing orientation both stand.
fn collapse_section_markers(body: &Element) -> Element {
    let mut out = Element {
        name: body.name.clone(),
        attrs: body.attrs.clone(),
        children: Vec::with_capacity(body.children.len()),
    };
    for child in &body.children {
        let node = child.clone();
        if let (Some(prev), Some(cur)) = (
            out.children.last().and_then(Node::as_element).and_then(marker_orientation),
            child.as_element().and_then(marker_orientation),
        ) {
            if prev == cur {
                out.children.pop();
            }
        }
        out.children.push(node);
    }
    out
}

/// `Some(orientation)` when the body child is a section marker: a bare
/// `w:sectPr`, or a contentless paragraph carrying one in its `w:pPr`.
fn marker_orientation(el: &Element) -> Option<String> {
    let sect_pr = match el.name.as_str() {
        "w:sectPr" => el,
        "w:p" if el.children_named("w:r").next().is_none() => {
            el.child("w:pPr")?.child("w:sectPr")?
        }
        _ => return None,
    };
    let orient = sect_pr
        .child("w:pgSz")
        .and_then(|pg| pg.attr("w:orient"))
        .unwrap_or("portrait");
    Some(orient.to_string())
}

/// Style-part union. Every package ships its own `w:docDefaults` and a
/// `Normal` style; only the accumulator's copies survive.
fn fold_styles(acc: &Element, incoming: &Element) -> Element {
    let mut filtered = incoming.clone();
    filtered.children.retain(|n| match n {
        Node::Element(el) if el.name == "w:docDefaults" => false,
        Node::Element(el) if el.name == "w:style" => el.attr("w:styleId") != Some("Normal"),
        _ => true,
    });
    union_children(acc, &filtered)
}
