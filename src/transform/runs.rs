//! Adjacent-run merging. Authoring tools fragment sentences across many runs
//! with identical formatting; caption and placeholder detection needs the
//! natural-language text back in one span, so runs with the same formatting
//! signature are merged before any regex-driven transform looks at them.

use crate::docx::xml::{Element, Node};

/// A run that is safe to merge: only an optional `w:rPr` plus `w:t` content.
/// Field characters, drawings, footnote references and any other payload make
/// a run opaque and act as a merge barrier.
#[derive(Clone)]
struct PlainRun {
    rpr: Option<Element>,
    fingerprint: String,
    text: String,
}

/// Merge adjacent same-formatted runs inside every paragraph of the tree.
pub fn merge_runs(root: &Element) -> Element {
    let mut out = Element {
        name: root.name.clone(),
        attrs: root.attrs.clone(),
        children: Vec::with_capacity(root.children.len()),
    };
    for child in &root.children {
        match child {
            Node::Text(t) => out.children.push(Node::Text(t.clone())),
            Node::Element(e) if e.name == "w:p" => {
                out.children.push(Node::Element(merge_paragraph(e)));
            }
            Node::Element(e) => out.children.push(Node::Element(merge_runs(e))),
        }
    }
    out
}

fn merge_paragraph(p: &Element) -> Element {
    let mut out = Element {
        name: p.name.clone(),
        attrs: p.attrs.clone(),
        children: Vec::with_capacity(p.children.len()),
    };
    let mut pending: Option<PlainRun> = None;

    for child in &p.children {
        let run = match child {
            Node::Element(e) if e.name == "w:r" => normalize_run(e),
            _ => None,
        };
        match run {
            Some(run) => match pending.as_mut() {
                Some(prev) if prev.fingerprint == run.fingerprint => {
                    prev.text.push_str(&run.text);
                }
                Some(prev) => {
                    out.children.push(Node::Element(render_run(prev)));
                    pending = Some(run);
                }
                None => pending = Some(run),
            },
            None => {
                if let Some(prev) = pending.take() {
                    out.children.push(Node::Element(render_run(&prev)));
                }
                match child {
                    Node::Text(t) => out.children.push(Node::Text(t.clone())),
                    Node::Element(e) => out.children.push(Node::Element(merge_runs(e))),
                }
            }
        }
    }
    if let Some(prev) = pending.take() {
        out.children.push(Node::Element(render_run(&prev)));
    }

    trim_paragraph_edges(&mut out);
    out
}

fn normalize_run(run: &Element) -> Option<PlainRun> {
    let mut rpr: Option<Element> = None;
    let mut text = String::new();

    for child in &run.children {
        match child {
            Node::Text(t) if t.chars().all(char::is_whitespace) => {}
            Node::Text(_) => return None,
            Node::Element(e) if e.name == "w:rPr" => {
                if rpr.is_some() || !text.is_empty() {
                    return None;
                }
                rpr = Some(e.clone());
            }
            Node::Element(e) if e.name == "w:t" => {
                // Only text is allowed inside w:t.
                for n in &e.children {
                    match n {
                        Node::Text(t) => text.push_str(t),
                        Node::Element(_) => return None,
                    }
                }
            }
            Node::Element(_) => return None,
        }
    }

    let rpr = rpr.filter(|e| !e.children.is_empty());
    let fingerprint = rpr.as_ref().map(fingerprint_rpr).unwrap_or_default();
    Some(PlainRun {
        rpr,
        fingerprint,
        text: collapse_whitespace(&text),
    })
}

/// Formatting signature: the multiset of `w:rPr` children, so property order
/// differences between authoring tools do not block a merge.
fn fingerprint_rpr(rpr: &Element) -> String {
    let mut parts: Vec<String> = rpr
        .child_elements()
        .map(|child| {
            let mut s = String::new();
            fingerprint_into(child, &mut s);
            s
        })
        .collect();
    parts.sort();
    parts.join("")
}

fn fingerprint_into(el: &Element, s: &mut String) {
    s.push('<');
    s.push_str(&el.name);
    let mut attrs = el.attrs.clone();
    attrs.sort();
    for (k, v) in attrs {
        s.push(' ');
        s.push_str(&k);
        s.push('=');
        s.push_str(&v);
    }
    s.push('>');
    for child in el.child_elements() {
        fingerprint_into(child, s);
    }
    s.push_str("</>");
}

fn render_run(run: &PlainRun) -> Element {
    // Concatenation can butt two boundary spaces together; collapse once
    // more over the joined text.
    let text = collapse_whitespace(&run.text);
    let mut out = Element::new("w:r");
    if let Some(rpr) = &run.rpr {
        out.push(Node::Element(rpr.clone()));
    }
    let mut t = Element::new("w:t");
    if text.starts_with(|c: char| c.is_whitespace())
        || text.ends_with(|c: char| c.is_whitespace())
    {
        t.set_attr("xml:space", "preserve");
    }
    t.push(Node::Text(text));
    out.push(Node::Element(t));
    out
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_ws = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !in_ws {
                out.push(' ');
            }
            in_ws = true;
        } else {
            out.push(ch);
            in_ws = false;
        }
    }
    out
}

/// Leading/trailing whitespace at the paragraph boundary is trimmed outright
/// rather than collapsed. Only plain merged runs are touched.
fn trim_paragraph_edges(p: &mut Element) {
    let run_indices: Vec<usize> = p
        .children
        .iter()
        .enumerate()
        .filter_map(|(i, n)| match n {
            Node::Element(e) if e.name == "w:r" => Some(i),
            _ => None,
        })
        .collect();
    let (Some(&first), Some(&last)) = (run_indices.first(), run_indices.last()) else {
        return;
    };
    trim_run_text(&mut p.children, first, true);
    trim_run_text(&mut p.children, last, false);
    // Dropping a run emptied by trimming.
    p.children.retain(|n| match n {
        Node::Element(e) if e.name == "w:r" => {
            !(e.children.len() == 1
                && matches!(e.child("w:t"), Some(t) if t.text().is_empty()))
        }
        _ => true,
    });
}

fn trim_run_text(children: &mut [Node], index: usize, leading: bool) {
    let Some(Node::Element(run)) = children.get_mut(index) else {
        return;
    };
    let Some(t) = run
        .children
        .iter_mut()
        .filter_map(|n| match n {
            Node::Element(e) if e.name == "w:t" => Some(e),
            _ => None,
        })
        .next()
    else {
        return;
    };
    let Some(Node::Text(text)) = t.children.first_mut() else {
        return;
    };
    let trimmed = if leading {
        text.trim_start().to_string()
    } else {
        text.trim_end().to_string()
    };
    *text = trimmed;
    if !text.starts_with(|c: char| c.is_whitespace())
        && !text.ends_with(|c: char| c.is_whitespace())
    {
        t.remove_attr("xml:space");
    }
}
