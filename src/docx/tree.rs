//! Pure tree-to-tree rewrites shared by the normalization and renumbering
//! stages. Every function takes a borrowed tree and returns a fresh one;
//! callers never see their input mutated.

use std::collections::HashMap;

use crate::docx::xml::{Element, Node};

/// Drop every descendant element whose name matches one of `names`.
pub fn remove_by_name(root: &Element, names: &[&str]) -> Element {
    retain_elements(root, &mut |el| !names.contains(&el.name.as_str()))
}

/// Drop every descendant element for which `drop` returns true.
pub fn remove_where(root: &Element, mut drop: impl FnMut(&Element) -> bool) -> Element {
    retain_elements(root, &mut |el| !drop(el))
}

fn retain_elements(el: &Element, keep: &mut impl FnMut(&Element) -> bool) -> Element {
    let mut out = Element {
        name: el.name.clone(),
        attrs: el.attrs.clone(),
        children: Vec::with_capacity(el.children.len()),
    };
    for child in &el.children {
        match child {
            Node::Text(t) => out.children.push(Node::Text(t.clone())),
            Node::Element(e) => {
                if keep(e) {
                    out.children.push(Node::Element(retain_elements(e, keep)));
                }
            }
        }
    }
    out
}

/// Drop matching descendants that end up with no children. Children are
/// rebuilt before the parent is tested, so emptying a child can newly
/// qualify its ancestor.
pub fn remove_if_empty(root: &Element, names: &[&str]) -> Element {
    let mut out = Element {
        name: root.name.clone(),
        attrs: root.attrs.clone(),
        children: Vec::with_capacity(root.children.len()),
    };
    for child in &root.children {
        match child {
            Node::Text(t) => out.children.push(Node::Text(t.clone())),
            Node::Element(e) => {
                let rebuilt = remove_if_empty(e, names);
                if rebuilt.children.is_empty() && names.contains(&rebuilt.name.as_str()) {
                    continue;
                }
                out.children.push(Node::Element(rebuilt));
            }
        }
    }
    out
}

/// Strip every attribute (on any element) for which `strip` returns true.
pub fn strip_attrs_where(root: &Element, strip: &impl Fn(&str) -> bool) -> Element {
    let mut out = Element {
        name: root.name.clone(),
        attrs: root
            .attrs
            .iter()
            .filter(|(k, _)| !strip(k))
            .cloned()
            .collect(),
        children: Vec::with_capacity(root.children.len()),
    };
    for child in &root.children {
        match child {
            Node::Text(t) => out.children.push(Node::Text(t.clone())),
            Node::Element(e) => out
                .children
                .push(Node::Element(strip_attrs_where(e, strip))),
        }
    }
    out
}

/// Rewrite the values of the named attributes wherever the current value has
/// an entry in `map`. Values without an entry pass through untouched.
pub fn rewrite_attr_values(
    root: &Element,
    attr_names: &[&str],
    map: &HashMap<String, String>,
) -> Element {
    let mut out = Element {
        name: root.name.clone(),
        attrs: root
            .attrs
            .iter()
            .map(|(k, v)| {
                if attr_names.contains(&k.as_str()) {
                    if let Some(new) = map.get(v) {
                        return (k.clone(), new.clone());
                    }
                }
                (k.clone(), v.clone())
            })
            .collect(),
        children: Vec::with_capacity(root.children.len()),
    };
    for child in &root.children {
        match child {
            Node::Text(t) => out.children.push(Node::Text(t.clone())),
            Node::Element(e) => out
                .children
                .push(Node::Element(rewrite_attr_values(e, attr_names, map))),
        }
    }
    out
}

/// Like [`rewrite_attr_values`], but only on elements whose name is in
/// `element_names`. Needed where an attribute name is overloaded (`w:id` is
/// carried by bookmarks as well as footnotes and revision marks).
pub fn rewrite_attr_on_elements(
    root: &Element,
    element_names: &[&str],
    attr: &str,
    map: &HashMap<String, String>,
) -> Element {
    let mut out = Element {
        name: root.name.clone(),
        attrs: root.attrs.clone(),
        children: Vec::with_capacity(root.children.len()),
    };
    if element_names.contains(&root.name.as_str()) {
        for (k, v) in out.attrs.iter_mut() {
            if k == attr {
                if let Some(new) = map.get(v) {
                    *v = new.clone();
                }
            }
        }
    }
    for child in &root.children {
        match child {
            Node::Text(t) => out.children.push(Node::Text(t.clone())),
            Node::Element(e) => out.children.push(Node::Element(rewrite_attr_on_elements(
                e,
                element_names,
                attr,
                map,
            ))),
        }
    }
    out
}

/// Collect the distinct values of the named attributes across the subtree,
/// in document order.
pub fn collect_attr_values(root: &Element, attr_names: &[&str]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut visit = |el: &Element| {
        for (k, v) in &el.attrs {
            if attr_names.contains(&k.as_str()) && !seen.iter().any(|s| s == v) {
                seen.push(v.clone());
            }
        }
    };
    visit(root);
    for el in root.descendants() {
        visit(el);
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::xml::Element;

    fn sample() -> Element {
        Element::new("w:p")
            .with_child(
                Element::new("w:pPr")
                    .with_child(Element::new("w:rPr").with_child(Element::new("w:noProof"))),
            )
            .with_child(
                Element::new("w:r")
                    .with_attr("w:rsidR", "00AB12CD")
                    .with_child(Element::new("w:t").with_text("x")),
            )
    }

    #[test]
    fn remove_by_name_drops_subtree() {
        let out = remove_by_name(&sample(), &["w:noProof"]);
        assert!(!out.has_descendant("w:noProof"));
        assert!(out.has_descendant("w:rPr"));
    }

    #[test]
    fn remove_if_empty_cascades_bottom_up() {
        let stripped = remove_by_name(&sample(), &["w:noProof"]);
        let out = remove_if_empty(&stripped, &["w:rPr", "w:pPr"]);
        // Emptying rPr must also take out the now-empty pPr.
        assert!(!out.has_descendant("w:rPr"));
        assert!(!out.has_descendant("w:pPr"));
        assert!(out.has_descendant("w:t"));
    }

    #[test]
    fn strip_attrs_removes_rsid_family() {
        let out = strip_attrs_where(&sample(), &|k| k.starts_with("w:rsid"));
        assert!(out.descendants().all(|el| el.attr("w:rsidR").is_none()));
    }

    #[test]
    fn rewrite_attr_values_consults_map_only() {
        let root = Element::new("w:body")
            .with_child(Element::new("w:hyperlink").with_attr("r:id", "rId1"))
            .with_child(Element::new("w:hyperlink").with_attr("r:id", "rId9"));
        let mut map = HashMap::new();
        map.insert("rId1".to_string(), "rId4".to_string());
        let out = rewrite_attr_values(&root, &["r:id"], &map);
        let ids: Vec<&str> = out
            .descendants()
            .filter_map(|el| el.attr("r:id"))
            .collect();
        assert_eq!(ids, vec!["rId4", "rId9"]);
    }

    #[test]
    fn collect_attr_values_dedupes_in_order() {
        let root = Element::new("w:body")
            .with_child(Element::new("a").with_attr("r:id", "rId2"))
            .with_child(Element::new("b").with_attr("r:embed", "rId1"))
            .with_child(Element::new("c").with_attr("r:id", "rId2"));
        let got = collect_attr_values(&root, &["r:id", "r:embed"]);
        assert_eq!(got, vec!["rId2".to_string(), "rId1".to_string()]);
    }
}
