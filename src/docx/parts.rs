//! Typed wrappers around the package part trees plus the derived id metadata
//! (current maxima) the renumbering stages key off.

use std::collections::HashMap;

use anyhow::{anyhow, Context};

use crate::docx::tree::rewrite_attr_values;
use crate::docx::xml::{Element, Node, NS_CONTENT_TYPES, NS_RELS};

/// Tracked-change elements that carry a `w:id` revision id.
pub const REVISION_MARKS: &[&str] = &[
    "w:ins",
    "w:del",
    "w:rPrChange",
    "w:pPrChange",
    "w:tblPrChange",
    "w:moveFrom",
    "w:moveTo",
    "w:moveFromRangeStart",
    "w:moveToRangeStart",
];

/// Parse the numeric suffix of a canonical `rIdN` relationship id.
pub fn rel_id_number(id: &str) -> anyhow::Result<u64> {
    let digits = id
        .strip_prefix("rId")
        .ok_or_else(|| anyhow!("malformed relationship id: {id:?}"))?;
    digits
        .parse::<u64>()
        .with_context(|| format!("malformed relationship id: {id:?}"))
}

/// Render the canonical relationship id for a numeric value.
pub fn rel_id(n: u64) -> String {
    format!("rId{n}")
}

/// Canonical chart part target for a numeric id, relative to `word/`.
pub fn chart_target(n: u64) -> String {
    format!("charts/chart{n}.xml")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub target_mode: Option<String>,
}

/// One `_rels` part: the raw tree plus the part name used in error messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationships {
    pub part_name: String,
    pub root: Element,
}

impl Relationships {
    pub fn from_root(part_name: &str, root: Element) -> Self {
        Self {
            part_name: part_name.to_string(),
            root,
        }
    }

    pub fn empty(part_name: &str) -> Self {
        Self {
            part_name: part_name.to_string(),
            root: Element::new("Relationships").with_attr("xmlns", NS_RELS),
        }
    }

    pub fn entries(&self) -> anyhow::Result<Vec<Relationship>> {
        let mut out = Vec::new();
        for el in self.root.children_named("Relationship") {
            let id = el
                .attr("Id")
                .ok_or_else(|| anyhow!("{}: Relationship without Id", self.part_name))?;
            let rel_type = el
                .attr("Type")
                .ok_or_else(|| anyhow!("{}: Relationship without Type ({id})", self.part_name))?;
            let target = el
                .attr("Target")
                .ok_or_else(|| anyhow!("{}: Relationship without Target ({id})", self.part_name))?;
            out.push(Relationship {
                id: id.to_string(),
                rel_type: rel_type.to_string(),
                target: target.to_string(),
                target_mode: el.attr("TargetMode").map(str::to_string),
            });
        }
        Ok(out)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.root
            .children_named("Relationship")
            .any(|el| el.attr("Id") == Some(id))
    }

    pub fn target_of(&self, id: &str) -> Option<&str> {
        self.root
            .children_named("Relationship")
            .find(|el| el.attr("Id") == Some(id))
            .and_then(|el| el.attr("Target"))
    }

    /// Largest numeric suffix among the table's ids; 0 when empty. An id that
    /// does not parse is a malformed-input error.
    pub fn max_id(&self) -> anyhow::Result<u64> {
        let mut max = 0u64;
        for el in self.root.children_named("Relationship") {
            let id = el
                .attr("Id")
                .ok_or_else(|| anyhow!("{}: Relationship without Id", self.part_name))?;
            let n = rel_id_number(id).with_context(|| format!("in {}", self.part_name))?;
            max = max.max(n);
        }
        Ok(max)
    }

    /// Rewrite entry ids per `map`; ids with no mapping pass through (dead
    /// entries stay unrenumbered).
    pub fn rewrite_ids(&self, map: &HashMap<String, String>) -> Self {
        Self {
            part_name: self.part_name.clone(),
            root: rewrite_attr_values(&self.root, &["Id"], map),
        }
    }

    /// Rewrite entry targets per `map` (chart part renames).
    pub fn rewrite_targets(&self, map: &HashMap<String, String>) -> Self {
        Self {
            part_name: self.part_name.clone(),
            root: rewrite_attr_values(&self.root, &["Target"], map),
        }
    }

    /// True when any entry carries the given relationship type.
    pub fn contains_type(&self, rel_type: &str) -> bool {
        self.root
            .children_named("Relationship")
            .any(|el| el.attr("Type") == Some(rel_type))
    }

    /// Append an internal-target entry.
    pub fn with_entry(&self, id: &str, rel_type: &str, target: &str) -> Self {
        let mut root = self.root.clone();
        root.push(Node::Element(
            Element::new("Relationship")
                .with_attr("Id", id)
                .with_attr("Type", rel_type)
                .with_attr("Target", target),
        ));
        Self {
            part_name: self.part_name.clone(),
            root,
        }
    }

    /// Set-union by structural equality of the entry elements; the
    /// accumulator's order is preserved, incoming duplicates are dropped.
    pub fn union(&self, incoming: &Self) -> Self {
        Self {
            part_name: self.part_name.clone(),
            root: union_children(&self.root, &incoming.root),
        }
    }
}

/// `[Content_Types].xml`: default extensions plus per-part overrides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentTypes {
    pub root: Element,
}

impl ContentTypes {
    pub fn from_root(root: Element) -> Self {
        Self { root }
    }

    pub fn empty() -> Self {
        Self {
            root: Element::new("Types").with_attr("xmlns", NS_CONTENT_TYPES),
        }
    }

    pub fn override_for(&self, part_name: &str) -> Option<&str> {
        self.root
            .children_named("Override")
            .find(|el| el.attr("PartName") == Some(part_name))
            .and_then(|el| el.attr("ContentType"))
    }

    /// Register (or replace) an override for an absolute part name.
    pub fn with_override(&self, part_name: &str, content_type: &str) -> Self {
        let mut root = self.root.clone();
        if let Some(existing) = root
            .children
            .iter_mut()
            .filter_map(|n| match n {
                Node::Element(el) if el.name == "Override" => Some(el),
                _ => None,
            })
            .find(|el| el.attr("PartName") == Some(part_name))
        {
            existing.set_attr("ContentType", content_type);
        } else {
            root.push(Node::Element(
                Element::new("Override")
                    .with_attr("PartName", part_name)
                    .with_attr("ContentType", content_type),
            ));
        }
        Self { root }
    }

    /// Drop the override registered for a part name, if any.
    pub fn without_override(&self, part_name: &str) -> Self {
        let mut root = self.root.clone();
        root.children.retain(|n| match n {
            Node::Element(el) if el.name == "Override" => el.attr("PartName") != Some(part_name),
            _ => true,
        });
        Self { root }
    }

    pub fn union(&self, incoming: &Self) -> Self {
        Self {
            root: union_children(&self.root, &incoming.root),
        }
    }
}

/// An embedded chart: the relationship id that references it plus its tree.
/// `externalData` links are stripped on load since the merged package embeds
/// chart data inline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartPart {
    pub relation_id: String,
    pub chart: Element,
}

impl ChartPart {
    /// Absolute part name (`/word/charts/chart{N}.xml`) derived from the
    /// owning relationship id; the two must stay in lockstep.
    pub fn part_name(&self) -> anyhow::Result<String> {
        let n = rel_id_number(&self.relation_id)?;
        Ok(format!("/word/{}", chart_target(n)))
    }
}

/// MIME type registered for chart parts.
pub const CHART_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.drawingml.chart+xml";

/// Relationship type of chart parts.
pub const CHART_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart";

/// Relationship type of hyperlinks.
pub const HYPERLINK_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

/// Relationship type of the footnotes part.
pub const FOOTNOTES_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footnotes";

/// Relationship type of the numbering part.
pub const NUMBERING_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";

/// Relationship type of the theme part.
pub const THEME_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";

/// MIME type registered for the footnotes part.
pub const FOOTNOTES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.footnotes+xml";

/// MIME type registered for the numbering part.
pub const NUMBERING_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml";

/// MIME type registered for theme parts.
pub const THEME_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.theme+xml";

/// Positive footnote ids declared in a footnotes part. Ids that fail to parse
/// are fatal; ids <= 0 (separator/continuation templates) are reported but
/// excluded by callers that renumber.
pub fn footnote_ids(footnotes: &Element) -> anyhow::Result<Vec<i64>> {
    let mut out = Vec::new();
    for el in footnotes.children_named("w:footnote") {
        let raw = el
            .attr("w:id")
            .ok_or_else(|| anyhow!("footnote without w:id"))?;
        let id = raw
            .parse::<i64>()
            .with_context(|| format!("malformed footnote id: {raw:?}"))?;
        out.push(id);
    }
    Ok(out)
}

/// Largest positive footnote id; 0 when none.
pub fn max_footnote_id(footnotes: &Element) -> anyhow::Result<i64> {
    Ok(footnote_ids(footnotes)?
        .into_iter()
        .filter(|id| *id > 0)
        .max()
        .unwrap_or(0))
}

/// Largest revision id among tracked-change marks in a subtree; 0 when none.
pub fn max_revision_id(root: &Element) -> anyhow::Result<u64> {
    let mut max = 0u64;
    for el in root.descendants() {
        if !REVISION_MARKS.contains(&el.name.as_str()) {
            continue;
        }
        if let Some(raw) = el.attr("w:id") {
            let id = raw
                .parse::<u64>()
                .with_context(|| format!("malformed revision id on {}: {raw:?}", el.name))?;
            max = max.max(id);
        }
    }
    Ok(max)
}

/// Union of two element's children by structural equality, keeping `base`'s
/// order and appending unseen incoming children.
pub fn union_children(base: &Element, incoming: &Element) -> Element {
    let mut out = base.clone();
    for child in &incoming.children {
        if !out.children.contains(child) {
            out.children.push(child.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::xml::Element;

    fn rels_with(ids: &[(&str, &str)]) -> Relationships {
        let mut root = Element::new("Relationships").with_attr("xmlns", NS_RELS);
        for (id, target) in ids {
            root.push(Node::Element(
                Element::new("Relationship")
                    .with_attr("Id", *id)
                    .with_attr("Type", HYPERLINK_REL_TYPE)
                    .with_attr("Target", *target),
            ));
        }
        Relationships::from_root("word/_rels/document.xml.rels", root)
    }

    #[test]
    fn max_id_is_numeric_suffix_max() {
        let rels = rels_with(&[("rId3", "a"), ("rId12", "b"), ("rId7", "c")]);
        assert_eq!(rels.max_id().expect("max"), 12);
    }

    #[test]
    fn max_id_zero_when_empty() {
        assert_eq!(
            Relationships::empty("x.rels").max_id().expect("max"),
            0
        );
    }

    #[test]
    fn malformed_rel_id_is_fatal() {
        let rels = rels_with(&[("relation-1", "a")]);
        assert!(rels.max_id().is_err());
    }

    #[test]
    fn union_is_idempotent() {
        let a = rels_with(&[("rId1", "a")]);
        let b = rels_with(&[("rId1", "a"), ("rId2", "b")]);
        let merged = a.union(&b);
        assert_eq!(merged.entries().expect("entries").len(), 2);
        let again = merged.union(&b);
        assert_eq!(again, merged);
    }

    #[test]
    fn content_type_override_replaces() {
        let ct = ContentTypes::empty()
            .with_override("/word/charts/chart1.xml", CHART_CONTENT_TYPE)
            .with_override("/word/charts/chart1.xml", "text/plain");
        assert_eq!(
            ct.override_for("/word/charts/chart1.xml"),
            Some("text/plain")
        );
        assert_eq!(ct.root.children_named("Override").count(), 1);
    }

    #[test]
    fn chart_part_name_tracks_relation_id() {
        let chart = ChartPart {
            relation_id: "rId9".to_string(),
            chart: Element::new("c:chartSpace"),
        };
        assert_eq!(chart.part_name().expect("name"), "/word/charts/chart9.xml");
    }

    #[test]
    fn footnote_ids_parse_strictly() {
        let mut fns = Element::new("w:footnotes");
        for id in ["-1", "0", "2"] {
            fns.push(Node::Element(
                Element::new("w:footnote").with_attr("w:id", id),
            ));
        }
        assert_eq!(footnote_ids(&fns).expect("ids"), vec![-1, 0, 2]);
        assert_eq!(max_footnote_id(&fns).expect("max"), 2);

        let mut bad = Element::new("w:footnotes");
        bad.push(Node::Element(
            Element::new("w:footnote").with_attr("w:id", "two"),
        ));
        assert!(footnote_ids(&bad).is_err());
    }

    #[test]
    fn revision_max_scans_marks_only() {
        let root = Element::new("w:body")
            .with_child(Element::new("w:ins").with_attr("w:id", "5"))
            .with_child(Element::new("w:bookmarkStart").with_attr("w:id", "99"))
            .with_child(Element::new("w:del").with_attr("w:id", "8"));
        assert_eq!(max_revision_id(&root).expect("max"), 8);
    }
}
