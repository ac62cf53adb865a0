//! Revision-mark renumbering. Tracked-change ids share one number space
//! across the document and footnotes parts, so both trees are rewritten
//! against the same map.

use std::collections::HashMap;

use anyhow::Context;

use crate::docx::parts::REVISION_MARKS;
use crate::docx::tree::rewrite_attr_on_elements;
use crate::visit::Snapshot;

pub fn renumber(snapshot: &Snapshot, offset: u64) -> anyhow::Result<Snapshot> {
    let mut ids: Vec<u64> = Vec::new();
    for root in [&snapshot.document, &snapshot.footnotes] {
        for el in root.descendants() {
            if !REVISION_MARKS.contains(&el.name.as_str()) {
                continue;
            }
            let Some(raw) = el.attr("w:id") else { continue };
            let id = raw
                .parse::<u64>()
                .with_context(|| format!("malformed revision id on {}: {raw:?}", el.name))?;
            ids.push(id);
        }
    }
    ids.sort_unstable();
    ids.dedup();
    ids.reverse();

    let mut map: HashMap<String, String> = HashMap::new();
    for id in ids {
        map.insert(id.to_string(), (offset + id).to_string());
    }

    let mut out = snapshot.clone();
    out.document = rewrite_attr_on_elements(&snapshot.document, REVISION_MARKS, "w:id", &map);
    out.footnotes = rewrite_attr_on_elements(&snapshot.footnotes, REVISION_MARKS, "w:id", &map);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::renumber;
    use crate::docx::parts::{ContentTypes, Relationships};
    use crate::docx::xml::Element;
    use crate::visit::Snapshot;

    fn snapshot(document: Element, footnotes: Element) -> Snapshot {
        Snapshot {
            source: "test.docx".to_string(),
            document,
            footnotes,
            document_relations: Relationships::empty("word/_rels/document.xml.rels"),
            footnote_relations: Relationships::empty("word/_rels/footnotes.xml.rels"),
            content_types: ContentTypes::empty(),
            charts: Vec::new(),
            styles: Element::new("w:styles"),
            numbering: Element::new("w:numbering"),
            theme: Element::new("a:theme"),
        }
    }

    #[test]
    fn marks_share_one_counter_across_parts() {
        let doc = Element::new("w:document").with_child(
            Element::new("w:body").with_child(Element::new("w:ins").with_attr("w:id", "1")),
        );
        let fns = Element::new("w:footnotes").with_child(
            Element::new("w:footnote")
                .with_attr("w:id", "1")
                .with_child(Element::new("w:del").with_attr("w:id", "2")),
        );
        let out = renumber(&snapshot(doc, fns), 10).expect("renumber");
        let ins = out
            .document
            .descendants()
            .find(|el| el.name == "w:ins")
            .expect("ins");
        assert_eq!(ins.attr("w:id"), Some("11"));
        let del = out
            .footnotes
            .descendants()
            .find(|el| el.name == "w:del")
            .expect("del");
        assert_eq!(del.attr("w:id"), Some("12"));
    }

    #[test]
    fn bookmarks_and_footnote_ids_are_untouched() {
        let doc = Element::new("w:document").with_child(
            Element::new("w:body")
                .with_child(Element::new("w:bookmarkStart").with_attr("w:id", "3"))
                .with_child(Element::new("w:ins").with_attr("w:id", "3")),
        );
        let fns = Element::new("w:footnotes")
            .with_child(Element::new("w:footnote").with_attr("w:id", "3"));
        let out = renumber(&snapshot(doc, fns), 5).expect("renumber");
        let body = out.document.child("w:body").expect("body");
        assert_eq!(
            body.child("w:bookmarkStart").expect("bookmark").attr("w:id"),
            Some("3")
        );
        assert_eq!(body.child("w:ins").expect("ins").attr("w:id"), Some("8"));
        assert_eq!(
            out.footnotes.child("w:footnote").expect("footnote").attr("w:id"),
            Some("3")
        );
    }

    #[test]
    fn malformed_revision_id_is_fatal() {
        let doc = Element::new("w:document")
            .with_child(Element::new("w:ins").with_attr("w:id", "five"));
        assert!(renumber(&snapshot(doc, Element::new("w:footnotes")), 0).is_err());
    }
}
