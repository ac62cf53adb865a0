//! Snapshot -> package serialization. The first source package is reused as
//! the carrier so entries the pipeline never touches (fonts, settings, media)
//! pass through byte-for-byte; only parts whose tree actually changed are
//! re-serialized.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;

use crate::docx::package::DocxPackage;
use crate::docx::parts::{
    FOOTNOTES_CONTENT_TYPE, FOOTNOTES_REL_TYPE, NUMBERING_CONTENT_TYPE, NUMBERING_REL_TYPE,
    THEME_CONTENT_TYPE, THEME_REL_TYPE,
};
use crate::docx::xml::{parse_xml_part, write_xml_part, Element, XmlPart};
use crate::seq::Sequence;
use crate::visit::load::{
    CONTENT_TYPES_PART, DOCUMENT_PART, DOCUMENT_RELS_PART, FOOTNOTES_PART, FOOTNOTE_RELS_PART,
    NUMBERING_PART, STYLES_PART, THEME_PART,
};
use crate::visit::Snapshot;

pub fn write_package(
    carrier: &DocxPackage,
    snapshot: &Snapshot,
    output_path: &Path,
) -> anyhow::Result<()> {
    let snapshot = ensure_part_registrations(carrier, snapshot)?;

    let mut replacements: HashMap<String, Vec<u8>> = HashMap::new();
    let mut stage = |name: &str, root: &Element, always: bool| -> anyhow::Result<()> {
        let present = carrier.entry(name).is_some();
        if !always && !present && root.children.is_empty() {
            return Ok(());
        }
        if present && carrier_matches(carrier, name, root) {
            return Ok(());
        }
        let bytes = write_xml_part(&XmlPart::synthetic(name, root.clone()))
            .with_context(|| format!("serialize {name}"))?;
        replacements.insert(name.to_string(), bytes);
        Ok(())
    };

    stage(DOCUMENT_PART, &snapshot.document, true)?;
    stage(CONTENT_TYPES_PART, &snapshot.content_types.root, true)?;
    stage(DOCUMENT_RELS_PART, &snapshot.document_relations.root, true)?;
    stage(STYLES_PART, &snapshot.styles, true)?;
    stage(FOOTNOTES_PART, &snapshot.footnotes, false)?;
    stage(FOOTNOTE_RELS_PART, &snapshot.footnote_relations.root, false)?;
    stage(NUMBERING_PART, &snapshot.numbering, false)?;
    stage(THEME_PART, &snapshot.theme, false)?;
    for chart in &snapshot.charts {
        let name = chart.part_name()?.trim_start_matches('/').to_string();
        stage(&name, &chart.chart, true)?;
    }

    carrier.write_with_replacements(output_path, &replacements)
}

fn carrier_matches(carrier: &DocxPackage, name: &str, root: &Element) -> bool {
    carrier
        .entry(name)
        .and_then(|e| parse_xml_part(name, &e.data).ok())
        .is_some_and(|part| part.root == *root)
}

/// Folding can introduce parts the carrier never declared (footnotes or
/// numbering contributed by a later source). Those must be reachable: a
/// document relationship entry plus a content-type override each.
fn ensure_part_registrations(
    carrier: &DocxPackage,
    snapshot: &Snapshot,
) -> anyhow::Result<Snapshot> {
    let mut out = snapshot.clone();
    let ids = Sequence::relationship_ids(out.next_document_relation_id()?);

    let wanted = [
        (
            FOOTNOTES_PART,
            &out.footnotes.children,
            FOOTNOTES_REL_TYPE,
            FOOTNOTES_CONTENT_TYPE,
            "footnotes.xml",
        ),
        (
            NUMBERING_PART,
            &out.numbering.children,
            NUMBERING_REL_TYPE,
            NUMBERING_CONTENT_TYPE,
            "numbering.xml",
        ),
        (
            THEME_PART,
            &out.theme.children,
            THEME_REL_TYPE,
            THEME_CONTENT_TYPE,
            "theme/theme1.xml",
        ),
    ];

    let mut relations = out.document_relations.clone();
    let mut content_types = out.content_types.clone();
    for (part, children, rel_type, content_type, target) in wanted {
        let carried = carrier.entry(part).is_some() || !children.is_empty();
        if !carried {
            continue;
        }
        if !relations.contains_type(rel_type) {
            relations = relations.with_entry(&ids.next_value(), rel_type, target);
        }
        let part_name = format!("/{part}");
        if content_types.override_for(&part_name).is_none() {
            content_types = content_types.with_override(&part_name, content_type);
        }
    }
    out.document_relations = relations;
    out.content_types = content_types;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::ensure_part_registrations;
    use crate::docx::package::{DocxEntry, DocxPackage};
    use crate::docx::parts::{
        ContentTypes, Relationships, FOOTNOTES_CONTENT_TYPE, FOOTNOTES_REL_TYPE,
    };
    use crate::docx::xml::Element;
    use crate::visit::load::{
        CONTENT_TYPES_PART, DOCUMENT_PART, DOCUMENT_RELS_PART, STYLES_PART,
    };
    use crate::visit::Snapshot;

    fn carrier_without_footnotes() -> DocxPackage {
        DocxPackage {
            entries: vec![
                DocxEntry::new_xml(CONTENT_TYPES_PART, b"<Types/>".to_vec()),
                DocxEntry::new_xml(
                    DOCUMENT_PART,
                    b"<w:document><w:body/></w:document>".to_vec(),
                ),
                DocxEntry::new_xml(DOCUMENT_RELS_PART, b"<Relationships/>".to_vec()),
                DocxEntry::new_xml(STYLES_PART, b"<w:styles/>".to_vec()),
            ],
        }
    }

    fn snapshot_with_footnotes() -> Snapshot {
        Snapshot {
            source: "a.docx".to_string(),
            document: Element::new("w:document").with_child(Element::new("w:body")),
            footnotes: Element::new("w:footnotes")
                .with_child(Element::new("w:footnote").with_attr("w:id", "1")),
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
    fn merged_in_footnotes_get_registered() {
        let out = ensure_part_registrations(&carrier_without_footnotes(), &snapshot_with_footnotes())
            .expect("register");
        assert!(out.document_relations.contains_type(FOOTNOTES_REL_TYPE));
        assert_eq!(
            out.content_types.override_for("/word/footnotes.xml"),
            Some(FOOTNOTES_CONTENT_TYPE)
        );
    }

    #[test]
    fn registration_is_idempotent() {
        let once =
            ensure_part_registrations(&carrier_without_footnotes(), &snapshot_with_footnotes())
                .expect("first");
        let twice =
            ensure_part_registrations(&carrier_without_footnotes(), &once).expect("second");
        assert_eq!(twice.document_relations, once.document_relations);
        assert_eq!(twice.content_types, once.content_types);
    }

    #[test]
    fn empty_synthesized_parts_stay_unregistered() {
        let mut snap = snapshot_with_footnotes();
        snap.footnotes = Element::new("w:footnotes");
        let out = ensure_part_registrations(&carrier_without_footnotes(), &snap).expect("register");
        assert!(!out.document_relations.contains_type(FOOTNOTES_REL_TYPE));
        assert_eq!(out.content_types.override_for("/word/footnotes.xml"), None);
    }
}
