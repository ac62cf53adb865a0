//! Package -> snapshot loading. Required parts are fatal when missing; the
//! optional parts get synthesized empty roots so every later stage can treat
//! a snapshot as fully populated.

use std::path::Path;

use anyhow::{anyhow, Context};

use crate::docx::package::DocxPackage;
use crate::docx::parts::{ChartPart, ContentTypes, Relationships, CHART_REL_TYPE};
use crate::docx::tree::remove_by_name;
use crate::docx::xml::{parse_xml_part, Element, NS_A, NS_W};
use crate::visit::Snapshot;

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const FOOTNOTES_PART: &str = "word/footnotes.xml";
pub const STYLES_PART: &str = "word/styles.xml";
pub const NUMBERING_PART: &str = "word/numbering.xml";
pub const THEME_PART: &str = "word/theme/theme1.xml";
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
pub const FOOTNOTE_RELS_PART: &str = "word/_rels/footnotes.xml.rels";

pub fn load(path: &Path) -> anyhow::Result<(DocxPackage, Snapshot)> {
    let package = DocxPackage::read(path)?;
    let snapshot = snapshot_from_package(&package, &path.display().to_string())?;
    Ok((package, snapshot))
}

pub fn snapshot_from_package(package: &DocxPackage, source: &str) -> anyhow::Result<Snapshot> {
    let document = required(package, source, DOCUMENT_PART)?;
    let content_types = ContentTypes::from_root(required(package, source, CONTENT_TYPES_PART)?);
    let document_relations = Relationships::from_root(
        DOCUMENT_RELS_PART,
        required(package, source, DOCUMENT_RELS_PART)?,
    );
    let styles = required(package, source, STYLES_PART)?;

    let footnotes = optional(package, source, FOOTNOTES_PART)?
        .unwrap_or_else(|| Element::new("w:footnotes").with_attr("xmlns:w", NS_W));
    let footnote_relations = match optional(package, source, FOOTNOTE_RELS_PART)? {
        Some(root) => Relationships::from_root(FOOTNOTE_RELS_PART, root),
        None => Relationships::empty(FOOTNOTE_RELS_PART),
    };
    let numbering = optional(package, source, NUMBERING_PART)?
        .unwrap_or_else(|| Element::new("w:numbering").with_attr("xmlns:w", NS_W));
    let theme = optional(package, source, THEME_PART)?
        .unwrap_or_else(|| Element::new("a:theme").with_attr("xmlns:a", NS_A));

    let charts = load_charts(package, source, &document_relations)?;

    Ok(Snapshot {
        source: source.to_string(),
        document,
        footnotes,
        document_relations,
        footnote_relations,
        content_types,
        charts,
        styles,
        numbering,
        theme,
    })
}

/// Chart parts are found through the document relationship table, not by
/// scanning entry names: only charts a relationship points at travel through
/// the merge. External workbook links are dropped since the merged package
/// never carries the source workbooks.
fn load_charts(
    package: &DocxPackage,
    source: &str,
    relations: &Relationships,
) -> anyhow::Result<Vec<ChartPart>> {
    let mut charts = Vec::new();
    for rel in relations.entries()? {
        if rel.rel_type != CHART_REL_TYPE {
            continue;
        }
        let entry_name = format!("word/{}", rel.target.trim_start_matches('/'));
        let entry = package.entry(&entry_name).ok_or_else(|| {
            anyhow!("{source}: relationship {} targets missing part {entry_name}", rel.id)
        })?;
        let part = parse_xml_part(&entry_name, &entry.data)
            .with_context(|| format!("{source}: parse {entry_name}"))?;
        charts.push(ChartPart {
            relation_id: rel.id,
            chart: remove_by_name(&part.root, &["c:externalData"]),
        });
    }
    Ok(charts)
}

fn required(package: &DocxPackage, source: &str, name: &str) -> anyhow::Result<Element> {
    optional(package, source, name)?
        .ok_or_else(|| anyhow!("{source}: part not found: {name}"))
}

fn optional(package: &DocxPackage, source: &str, name: &str) -> anyhow::Result<Option<Element>> {
    let Some(entry) = package.entry(name) else {
        return Ok(None);
    };
    let part =
        parse_xml_part(name, &entry.data).with_context(|| format!("{source}: parse {name}"))?;
    Ok(Some(part.root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::package::{DocxEntry, DocxPackage};
    use crate::docx::parts::HYPERLINK_REL_TYPE;

    fn entry(name: &str, xml: &str) -> DocxEntry {
        DocxEntry::new_xml(name, xml.as_bytes().to_vec())
    }

    fn minimal_entries() -> Vec<DocxEntry> {
        vec![
            entry(
                CONTENT_TYPES_PART,
                r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#,
            ),
            entry(
                DOCUMENT_PART,
                r#"<w:document><w:body><w:p/></w:body></w:document>"#,
            ),
            entry(DOCUMENT_RELS_PART, r#"<Relationships/>"#),
            entry(STYLES_PART, r#"<w:styles/>"#),
        ]
    }

    #[test]
    fn minimal_package_loads_with_synthesized_parts() {
        let pkg = DocxPackage {
            entries: minimal_entries(),
        };
        let snap = snapshot_from_package(&pkg, "a.docx").expect("load");
        assert_eq!(snap.footnotes.name, "w:footnotes");
        assert!(snap.footnotes.children.is_empty());
        assert_eq!(snap.theme.name, "a:theme");
        assert_eq!(snap.next_footnote_id().expect("next id"), 1);
        assert!(snap.charts.is_empty());
    }

    #[test]
    fn missing_document_is_fatal() {
        let mut entries = minimal_entries();
        entries.retain(|e| e.name != DOCUMENT_PART);
        let pkg = DocxPackage { entries };
        let err = snapshot_from_package(&pkg, "a.docx").expect_err("must fail");
        assert!(err.to_string().contains("part not found"));
    }

    #[test]
    fn charts_load_through_relationships_and_drop_external_data() {
        let mut entries = minimal_entries();
        entries.retain(|e| e.name != DOCUMENT_RELS_PART);
        entries.push(entry(
            DOCUMENT_RELS_PART,
            &format!(
                r#"<Relationships>
                     <Relationship Id="rId1" Type="{CHART_REL_TYPE}" Target="charts/chart1.xml"/>
                     <Relationship Id="rId2" Type="{HYPERLINK_REL_TYPE}" Target="https://example.com/" TargetMode="External"/>
                   </Relationships>"#
            ),
        ));
        entries.push(entry(
            "word/charts/chart1.xml",
            r#"<c:chartSpace><c:chart/><c:externalData r:id="rId9"/></c:chartSpace>"#,
        ));
        let pkg = DocxPackage { entries };
        let snap = snapshot_from_package(&pkg, "a.docx").expect("load");
        assert_eq!(snap.charts.len(), 1);
        assert_eq!(snap.charts[0].relation_id, "rId1");
        assert!(!snap.charts[0].chart.has_descendant("c:externalData"));
    }

    #[test]
    fn chart_relationship_without_part_is_fatal() {
        let mut entries = minimal_entries();
        entries.retain(|e| e.name != DOCUMENT_RELS_PART);
        entries.push(entry(
            DOCUMENT_RELS_PART,
            &format!(
                r#"<Relationships><Relationship Id="rId1" Type="{CHART_REL_TYPE}" Target="charts/chart1.xml"/></Relationships>"#
            ),
        ));
        let pkg = DocxPackage { entries };
        assert!(snapshot_from_package(&pkg, "a.docx").is_err());
    }
}
