//! The per-source pipeline ("visit") and the merge fold. A [`Snapshot`] is an
//! immutable aggregate of one package's parts; every stage consumes a
//! snapshot and produces a new one, so sibling stages can read shared parts
//! without aliasing hazards.

pub mod document;
pub mod fold;
pub mod footnotes;
pub mod load;
pub mod relations;
pub mod revisions;

use anyhow::Context;

use crate::config::HouseStyle;
use crate::docx::parts::{
    max_footnote_id, max_revision_id, ChartPart, ContentTypes, Relationships,
};
use crate::docx::xml::Element;

/// All parts of one package at one pipeline step, plus the source name used
/// in error reporting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub source: String,
    pub document: Element,
    pub footnotes: Element,
    pub document_relations: Relationships,
    pub footnote_relations: Relationships,
    pub content_types: ContentTypes,
    pub charts: Vec<ChartPart>,
    pub styles: Element,
    pub numbering: Element,
    pub theme: Element,
}

impl Snapshot {
    pub fn body(&self) -> anyhow::Result<&Element> {
        self.document
            .child("w:body")
            .with_context(|| format!("{}: document has no w:body", self.source))
    }

    pub fn next_document_relation_id(&self) -> anyhow::Result<u64> {
        Ok(self.document_relations.max_id()? + 1)
    }

    pub fn next_footnote_relation_id(&self) -> anyhow::Result<u64> {
        Ok(self.footnote_relations.max_id()? + 1)
    }

    pub fn next_footnote_id(&self) -> anyhow::Result<i64> {
        Ok(max_footnote_id(&self.footnotes)? + 1)
    }

    /// Revision ids share one counter across the document and footnotes parts.
    pub fn next_revision_id(&self) -> anyhow::Result<u64> {
        let doc = max_revision_id(&self.document)?;
        let foot = max_revision_id(&self.footnotes)?;
        Ok(doc.max(foot) + 1)
    }

    /// The running maxima a subsequent visit renumbers against.
    pub fn seeds(&self) -> anyhow::Result<Seeds> {
        Ok(Seeds {
            document_relation: self.document_relations.max_id()?,
            footnote: max_footnote_id(&self.footnotes)?,
            footnote_relation: self.footnote_relations.max_id()?,
            revision: max_revision_id(&self.document)?.max(max_revision_id(&self.footnotes)?),
        })
    }
}

/// Current maxima already in use by the accumulator; a visit offsets every id
/// it renumbers by these.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Seeds {
    pub document_relation: u64,
    pub footnote: i64,
    pub footnote_relation: u64,
    pub revision: u64,
}

impl Seeds {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Run the full per-source pipeline: normalize the body, then renumber
/// footnotes, footnote relations, document relations (hyperlinks + charts)
/// and revision marks against the accumulator's maxima.
pub fn visit(snapshot: &Snapshot, seeds: Seeds, style: &HouseStyle) -> anyhow::Result<Snapshot> {
    let ctx = |stage: &str| format!("{}: {stage}", snapshot.source);

    let s = document::normalize(snapshot, style).with_context(|| ctx("normalize document"))?;
    let s = footnotes::renumber(&s, seeds.footnote).with_context(|| ctx("renumber footnotes"))?;
    let s = relations::renumber_footnote_relations(&s, seeds.footnote_relation)
        .with_context(|| ctx("renumber footnote relations"))?;
    let s = relations::renumber_document_relations(&s, seeds.document_relation)
        .with_context(|| ctx("renumber document relations"))?;
    let s = revisions::renumber(&s, seeds.revision).with_context(|| ctx("renumber revisions"))?;
    Ok(s)
}
