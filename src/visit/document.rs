//! Body normalization: the transform chain applied to the document (and its
//! footnotes) before any renumbering. Run merging must precede the
//! placeholder and caption passes so their text scans see whole spans.

use crate::config::HouseStyle;
use crate::transform::placeholders::resolve_placeholders;
use crate::transform::runs::merge_runs;
use crate::transform::scrub::scrub;
use crate::transform::styles::{promote_captions, reclassify_runs};
use crate::transform::tables::normalize_tables;
use crate::visit::Snapshot;

pub fn normalize(snapshot: &Snapshot, style: &HouseStyle) -> anyhow::Result<Snapshot> {
    let mut out = snapshot.clone();
    out.document = normalize_tree(&snapshot.document, style);
    out.footnotes = normalize_tree(&snapshot.footnotes, style);
    Ok(out)
}

fn normalize_tree(root: &crate::docx::xml::Element, style: &HouseStyle) -> crate::docx::xml::Element {
    let t = scrub(root);
    let t = merge_runs(&t);
    let t = promote_captions(&t, style);
    let t = resolve_placeholders(&t, style);
    let t = reclassify_runs(&t, style);
    normalize_tables(&t, style)
}
