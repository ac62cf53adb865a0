//! Relationship-id renumbering for both relationship tables. Only ids that
//! are actually dereferenced by content are renumbered; dead table entries
//! pass through untouched. A content reference with no table entry is a
//! fatal consistency error.

use std::collections::HashMap;

use anyhow::anyhow;

use crate::docx::parts::{
    chart_target, rel_id, rel_id_number, ChartPart, Relationships, CHART_CONTENT_TYPE,
};
use crate::docx::tree::{collect_attr_values, rewrite_attr_values};
use crate::visit::Snapshot;

/// Attributes that dereference a relationship id from part content.
const REL_REF_ATTRS: &[&str] = &["r:id", "r:embed", "r:link"];

/// Map every referenced id to `offset + numeric(id)`, largest first.
fn build_rel_map(
    referenced: &[String],
    table: &Relationships,
    offset: u64,
) -> anyhow::Result<HashMap<String, String>> {
    let mut nums: Vec<u64> = Vec::with_capacity(referenced.len());
    for id in referenced {
        if !table.contains_id(id) {
            return Err(anyhow!(
                "content references relationship {id} absent from {}",
                table.part_name
            ));
        }
        nums.push(rel_id_number(id)?);
    }
    nums.sort_unstable();
    nums.dedup();
    nums.reverse();

    let mut map = HashMap::with_capacity(nums.len());
    for n in nums {
        map.insert(rel_id(n), rel_id(offset + n));
    }
    Ok(map)
}

pub fn renumber_footnote_relations(snapshot: &Snapshot, offset: u64) -> anyhow::Result<Snapshot> {
    let referenced = collect_attr_values(&snapshot.footnotes, REL_REF_ATTRS);
    let map = build_rel_map(&referenced, &snapshot.footnote_relations, offset)?;

    let mut out = snapshot.clone();
    out.footnotes = rewrite_attr_values(&snapshot.footnotes, REL_REF_ATTRS, &map);
    out.footnote_relations = snapshot.footnote_relations.rewrite_ids(&map);
    Ok(out)
}

pub fn renumber_document_relations(snapshot: &Snapshot, offset: u64) -> anyhow::Result<Snapshot> {
    let referenced = collect_attr_values(&snapshot.document, REL_REF_ATTRS);
    let map = build_rel_map(&referenced, &snapshot.document_relations, offset)?;

    let mut out = snapshot.clone();
    out.document = rewrite_attr_values(&snapshot.document, REL_REF_ATTRS, &map);
    out.document_relations = snapshot.document_relations.rewrite_ids(&map);

    // Chart parts are named after their owning relationship id; renumbering
    // the id renames the part, its relationship target, and its content-type
    // registration in lockstep.
    let mut target_map: HashMap<String, String> = HashMap::new();
    let mut charts: Vec<ChartPart> = Vec::with_capacity(snapshot.charts.len());
    let mut content_types = snapshot.content_types.clone();
    for chart in &snapshot.charts {
        let Some(new_id) = map.get(&chart.relation_id).filter(|id| **id != chart.relation_id)
        else {
            charts.push(chart.clone());
            continue;
        };
        let old_n = rel_id_number(&chart.relation_id)?;
        let new_n = rel_id_number(new_id)?;
        target_map.insert(chart_target(old_n), chart_target(new_n));
        content_types = content_types
            .without_override(&format!("/word/{}", chart_target(old_n)))
            .with_override(&format!("/word/{}", chart_target(new_n)), CHART_CONTENT_TYPE);
        charts.push(ChartPart {
            relation_id: new_id.clone(),
            chart: chart.chart.clone(),
        });
    }
    out.document_relations = out.document_relations.rewrite_targets(&target_map);
    out.content_types = content_types;
    out.charts = charts;
    Ok(out)
}
