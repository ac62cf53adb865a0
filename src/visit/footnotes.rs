//! Footnote renumbering. Footnote ids <= 0 are separator/continuation
//! templates shared verbatim between packages and are never renumbered.

use std::collections::HashMap;

use anyhow::{anyhow, Context};

use crate::docx::parts::footnote_ids;
use crate::docx::tree::rewrite_attr_on_elements;
use crate::visit::Snapshot;

pub fn renumber(snapshot: &Snapshot, offset: i64) -> anyhow::Result<Snapshot> {
    let declared = footnote_ids(&snapshot.footnotes)?;

    // Every reference in the document must resolve before we renumber;
    // continuing with a dangling reference would silently corrupt output.
    for el in snapshot.document.descendants() {
        if el.name != "w:footnoteReference" {
            continue;
        }
        let raw = el
            .attr("w:id")
            .ok_or_else(|| anyhow!("footnote reference without w:id"))?;
        let id = raw
            .parse::<i64>()
            .with_context(|| format!("malformed footnote reference id: {raw:?}"))?;
        if !declared.contains(&id) {
            return Err(anyhow!("footnote reference to undeclared footnote id {id}"));
        }
    }

    let mut positive: Vec<i64> = declared.into_iter().filter(|id| *id > 0).collect();
    positive.sort_unstable();
    positive.dedup();
    // Largest first, so no newly-written id can be re-matched by a later
    // substitution.
    positive.reverse();

    let mut map: HashMap<String, String> = HashMap::new();
    for old in &positive {
        map.insert(old.to_string(), (offset + old).to_string());
    }

    let mut out = snapshot.clone();
    out.footnotes = rewrite_attr_on_elements(&snapshot.footnotes, &["w:footnote"], "w:id", &map);
    out.document =
        rewrite_attr_on_elements(&snapshot.document, &["w:footnoteReference"], "w:id", &map);
    Ok(out)
}
