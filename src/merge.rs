//! The merge orchestrator: load, visit, fold, strictly in input order. Each
//! visit renumbers against the accumulator's current maxima, so the fold is
//! inherently sequential.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::HouseStyle;
use crate::docx::package::DocxPackage;
use crate::progress::ConsoleProgress;
use crate::visit::{self, fold::fold, load, Seeds, Snapshot};

/// Merge the packages at `paths` into one snapshot. The returned package is
/// the first source's container, reused as the carrier when writing.
pub fn merge_documents(
    paths: &[PathBuf],
    style: &HouseStyle,
    progress: &ConsoleProgress,
) -> anyhow::Result<(DocxPackage, Snapshot)> {
    let (first, rest) = paths
        .split_first()
        .context("no input documents to merge")?;
    let total = paths.len();

    progress.document(first, 1, total);
    let (carrier, snapshot) = load::load(first)?;
    let mut acc = visit_one(&snapshot, Seeds::zero(), style, first)?;

    for (i, path) in rest.iter().enumerate() {
        progress.document(path, i + 2, total);
        let (_, snapshot) = load::load(path)?;
        let seeds = acc
            .seeds()
            .with_context(|| format!("derive id maxima before {}", path.display()))?;
        let visited = visit_one(&snapshot, seeds, style, path)?;
        acc = fold(&acc, &visited).with_context(|| format!("fold {}", path.display()))?;
    }
    progress.info(format!("merged {total} document(s)"));
    Ok((carrier, acc))
}

fn visit_one(
    snapshot: &Snapshot,
    seeds: Seeds,
    style: &HouseStyle,
    path: &Path,
) -> anyhow::Result<Snapshot> {
    visit::visit(snapshot, seeds, style).with_context(|| format!("process {}", path.display()))
}
