use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser};

use report_weaver::config::HouseStyle;
use report_weaver::docx::writer::write_package;
use report_weaver::merge::merge_documents;
use report_weaver::progress::ConsoleProgress;
use report_weaver::visit::{self, load, Seeds};

#[derive(Parser, Debug)]
#[command(name = "report-weaver")]
#[command(about = "Merge DOCX chapters into one report (house-style normalization + id renumbering)", long_about = None)]
struct Args {
    /// Input .docx files, merged in the order given
    #[arg(value_name = "DOCX")]
    inputs: Vec<PathBuf>,

    /// Output .docx (default: <first_stem>_merged.docx)
    #[arg(short, long, value_name = "DOCX")]
    output: Option<PathBuf>,

    /// House-style rules TOML (default: built-in style ids)
    #[arg(long, value_name = "TOML")]
    style: Option<PathBuf>,

    /// Normalize a single document without merging (exactly one input)
    #[arg(long)]
    normalize_only: bool,

    /// Print each input's part inventory and id maxima, then exit
    #[arg(long)]
    list_parts: bool,

    /// Suppress progress output on stderr
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let progress = ConsoleProgress::new(!args.quiet);

    if args.inputs.is_empty() {
        let mut cmd = Args::command();
        cmd.print_help().context("print help")?;
        eprintln!(
            "\n\nUSAGE:\n  report-weaver chapter1.docx chapter2.docx -o report.docx\n\nTIPS:\n  - Inputs are merged in the order given; the first file's package carries\n    fonts, settings and media into the output.\n  - Pass --style rules.toml to override the built-in house-style ids.\n"
        );
        return Ok(());
    }

    let style = match &args.style {
        Some(path) => HouseStyle::from_toml_path(path)?,
        None => HouseStyle::default(),
    };

    if args.list_parts {
        for path in &args.inputs {
            let (_, snap) = load::load(path)?;
            println!("{}:", path.display());
            println!("  body children:       {}", snap.body()?.children.len());
            println!(
                "  footnotes:           {} (next id {})",
                snap.footnotes.children_named("w:footnote").count(),
                snap.next_footnote_id()?
            );
            println!(
                "  document relations:  next {}",
                load_rel_display(snap.next_document_relation_id()?)
            );
            println!(
                "  footnote relations:  next {}",
                load_rel_display(snap.next_footnote_relation_id()?)
            );
            println!("  revisions:           next id {}", snap.next_revision_id()?);
            println!("  charts:              {}", snap.charts.len());
        }
        return Ok(());
    }

    let output = match &args.output {
        Some(p) => p.clone(),
        None => {
            let first = &args.inputs[0];
            let stem = first
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output")
                .to_string();
            first.with_file_name(format!("{stem}_merged.docx"))
        }
    };

    if args.normalize_only {
        if args.inputs.len() != 1 {
            return Err(anyhow::anyhow!(
                "--normalize-only takes exactly one input document"
            ));
        }
        let input = &args.inputs[0];
        let (carrier, snapshot) = load::load(input)?;
        let normalized = visit::visit(&snapshot, Seeds::zero(), &style)
            .with_context(|| format!("process {}", input.display()))?;
        write_package(&carrier, &normalized, &output)?;
        progress.info(format!("wrote {}", output.display()));
        return Ok(());
    }

    let (carrier, merged) = merge_documents(&args.inputs, &style, &progress)?;
    write_package(&carrier, &merged, &output)?;
    progress.info(format!("wrote {}", output.display()));
    Ok(())
}

fn load_rel_display(next: u64) -> String {
    format!("rId{next}")
}
