use std::path::Path;

use anyhow::{anyhow, Context};
use serde::Deserialize;

/// House-style table driving normalization: the named styles direct
/// formatting is reclassified into, and the canonical table styles.
///
/// Loaded from TOML; every field has a default so the file is optional and
/// may set only the ids it cares about.
#[derive(Clone, Debug, Deserialize)]
pub struct HouseStyle {
    pub version: u32,

    #[serde(default = "d_strong")]
    pub strong: String,

    #[serde(default = "d_emphasis")]
    pub emphasis: String,

    #[serde(default = "d_footnote_reference")]
    pub footnote_reference: String,

    #[serde(default = "d_table_caption")]
    pub table_caption: String,

    #[serde(default = "d_figure_caption")]
    pub figure_caption: String,

    #[serde(default = "d_source_note")]
    pub source_note: String,

    #[serde(default = "d_appendix_heading")]
    pub appendix_heading: String,

    #[serde(default = "d_pre_heading")]
    pub pre_heading: String,

    #[serde(default = "d_box_table")]
    pub box_table: String,

    #[serde(default = "d_blue_table")]
    pub blue_table: String,

    /// Highlight color flagging unresolved `{...}` insert requests.
    #[serde(default = "d_insert_request_highlight")]
    pub insert_request_highlight: String,
}

fn d_strong() -> String {
    "Strong".to_string()
}
fn d_emphasis() -> String {
    "Emphasis".to_string()
}
fn d_footnote_reference() -> String {
    "FootnoteReference".to_string()
}
fn d_table_caption() -> String {
    "TableCaption".to_string()
}
fn d_figure_caption() -> String {
    "FigureCaption".to_string()
}
fn d_source_note() -> String {
    "SourceNote".to_string()
}
fn d_appendix_heading() -> String {
    "AppendixHeading".to_string()
}
fn d_pre_heading() -> String {
    "PreHeading".to_string()
}
fn d_box_table() -> String {
    "BoxTable".to_string()
}
fn d_blue_table() -> String {
    "BlueTableBasic".to_string()
}
fn d_insert_request_highlight() -> String {
    "yellow".to_string()
}

impl Default for HouseStyle {
    fn default() -> Self {
        Self {
            version: 1,
            strong: d_strong(),
            emphasis: d_emphasis(),
            footnote_reference: d_footnote_reference(),
            table_caption: d_table_caption(),
            figure_caption: d_figure_caption(),
            source_note: d_source_note(),
            appendix_heading: d_appendix_heading(),
            pre_heading: d_pre_heading(),
            box_table: d_box_table(),
            blue_table: d_blue_table(),
            insert_request_highlight: d_insert_request_highlight(),
        }
    }
}

impl HouseStyle {
    pub fn from_toml_path(path: &Path) -> anyhow::Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read style rules: {}", path.display()))?;
        let s = String::from_utf8(bytes).context("style rules must be utf-8")?;
        let style: HouseStyle = toml::from_str(&s).context("parse style rules (toml)")?;
        if style.version != 1 {
            return Err(anyhow!(
                "unsupported style rules version: {} (expected 1)",
                style.version
            ));
        }
        Ok(style)
    }
}
