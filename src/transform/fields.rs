//! Word field-code synthesis for auto-numbered captions. A field is a run
//! sequence of `w:fldChar` begin/separate/end characters around a
//! `w:instrText` instruction; the host application computes the result on
//! field update.

use crate::docx::xml::{Element, Node};

fn fld_char(kind: &str) -> Element {
    Element::new("w:r")
        .with_child(Element::new("w:fldChar").with_attr("w:fldCharType", kind))
}

fn instr_text(instruction: &str) -> Element {
    Element::new("w:r").with_child(
        Element::new("w:instrText")
            .with_attr("xml:space", "preserve")
            .with_text(instruction),
    )
}

fn text_run(text: &str) -> Element {
    let mut t = Element::new("w:t").with_text(text);
    if text.starts_with(' ') || text.ends_with(' ') {
        t.set_attr("xml:space", "preserve");
    }
    Element::new("w:r").with_child(t)
}

/// One complete field: begin, instruction, separate, end.
pub fn field_runs(instruction: &str) -> Vec<Node> {
    vec![
        Node::Element(fld_char("begin")),
        Node::Element(instr_text(instruction)),
        Node::Element(fld_char("separate")),
        Node::Element(fld_char("end")),
    ]
}

/// The run prefix for an auto-numbered caption: `Table `/`Figure ` label, a
/// STYLEREF chapter reference, a dot, and the SEQ counter. `appendix` selects
/// the `"Heading 9"` style reference used by appendix chapters; otherwise the
/// reference is numeric outline level 1.
pub fn caption_prefix(label: &str, appendix: bool) -> Vec<Node> {
    let style_ref = if appendix {
        " STYLEREF \"Heading 9\" \\s ".to_string()
    } else {
        " STYLEREF 1 \\s ".to_string()
    };
    let seq = format!(" SEQ {label} \\* ARABIC \\s 1 ");

    let mut out: Vec<Node> = Vec::new();
    out.push(Node::Element(text_run(&format!("{label} "))));
    out.extend(field_runs(&style_ref));
    out.push(Node::Element(text_run(".")));
    out.extend(field_runs(&seq));
    out.push(Node::Element(text_run(" ")));
    out
}

#[cfg(test)]
mod tests {
    use super::{caption_prefix, field_runs};
    use crate::docx::xml::Node;

    fn fld_char_types(nodes: &[Node]) -> Vec<String> {
        nodes
            .iter()
            .filter_map(Node::as_element)
            .filter_map(|r| r.child("w:fldChar"))
            .filter_map(|f| f.attr("w:fldCharType"))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn field_has_begin_separate_end() {
        let runs = field_runs(" SEQ Table \\* ARABIC \\s 1 ");
        assert_eq!(fld_char_types(&runs), vec!["begin", "separate", "end"]);
        let instr: Vec<String> = runs
            .iter()
            .filter_map(Node::as_element)
            .filter_map(|r| r.child("w:instrText"))
            .map(|t| t.text())
            .collect();
        assert_eq!(instr, vec![" SEQ Table \\* ARABIC \\s 1 "]);
    }

    #[test]
    fn table_caption_references_outline_level() {
        let nodes = caption_prefix("Table", false);
        let all_text: String = nodes
            .iter()
            .filter_map(Node::as_element)
            .map(|el| el.text())
            .collect();
        assert!(all_text.contains("STYLEREF 1"));
        assert!(all_text.contains("SEQ Table"));
        assert!(all_text.starts_with("Table "));
    }

    #[test]
    fn appendix_caption_references_heading_nine() {
        let nodes = caption_prefix("Figure", true);
        let all_text: String = nodes
            .iter()
            .filter_map(Node::as_element)
            .map(|el| el.text())
            .collect();
        assert!(all_text.contains("STYLEREF \"Heading 9\""));
    }
}
