//! Editor-artifact cleanup: revision-save ids and proofing noise carry no
//! document semantics and only defeat structural equality between sources.

use crate::docx::tree::{remove_by_name, remove_if_empty, strip_attrs_where};
use crate::docx::xml::Element;

/// Elements that only record proofing/rendering state.
const NOISE_ELEMENTS: &[&str] = &[
    "w:proofErr",
    "w:noProof",
    "w:lang",
    "w:lastRenderedPageBreak",
];

/// Containers worth dropping once cleanup has emptied them.
const DROP_IF_EMPTY: &[&str] = &["w:rPr", "w:pPr"];

pub fn scrub(root: &Element) -> Element {
    let out = strip_attrs_where(root, &|k| k.starts_with("w:rsid"));
    let out = remove_by_name(&out, NOISE_ELEMENTS);
    remove_if_empty(&out, DROP_IF_EMPTY)
}

#[cfg(test)]
mod tests {
    use super::scrub;
    use crate::docx::xml::Element;

    #[test]
    fn strips_rsids_and_proofing_noise() {
        let root = Element::new("w:body").with_child(
            Element::new("w:p")
                .with_attr("w:rsidR", "00112233")
                .with_attr("w:rsidRDefault", "00112233")
                .with_child(Element::new("w:proofErr").with_attr("w:type", "spellStart"))
                .with_child(
                    Element::new("w:r")
                        .with_child(
                            Element::new("w:rPr")
                                .with_child(Element::new("w:noProof"))
                                .with_child(Element::new("w:lang").with_attr("w:val", "en-US")),
                        )
                        .with_child(Element::new("w:t").with_text("x")),
                ),
        );
        let out = scrub(&root);
        let p = out.child("w:p").expect("p");
        assert!(p.attrs.is_empty());
        assert!(!out.has_descendant("w:proofErr"));
        // rPr emptied by the element strip, then dropped by the if-empty pass.
        assert!(!out.has_descendant("w:rPr"));
        assert_eq!(out.text(), "x");
    }

    #[test]
    fn keeps_meaningful_formatting() {
        let root = Element::new("w:p").with_child(
            Element::new("w:r")
                .with_child(Element::new("w:rPr").with_child(Element::new("w:b")))
                .with_child(Element::new("w:t").with_text("bold")),
        );
        let out = scrub(&root);
        assert!(out.has_descendant("w:b"));
    }

    #[test]
    fn is_idempotent() {
        let root = Element::new("w:p").with_attr("w:rsidP", "0A");
        let once = scrub(&root);
        assert_eq!(scrub(&once), once);
    }
}
