use anyhow::{anyhow, Context};
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;

/// WordprocessingML main namespace (used when synthesizing missing parts).
pub const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
/// Officedocument relationship namespace (the `r:` prefix in part content).
pub const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
/// Package-level relationship namespace (`_rels/*.rels` roots).
pub const NS_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
/// `[Content_Types].xml` namespace.
pub const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
/// DrawingML namespace (theme roots).
pub const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(t) => Some(t),
            Node::Element(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.attrs.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.attrs.push((key, value));
        }
    }

    pub fn remove_attr(&mut self, key: &str) {
        self.attrs.retain(|(k, _)| k != key);
    }

    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Direct child elements, in document order.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// First direct child element with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|el| el.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.child_elements().filter(move |el| el.name == name)
    }

    /// All descendant elements in pre-order, excluding `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        let mut stack: Vec<&Element> = self.child_elements().collect();
        stack.reverse();
        Descendants { stack }
    }

    pub fn has_descendant(&self, name: &str) -> bool {
        self.descendants().any(|el| el.name == name)
    }

    /// Concatenated text content of the whole subtree.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(el: &Element, out: &mut String) {
    for child in &el.children {
        match child {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
        }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let el = self.stack.pop()?;
        let mut children: Vec<&Element> = el.child_elements().collect();
        children.reverse();
        self.stack.extend(children);
        Some(el)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlDecl {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl Default for XmlDecl {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            encoding: Some("UTF-8".to_string()),
            standalone: Some("yes".to_string()),
        }
    }
}

/// One parsed XML part of a package: part name plus its element tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlPart {
    pub name: String,
    pub decl: Option<XmlDecl>,
    pub root: Element,
}

impl XmlPart {
    pub fn synthetic(name: &str, root: Element) -> Self {
        Self {
            name: name.to_string(),
            decl: Some(XmlDecl::default()),
            root,
        }
    }
}

pub fn parse_xml_part(name: &str, xml_bytes: &[u8]) -> anyhow::Result<XmlPart> {
    let mut reader = Reader::from_reader(xml_bytes);
    reader.config_mut().trim_text(false);

    let mut decl: Option<XmlDecl> = None;
    let mut root: Option<Element> = None;
    let mut stack: Vec<Element> = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let ev = reader.read_event_into(&mut buf).context("read xml event")?;
        match ev {
            Event::Eof => break,
            Event::Decl(d) => {
                let version = bytes_to_string(d.version().context("decl version")?);
                let encoding = d
                    .encoding()
                    .map(|r| r.map(bytes_to_string))
                    .transpose()
                    .unwrap_or(None);
                let standalone = d
                    .standalone()
                    .map(|r| r.map(bytes_to_string))
                    .transpose()
                    .unwrap_or(None);
                decl = Some(XmlDecl {
                    version,
                    encoding,
                    standalone,
                });
            }
            Event::Start(s) => {
                stack.push(element_from_start(&s)?);
            }
            Event::Empty(s) => {
                let el = element_from_start(&s)?;
                attach(name, &mut stack, &mut root, el)?;
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| anyhow!("unbalanced end tag in {name}"))?;
                attach(name, &mut stack, &mut root, el)?;
            }
            Event::Text(t) => {
                let txt = t.unescape().context("unescape text")?.into_owned();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Text(txt)),
                    // Whitespace between the decl and the root is legal noise.
                    None if txt.chars().all(char::is_whitespace) => {}
                    None => return Err(anyhow!("text outside root element in {name}")),
                }
            }
            Event::CData(t) => {
                let txt = bytes_to_string(t.into_inner());
                stack
                    .last_mut()
                    .ok_or_else(|| anyhow!("cdata outside root element in {name}"))?
                    .children
                    .push(Node::Text(txt));
            }
            // Word never emits these in package parts; ignore rather than fail.
            Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if !stack.is_empty() {
        return Err(anyhow!("unterminated element in {name}"));
    }
    let root = root.ok_or_else(|| anyhow!("no root element in {name}"))?;
    Ok(XmlPart {
        name: name.to_string(),
        decl,
        root,
    })
}

fn attach(
    part_name: &str,
    stack: &mut [Element],
    root: &mut Option<Element>,
    el: Element,
) -> anyhow::Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(el));
        return Ok(());
    }
    if root.is_some() {
        return Err(anyhow!("multiple root elements in {part_name}"));
    }
    *root = Some(el);
    Ok(())
}

fn element_from_start(s: &BytesStart<'_>) -> anyhow::Result<Element> {
    let mut attrs: Vec<(String, String)> = Vec::new();
    for a in s.attributes() {
        let a = a.context("attr")?;
        let key = bytes_to_string(a.key.as_ref());
        // Keep raw (already-escaped) attribute bytes so values such as VML
        // `o:gfxdata` round-trip without XML attribute normalization mangling
        // their embedded character references.
        let val = bytes_to_string(a.value.as_ref());
        attrs.push((key, val));
    }
    Ok(Element {
        name: bytes_to_string(s.name().as_ref()),
        attrs,
        children: Vec::new(),
    })
}

fn bytes_to_string(bytes: impl AsRef<[u8]>) -> String {
    String::from_utf8_lossy(bytes.as_ref()).into_owned()
}

pub fn write_xml_part(part: &XmlPart) -> anyhow::Result<Vec<u8>> {
    let mut out: Vec<u8> = Vec::new();
    if let Some(decl) = &part.decl {
        let d = BytesDecl::new(
            decl.version.as_str(),
            decl.encoding.as_deref(),
            decl.standalone.as_deref(),
        );
        let mut writer = quick_xml::Writer::new(Vec::new());
        writer.write_event(Event::Decl(d)).context("write decl")?;
        out.extend_from_slice(&writer.into_inner());
    }
    write_element(&mut out, &part.root);
    Ok(out)
}

fn write_element(out: &mut Vec<u8>, el: &Element) {
    out.extend_from_slice(b"<");
    out.extend_from_slice(el.name.as_bytes());
    // Attribute values are stored as raw (already-escaped) XML bytes. Do NOT escape again.
    for (k, v) in &el.attrs {
        out.extend_from_slice(b" ");
        out.extend_from_slice(k.as_bytes());
        out.extend_from_slice(b"=\"");
        out.extend_from_slice(v.as_bytes());
        out.extend_from_slice(b"\"");
    }
    if el.children.is_empty() {
        out.extend_from_slice(b"/>");
        return;
    }
    out.extend_from_slice(b">");
    for child in &el.children {
        match child {
            Node::Element(e) => write_element(out, e),
            Node::Text(t) => escape_text_into(out, t),
        }
    }
    out.extend_from_slice(b"</");
    out.extend_from_slice(el.name.as_bytes());
    out.extend_from_slice(b">");
}

fn escape_text_into(out: &mut Vec<u8>, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.extend_from_slice(b"&amp;"),
            '<' => out.extend_from_slice(b"&lt;"),
            '>' => out.extend_from_slice(b"&gt;"),
            _ => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_xml_part, write_xml_part, Element, Node};

    #[test]
    fn parse_builds_tree() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?><w:document><w:body><w:p><w:r><w:t>Hi</w:t></w:r></w:p></w:body></w:document>"#;
        let part = parse_xml_part("word/document.xml", xml).expect("parse");
        assert_eq!(part.root.name, "w:document");
        let body = part.root.child("w:body").expect("body");
        let para = body.child("w:p").expect("p");
        assert_eq!(para.text(), "Hi");
    }

    #[test]
    fn write_round_trips_structure() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><root a="1"><child/><child b="x&amp;y">t</child></root>"#;
        let part = parse_xml_part("test.xml", xml).expect("parse");
        let bytes = write_xml_part(&part).expect("write");
        let again = parse_xml_part("test.xml", &bytes).expect("reparse");
        assert_eq!(part.root, again.root);
    }

    #[test]
    fn write_preserves_attr_entity_refs() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?><root xmlns:o="urn:test" o:gfxdata="A&#xD;&#xA;B"/>"#;
        let part = parse_xml_part("test.xml", xml).expect("parse xml");
        let out = write_xml_part(&part).expect("write xml");
        let s = String::from_utf8(out).expect("utf8");

        assert!(s.contains(r#"o:gfxdata="A&#xD;&#xA;B""#));
        assert!(!s.contains(r#"o:gfxdata="A&amp;#xD;"#));
    }

    #[test]
    fn unbalanced_input_is_rejected() {
        let xml = br#"<root><open></root>"#;
        assert!(parse_xml_part("bad.xml", xml).is_err());
    }

    #[test]
    fn descendants_are_preorder() {
        let root = Element::new("a")
            .with_child(Element::new("b").with_child(Element::new("c")))
            .with_child(Element::new("d"));
        let names: Vec<&str> = root.descendants().map(|el| el.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "d"]);
    }

    #[test]
    fn text_skips_markup() {
        let mut p = Element::new("w:p");
        p.push(Node::Element(
            Element::new("w:r").with_child(Element::new("w:t").with_text("Hello ")),
        ));
        p.push(Node::Element(
            Element::new("w:r").with_child(Element::new("w:t").with_text("world")),
        ));
        assert_eq!(p.text(), "Hello world");
    }
}
