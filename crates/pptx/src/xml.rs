//! Minimal order-preserving XML tree for editing package parts.
//!
//! Parts are parsed with quick-xml into owned elements and written back in
//! the same order. Anything that is not an element or character data
//! (declarations, comments, processing instructions, CDATA) is kept as the
//! raw event.

use qbr_core::{Error, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// A node inside an element.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    /// Unescaped character data.
    Text(String),
    /// Any other event, written back verbatim.
    Raw(Event<'static>),
}

/// An element with its attributes in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an empty element with a qualified name such as `a:p`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.push(child);
        self
    }

    /// Name without namespace prefix.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Namespace prefix, if the name has one.
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Qualified name for a sibling element in the same namespace.
    pub fn qualify(&self, local: &str) -> String {
        match self.prefix() {
            Some(prefix) => format!("{}:{}", prefix, local),
            None => local.to_string(),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.attributes.push((key.to_string(), value.to_string())),
        }
    }

    /// Append a child element.
    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Child elements in order.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    /// Mutable child elements in order.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    /// First child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.local_name() == local)
    }

    /// Mutable first child element with the given local name.
    pub fn child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|el| el.local_name() == local)
    }

    /// Follow a chain of local names through first matching children.
    pub fn find(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter().try_fold(self, |el, local| el.child(local))
    }

    /// Mutable variant of [`XmlElement::find`].
    pub fn find_mut(&mut self, path: &[&str]) -> Option<&mut XmlElement> {
        path.iter().try_fold(self, |el, local| el.child_mut(local))
    }

    /// Concatenated character data of direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: &str) {
        self.children.clear();
        if !text.is_empty() {
            self.children.push(XmlNode::Text(text.to_string()));
        }
    }

    /// Insert `child` after the last child element whose local name is in
    /// `after`, or before the first child element when none matches.
    pub fn insert_after(&mut self, after: &[&str], child: XmlElement) {
        let is_element = |node: &XmlNode| matches!(node, XmlNode::Element(_));
        let index = self
            .children
            .iter()
            .rposition(|node| match node {
                XmlNode::Element(el) => after.iter().any(|name| *name == el.local_name()),
                _ => false,
            })
            .map(|i| i + 1)
            .or_else(|| self.children.iter().position(is_element))
            .unwrap_or(self.children.len());
        self.children.insert(index, XmlNode::Element(child));
    }

    /// Keep only child nodes for which `keep` returns true. Text and raw
    /// nodes are passed as `None`.
    pub fn retain_children<F>(&mut self, mut keep: F)
    where
        F: FnMut(Option<&XmlElement>) -> bool,
    {
        self.children.retain(|node| match node {
            XmlNode::Element(el) => keep(Some(el)),
            _ => keep(None),
        });
    }
}

/// A parsed XML part: leading events, root element, trailing events.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub prolog: Vec<Event<'static>>,
    pub root: XmlElement,
    pub epilog: Vec<Event<'static>>,
}

impl XmlDocument {
    /// Wrap a root element with the standard OOXML declaration.
    pub fn with_root(root: XmlElement) -> Self {
        let decl = quick_xml::events::BytesDecl::new("1.0", Some("UTF-8"), Some("yes"));
        Self {
            prolog: vec![Event::Decl(decl)],
            root,
            epilog: Vec::new(),
        }
    }

    /// Parse a complete XML document.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| Error::XmlError(format!("at byte {}: {}", reader.buffer_position(), e)))?;

            match event {
                Event::Start(ref e) => {
                    stack.push(start_element(e)?);
                }
                Event::Empty(ref e) => {
                    let el = start_element(e)?;
                    attach(&mut stack, &mut root, el)?;
                }
                Event::End(_) => {
                    let el = stack
                        .pop()
                        .ok_or_else(|| Error::XmlError("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, el)?;
                }
                Event::Text(ref e) => {
                    let text = e
                        .unescape()
                        .map_err(|e| Error::XmlError(format!("bad character data: {}", e)))?
                        .into_owned();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Text(text)),
                        None if root.is_none() => prolog.push(Event::Text(e.clone().into_owned())),
                        None => epilog.push(Event::Text(e.clone().into_owned())),
                    }
                }
                Event::Eof => break,
                other => match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Raw(other.into_owned())),
                    None if root.is_none() => prolog.push(other.into_owned()),
                    None => epilog.push(other.into_owned()),
                },
            }
        }

        if !stack.is_empty() {
            return Err(Error::XmlError("unexpected end of document".to_string()));
        }
        let root = root.ok_or_else(|| Error::XmlError("document has no root element".to_string()))?;

        Ok(Self {
            prolog,
            root,
            epilog,
        })
    }

    /// Parse a part's raw bytes, which must be UTF-8.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self> {
        let xml = std::str::from_utf8(bytes)
            .map_err(|e| Error::XmlError(format!("part is not UTF-8: {}", e)))?;
        Self::parse(xml.trim_start_matches('\u{feff}'))
    }

    /// Serialize back to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.prolog {
            write_event(&mut writer, event.clone())?;
        }
        write_element(&mut writer, &self.root)?;
        for event in &self.epilog {
            write_event(&mut writer, event.clone())?;
        }
        Ok(writer.into_inner())
    }
}

fn start_element(e: &BytesStart<'_>) -> Result<XmlElement> {
    let mut el = XmlElement::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::XmlError(format!("bad attribute: {}", e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::XmlError(format!("bad attribute value: {}", e)))?
            .into_owned();
        el.attributes.push((key, value));
    }
    Ok(el)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, el: XmlElement) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.push(el);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(el);
            Ok(())
        }
        None => Err(Error::XmlError("multiple root elements".to_string())),
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::XmlError(format!("write failed: {}", e)))
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(el.name.as_str());
    for (key, value) in &el.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if el.children.is_empty() {
        return write_event(writer, Event::Empty(start));
    }

    write_event(writer, Event::Start(start))?;
    for child in &el.children {
        match child {
            XmlNode::Element(child) => write_element(writer, child)?,
            XmlNode::Text(text) => write_event(writer, Event::Text(BytesText::new(text)))?,
            XmlNode::Raw(event) => write_event(writer, event.clone())?,
        }
    }
    write_event(writer, Event::End(BytesEnd::new(el.name.as_str())))
}

/// Extract the local name from a potentially namespaced XML element name.
pub fn local_name(name: &str) -> &str {
    match name.split_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n\
        <p:sld xmlns:a=\"urn:a\" xmlns:p=\"urn:p\"><!-- note --><a:p><a:r><a:t> Tom &amp; Jerry </a:t></a:r><a:br/></a:p></p:sld>";

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("p:sp"), "sp");
        assert_eq!(local_name("a:t"), "t");
        assert_eq!(local_name("sp"), "sp");
    }

    #[test]
    fn test_parse_tree() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.root.name, "p:sld");
        assert_eq!(doc.root.attr("xmlns:a"), Some("urn:a"));
        let t = doc.root.find(&["p", "r", "t"]).unwrap();
        assert_eq!(t.text(), " Tom & Jerry ");
        assert_eq!(doc.prolog.len(), 2);
    }

    #[test]
    fn test_round_trip_preserves_content() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        let bytes = doc.to_bytes().unwrap();
        let again = XmlDocument::parse_bytes(&bytes).unwrap();
        assert_eq!(doc, again);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("<!-- note -->"));
        assert!(text.contains("Tom &amp; Jerry"));
        assert!(text.contains("<a:br/>"));
    }

    #[test]
    fn test_set_text_escapes_on_write() {
        let mut doc = XmlDocument::parse("<a:t>x</a:t>").unwrap();
        doc.root.set_text("<b> & \"c\"");
        let again = XmlDocument::parse_bytes(&doc.to_bytes().unwrap()).unwrap();
        assert_eq!(again.root.text(), "<b> & \"c\"");
    }

    #[test]
    fn test_qualify_and_attrs() {
        let mut el = XmlElement::new("a:p").with_attr("lvl", "1");
        assert_eq!(el.qualify("r"), "a:r");
        el.set_attr("lvl", "2");
        assert_eq!(el.attr("lvl"), Some("2"));
        assert_eq!(XmlElement::new("Relationship").qualify("x"), "x");
    }

    #[test]
    fn test_insert_after() {
        let mut root = XmlDocument::parse("<p:presentation><p:sldMasterIdLst/><p:sldIdLst/></p:presentation>")
            .unwrap()
            .root;
        root.insert_after(&["sldMasterIdLst"], XmlElement::new("p:notesMasterIdLst"));
        let names: Vec<&str> = root.elements().map(|el| el.local_name()).collect();
        assert_eq!(names, vec!["sldMasterIdLst", "notesMasterIdLst", "sldIdLst"]);

        let mut root = XmlDocument::parse("<p:presentation><p:sldIdLst/></p:presentation>")
            .unwrap()
            .root;
        root.insert_after(&["sldMasterIdLst"], XmlElement::new("p:notesMasterIdLst"));
        let names: Vec<&str> = root.elements().map(|el| el.local_name()).collect();
        assert_eq!(names, vec!["notesMasterIdLst", "sldIdLst"]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(XmlDocument::parse("<a><b></a>").is_err());
        assert!(XmlDocument::parse("").is_err());
        assert!(XmlDocument::parse_bytes(&[0xff, 0xfe, 0x00]).is_err());
    }
}
