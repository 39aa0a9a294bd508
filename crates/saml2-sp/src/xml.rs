//! Minimal XML document model over quick-xml.
//!
//! SAML messages are small, so inbound documents are parsed into an owned
//! [`XmlElement`] tree keyed by local names. Namespace prefixes are dropped:
//! element names are unique enough across the SAML, XML-DSig and XML-Enc
//! vocabularies that the local name identifies the element.
//!
//! Signature processing needs the exact bytes of an element, which a tree
//! cannot give back, so this module also offers a small tag scanner that
//! locates element spans in the raw document.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{SamlError, SamlResult};

/// A parsed XML element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Local name (no namespace prefix).
    pub name: String,
    /// Attributes by local name, unescaped. Namespace declarations are skipped.
    pub attributes: Vec<(String, String)>,
    /// Concatenated, trimmed text content.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Parses a document and returns its root element.
    ///
    /// Documents carrying a DOCTYPE are rejected.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    ensure_single_root(root.as_ref(), &stack)?;
                    stack.push(Self::from_start(&e)?);
                }
                Event::Empty(e) => {
                    ensure_single_root(root.as_ref(), &stack)?;
                    let element = Self::from_start(&e)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        SamlError::MalformedMessage("unexpected closing tag".to_string())
                    })?;
                    attach(&mut stack, &mut root, element);
                }
                Event::Text(t) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&t.unescape()?);
                    }
                }
                Event::CData(c) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::DocType(_) => {
                    return Err(SamlError::MalformedMessage(
                        "DOCTYPE is not allowed".to_string(),
                    ));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(SamlError::MalformedMessage("unclosed element".to_string()));
        }
        root.ok_or_else(|| SamlError::MalformedMessage("empty document".to_string()))
    }

    fn from_start(e: &BytesStart<'_>) -> SamlResult<Self> {
        Ok(Self {
            name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
            attributes: read_attributes(e)?,
            text: String::new(),
            children: Vec::new(),
        })
    }

    /// Returns the value of the attribute with the given local name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first child with the given local name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Returns all children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Returns the first element with the given local name in depth-first
    /// order, excluding `self`.
    #[must_use]
    pub fn descendant(&self, name: &str) -> Option<&XmlElement> {
        self.children
            .iter()
            .find_map(|c| if c.name == name { Some(c) } else { c.descendant(name) })
    }

    /// Returns the text of the first child with the given local name.
    #[must_use]
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }
}

/// Attributes of a start tag by local name, unescaped, skipping namespace
/// declarations. Shared by the tree and the raw scanner so both agree on
/// which element carries an identifier.
fn read_attributes(e: &BytesStart<'_>) -> SamlResult<Vec<(String, String)>> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let local = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((local, value));
    }
    Ok(attributes)
}

fn ensure_single_root(root: Option<&XmlElement>, stack: &[XmlElement]) -> SamlResult<()> {
    if root.is_some() && stack.is_empty() {
        return Err(SamlError::MalformedMessage(
            "document has more than one root element".to_string(),
        ));
    }
    Ok(())
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

/// Escapes text for use in element content or attribute values.
#[must_use]
pub fn escape(s: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(s)
}

/// Normalizes whitespace runs to single spaces.
///
/// This is the canonical form signed and verified by the default signature
/// service.
#[must_use]
pub fn normalize_whitespace(xml: &str) -> String {
    xml.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ----------------------------------------------------------------------------
// Raw span scanning
// ----------------------------------------------------------------------------

/// Byte span of an element in a raw document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ElementSpan {
    /// Offset of the opening `<`.
    pub start: usize,
    /// Offset just past the start tag's `>`.
    pub start_tag_end: usize,
    /// Offset just past the element's final `>`.
    pub end: usize,
    /// Qualified name as written in the document.
    pub qname: String,
}

impl ElementSpan {
    pub(crate) fn local_name(&self) -> &str {
        local_part(&self.qname)
    }

    pub(crate) fn is_empty_element(&self) -> bool {
        self.start_tag_end == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Open,
    Close,
    SelfClosing,
}

#[derive(Debug)]
struct RawTag<'a> {
    kind: TagKind,
    start: usize,
    end: usize,
    qname: &'a str,
    text: &'a str,
}

fn local_part(qname: &str) -> &str {
    qname.rsplit(':').next().unwrap_or(qname)
}

/// Returns the next element tag at or after `from`, skipping comments,
/// processing instructions, CDATA sections and declarations.
fn next_tag(xml: &str, mut from: usize) -> Option<RawTag<'_>> {
    let bytes = xml.as_bytes();
    loop {
        let start = from + xml.get(from..)?.find('<')?;
        let rest = &xml[start..];
        if rest.starts_with("<!--") {
            from = start + rest.find("-->")? + 3;
            continue;
        }
        if rest.starts_with("<![CDATA[") {
            from = start + rest.find("]]>")? + 3;
            continue;
        }
        if rest.starts_with("<?") {
            from = start + rest.find("?>")? + 2;
            continue;
        }
        if rest.starts_with("<!") {
            from = start + rest.find('>')? + 1;
            continue;
        }

        // Find the closing '>' outside quoted attribute values.
        let mut quote: Option<u8> = None;
        let mut end = None;
        for (i, &b) in bytes[start..].iter().enumerate() {
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'>') => {
                    end = Some(start + i + 1);
                    break;
                }
                _ => {}
            }
        }
        let end = end?;
        let text = &xml[start..end];

        let (kind, name_from) = if text.starts_with("</") {
            (TagKind::Close, 2)
        } else if text.ends_with("/>") {
            (TagKind::SelfClosing, 1)
        } else {
            (TagKind::Open, 1)
        };
        let name_len = text[name_from..]
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(text.len() - name_from);
        let qname = &text[name_from..name_from + name_len];

        return Some(RawTag {
            kind,
            start,
            end,
            qname,
            text,
        });
    }
}

/// Returns the value of an attribute in a raw start tag, read the same way
/// as [`XmlElement::attr`]: by local name, with entities unescaped.
fn raw_attr(tag_text: &str, name: &str) -> Option<String> {
    let mut reader = Reader::from_str(tag_text);
    match reader.read_event().ok()? {
        Event::Start(e) | Event::Empty(e) => read_attributes(&e)
            .ok()?
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v),
        _ => None,
    }
}

/// Completes the span of the element whose start tag is `tag`.
fn span_of(xml: &str, tag: &RawTag<'_>) -> SamlResult<ElementSpan> {
    if tag.kind == TagKind::SelfClosing {
        return Ok(ElementSpan {
            start: tag.start,
            start_tag_end: tag.end,
            end: tag.end,
            qname: tag.qname.to_string(),
        });
    }

    let mut depth = 0usize;
    let mut pos = tag.end;
    while let Some(next) = next_tag(xml, pos) {
        pos = next.end;
        if next.qname != tag.qname {
            continue;
        }
        match next.kind {
            TagKind::Open => depth += 1,
            TagKind::Close if depth == 0 => {
                return Ok(ElementSpan {
                    start: tag.start,
                    start_tag_end: tag.end,
                    end: next.end,
                    qname: tag.qname.to_string(),
                });
            }
            TagKind::Close => depth -= 1,
            TagKind::SelfClosing => {}
        }
    }
    Err(SamlError::MalformedMessage(format!(
        "element '{}' is not closed",
        tag.qname
    )))
}

/// Locates the single element carrying `ID="id"`.
///
/// Fails when no element or more than one element carries the identifier.
pub(crate) fn find_element_by_id(xml: &str, id: &str) -> SamlResult<ElementSpan> {
    let mut found: Option<ElementSpan> = None;
    let mut pos = 0;
    while let Some(tag) = next_tag(xml, pos) {
        pos = tag.end;
        if tag.kind == TagKind::Close || raw_attr(tag.text, "ID").as_deref() != Some(id) {
            continue;
        }
        if found.is_some() {
            return Err(SamlError::SignatureInvalid(format!(
                "identifier '{id}' is used by more than one element"
            )));
        }
        found = Some(span_of(xml, &tag)?);
    }
    found.ok_or_else(|| SamlError::MalformedMessage(format!("no element with ID '{id}'")))
}

/// Iterates over the direct children of `parent` in document order.
pub(crate) fn child_spans<'a>(xml: &'a str, parent: &ElementSpan) -> impl Iterator<Item = ElementSpan> + 'a {
    let content_end = parent.end;
    let mut pos = (!parent.is_empty_element()).then_some(parent.start_tag_end);
    std::iter::from_fn(move || {
        let tag = next_tag(xml, pos?)?;
        if tag.start >= content_end || tag.kind == TagKind::Close {
            pos = None;
            return None;
        }
        let span = span_of(xml, &tag).ok()?;
        pos = Some(span.end);
        Some(span)
    })
}

/// Locates the first direct child of `parent` with the given local name.
pub(crate) fn find_child(xml: &str, parent: &ElementSpan, local_name: &str) -> Option<ElementSpan> {
    child_spans(xml, parent).find(|span| span.local_name() == local_name)
}

/// Returns the span of the document's root element.
pub(crate) fn root_span(xml: &str) -> SamlResult<ElementSpan> {
    let tag = next_tag(xml, 0)
        .filter(|t| t.kind != TagKind::Close)
        .ok_or_else(|| SamlError::MalformedMessage("empty document".to_string()))?;
    span_of(xml, &tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="r1" Destination="https://sp.example/acs?a=1&amp;b=2">
  <saml:Issuer xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion">https://idp.example</saml:Issuer>
  <!-- <saml:Assertion ID="fake"> -->
  <saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="a1">
    <saml:Subject><saml:NameID>alice</saml:NameID></saml:Subject>
    <saml:Advice><saml:Assertion ID="a2"/></saml:Advice>
  </saml:Assertion>
</samlp:Response>"#;

    #[test]
    fn parse_tree_by_local_name() {
        let root = XmlElement::parse(DOC).unwrap();
        assert_eq!(root.name, "Response");
        assert_eq!(root.attr("Destination"), Some("https://sp.example/acs?a=1&b=2"));
        assert!(root.attr("xmlns:samlp").is_none());
        assert_eq!(root.child_text("Issuer"), Some("https://idp.example"));
        assert_eq!(root.descendant("NameID").map(|n| n.text.as_str()), Some("alice"));
        assert_eq!(root.children_named("Assertion").count(), 1);
    }

    #[test]
    fn parse_rejects_doctype_and_garbage() {
        let doctype = r#"<!DOCTYPE r [<!ENTITY x "y">]><r>&x;</r>"#;
        assert!(matches!(
            XmlElement::parse(doctype),
            Err(SamlError::MalformedMessage(_))
        ));
        assert!(XmlElement::parse("<a><b></a>").is_err());
        assert!(XmlElement::parse("").is_err());
        assert!(XmlElement::parse("<a/><b/>").is_err());
    }

    #[test]
    fn spans_follow_nesting_and_skip_comments() {
        let response = find_element_by_id(DOC, "r1").unwrap();
        assert_eq!(response.local_name(), "Response");
        assert!(DOC[response.start..response.end].ends_with("</samlp:Response>"));

        let assertion = find_element_by_id(DOC, "a1").unwrap();
        let text = &DOC[assertion.start..assertion.end];
        assert!(text.starts_with("<saml:Assertion"));
        assert!(text.ends_with("</saml:Assertion>"));
        assert!(text.contains("ID=\"a2\""));

        let inner = find_element_by_id(DOC, "a2").unwrap();
        assert!(inner.is_empty_element());
        assert!(find_element_by_id(DOC, "fake").is_err());
    }

    #[test]
    fn find_child_only_sees_direct_children() {
        let response = root_span(DOC).unwrap();
        let issuer = find_child(DOC, &response, "Issuer").unwrap();
        assert_eq!(&DOC[issuer.start_tag_end..issuer.end], "https://idp.example</saml:Issuer>");
        assert!(find_child(DOC, &response, "NameID").is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let doc = r#"<r><a ID="x"/><b><a ID="x"></a></b></r>"#;
        assert!(matches!(
            find_element_by_id(doc, "x"),
            Err(SamlError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn raw_attr_matches_whole_names() {
        let tag = r#"<a RequestID="no" ID = 'yes'>"#;
        assert_eq!(raw_attr(tag, "ID").as_deref(), Some("yes"));
    }

    #[test]
    fn raw_attr_reads_ids_like_the_tree() {
        for tag in [r#"<a ID="&#95;r1"/>"#, r#"<a x:ID="_r1"/>"#] {
            assert_eq!(raw_attr(tag, "ID").as_deref(), Some("_r1"));
            assert_eq!(XmlElement::parse(tag).unwrap().attr("ID"), Some("_r1"));
        }
    }

    #[test]
    fn escaped_and_prefixed_ids_count_as_duplicates() {
        for alias in [r#"ID="&#95;r1""#, r#"x:ID="_r1""#] {
            let doc = format!(r#"<r {alias}><e><r ID="_r1"><s/></r></e></r>"#);
            assert!(matches!(
                find_element_by_id(&doc, "_r1"),
                Err(SamlError::SignatureInvalid(_))
            ));
        }
    }

    #[test]
    fn child_spans_lists_direct_children() {
        let response = root_span(DOC).unwrap();
        let names: Vec<_> = child_spans(DOC, &response)
            .map(|c| c.local_name().to_string())
            .collect();
        assert_eq!(names, ["Issuer", "Assertion"]);
        let empty = find_element_by_id(DOC, "a2").unwrap();
        assert_eq!(child_spans(DOC, &empty).count(), 0);
    }

    #[test]
    fn whitespace_normalization() {
        assert_eq!(normalize_whitespace("  <a>\n  b\t</a> "), "<a> b </a>");
    }
}
