use std::collections::BTreeMap;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use sip_types::{is_xml_name, ContentHash, ContentInfo, SessionPackaging};

use crate::error::{SipError, SipResult};

/// Content information for the digital objects of one domain object, keyed
/// by reference information.
pub type ContentInfoMap = BTreeMap<String, ContentInfo>;

/// Builds the PDI document of the SIP currently being assembled.
///
/// The lifecycle per container is `start`, any number of `add`, then
/// `finish`. `add` receives the hashes of every digital object already
/// written for that domain object.
pub trait PdiAssembler<D> {
    fn start(&mut self, session: &SessionPackaging) -> SipResult<()>;

    fn add(&mut self, domain_object: &D, content: &ContentInfoMap) -> SipResult<()>;

    /// Serialized bytes so far.
    fn size(&self) -> u64;

    /// Close the document and return it. The assembler is then ready for
    /// the next `start`.
    fn finish(&mut self) -> SipResult<Vec<u8>>;
}

/// Streams a PDI document with one `<{entity}>` element per domain object
/// inside a `<{entity}s xmlns="{schema}">` root.
///
/// The element body is produced by a caller-supplied fragment function.
pub struct XmlPdiAssembler<F> {
    fragment: F,
    root_element: Option<String>,
    entity_element: Option<String>,
    current: Option<Document>,
}

struct Document {
    writer: Writer<Vec<u8>>,
    root: String,
    entity: String,
}

impl<F> XmlPdiAssembler<F> {
    pub fn new<D>(fragment: F) -> Self
    where
        F: FnMut(&D, &ContentInfoMap, &mut XmlFragment<'_>) -> SipResult<()>,
    {
        Self {
            fragment,
            root_element: None,
            entity_element: None,
            current: None,
        }
    }

    /// Override the root element name (default: entity name plus `s`).
    pub fn with_root_element(mut self, name: impl Into<String>) -> Self {
        self.root_element = Some(name.into());
        self
    }

    /// Override the per-object element name (default: entity name).
    pub fn with_entity_element(mut self, name: impl Into<String>) -> Self {
        self.entity_element = Some(name.into());
        self
    }

    fn document(&mut self) -> SipResult<&mut Document> {
        self.current
            .as_mut()
            .ok_or_else(|| SipError::Pdi("no PDI document in progress".into()))
    }
}

impl<D, F> PdiAssembler<D> for XmlPdiAssembler<F>
where
    F: FnMut(&D, &ContentInfoMap, &mut XmlFragment<'_>) -> SipResult<()>,
{
    fn start(&mut self, session: &SessionPackaging) -> SipResult<()> {
        let entity = self
            .entity_element
            .clone()
            .unwrap_or_else(|| session.info.entity.clone());
        let root = self
            .root_element
            .clone()
            .unwrap_or_else(|| format!("{entity}s"));
        checked_name(&root)?;
        checked_name(&entity)?;

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        let mut start = BytesStart::new(root.as_str());
        start.push_attribute(("xmlns", session.info.schema.as_str()));
        writer.write_event(Event::Start(start))?;

        self.current = Some(Document { writer, root, entity });
        Ok(())
    }

    fn add(&mut self, domain_object: &D, content: &ContentInfoMap) -> SipResult<()> {
        let document = self
            .current
            .as_mut()
            .ok_or_else(|| SipError::Pdi("no PDI document in progress".into()))?;
        let entity = document.entity.as_str();
        document
            .writer
            .write_event(Event::Start(BytesStart::new(entity)))?;

        let mut fragment = XmlFragment::new(&mut document.writer);
        (self.fragment)(domain_object, content, &mut fragment)?;
        fragment.close()?;

        document.writer.write_event(Event::End(BytesEnd::new(entity)))?;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.current
            .as_ref()
            .map_or(0, |d| d.writer.get_ref().len() as u64)
    }

    fn finish(&mut self) -> SipResult<Vec<u8>> {
        let document = self.document()?;
        let root = document.root.clone();
        document.writer.write_event(Event::End(BytesEnd::new(root.as_str())))?;
        match self.current.take() {
            Some(document) => Ok(document.writer.into_inner()),
            None => Err(SipError::Pdi("no PDI document in progress".into())),
        }
    }
}

fn checked_name(name: &str) -> SipResult<&str> {
    if is_xml_name(name) {
        Ok(name)
    } else {
        Err(SipError::Pdi(format!("{name:?} is not a valid XML element name")))
    }
}

/// Writes the body of one PDI fragment.
///
/// Every element opened with [`start`](Self::start) must be closed with
/// [`end`](Self::end) before the fragment function returns.
pub struct XmlFragment<'w> {
    writer: &'w mut Writer<Vec<u8>>,
    open: Vec<String>,
}

impl<'w> XmlFragment<'w> {
    fn new(writer: &'w mut Writer<Vec<u8>>) -> Self {
        Self {
            writer,
            open: Vec::new(),
        }
    }

    /// `<name>text</name>`
    pub fn element(&mut self, name: &str, text: &str) -> SipResult<&mut Self> {
        checked_name(name)?;
        self.writer.write_event(Event::Start(BytesStart::new(name)))?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(self)
    }

    /// Like [`element`](Self::element), skipped when `text` is `None`.
    pub fn optional_element(&mut self, name: &str, text: Option<&str>) -> SipResult<&mut Self> {
        match text {
            Some(text) => self.element(name, text),
            None => Ok(self),
        }
    }

    pub fn start(&mut self, name: &str) -> SipResult<&mut Self> {
        self.start_with(name, &[])
    }

    pub fn start_with(&mut self, name: &str, attributes: &[(&str, &str)]) -> SipResult<&mut Self> {
        let mut start = BytesStart::new(checked_name(name)?);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.writer.write_event(Event::Start(start))?;
        self.open.push(name.to_string());
        Ok(self)
    }

    /// Close the most recently started element.
    pub fn end(&mut self) -> SipResult<&mut Self> {
        let name = self
            .open
            .pop()
            .ok_or_else(|| SipError::Pdi("end() without matching start()".into()))?;
        self.writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        Ok(self)
    }

    /// `<name a="b"/>`
    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> SipResult<&mut Self> {
        let mut element = BytesStart::new(checked_name(name)?);
        for attribute in attributes {
            element.push_attribute(*attribute);
        }
        self.writer.write_event(Event::Empty(element))?;
        Ok(self)
    }

    /// `<hashes><hash algorithm=".." encoding=".." value=".."/>..</hashes>`
    pub fn hashes(&mut self, hashes: &[ContentHash]) -> SipResult<&mut Self> {
        self.start("hashes")?;
        for hash in hashes {
            self.empty(
                "hash",
                &[
                    ("algorithm", hash.function.name()),
                    ("encoding", hash.encoding.name()),
                    ("value", hash.value.as_str()),
                ],
            )?;
        }
        self.end()
    }

    fn close(self) -> SipResult<()> {
        match self.open.last() {
            Some(name) => Err(SipError::Pdi(format!("element <{name}> left open by fragment"))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sip_types::{Encoding, HashFunction, PackagingInformation};

    use super::*;

    fn session() -> SessionPackaging {
        PackagingInformation::builder()
            .application("app")
            .holding("holding")
            .producer("producer")
            .entity("file")
            .schema("urn:test:files:1.0")
            .dss_prefix("dss-")
            .build()
            .unwrap()
            .for_session("dss-1", Utc::now())
    }

    fn name_fragment(name: &&str, _: &ContentInfoMap, xml: &mut XmlFragment<'_>) -> SipResult<()> {
        xml.element("name", name)?;
        Ok(())
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn empty_document_is_well_formed() {
        let mut pdi = XmlPdiAssembler::new(name_fragment);
        PdiAssembler::<&str>::start(&mut pdi, &session()).unwrap();
        let xml = text(PdiAssembler::<&str>::finish(&mut pdi).unwrap());
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"<files xmlns="urn:test:files:1.0">"#));
        assert!(xml.trim_end().ends_with("</files>"));
    }

    #[test]
    fn fragments_in_insertion_order_and_escaped() {
        let mut pdi = XmlPdiAssembler::new(name_fragment);
        let content = ContentInfoMap::new();
        PdiAssembler::<&str>::start(&mut pdi, &session()).unwrap();
        pdi.add(&"first", &content).unwrap();
        pdi.add(&"a<b&c", &content).unwrap();
        let xml = text(PdiAssembler::<&str>::finish(&mut pdi).unwrap());

        let first = xml.find("<name>first</name>").unwrap();
        let second = xml.find("<name>a&lt;b&amp;c</name>").unwrap();
        assert!(first < second);
        assert_eq!(xml.matches("<file>").count(), 2);
    }

    #[test]
    fn size_grows_with_fragments() {
        let mut pdi = XmlPdiAssembler::new(name_fragment);
        PdiAssembler::<&str>::start(&mut pdi, &session()).unwrap();
        let before = PdiAssembler::<&str>::size(&pdi);
        assert!(before > 0);
        pdi.add(&"x", &ContentInfoMap::new()).unwrap();
        assert!(PdiAssembler::<&str>::size(&pdi) > before);
    }

    #[test]
    fn hashes_and_custom_names() {
        let mut pdi = XmlPdiAssembler::new(|_: &(), content: &ContentInfoMap, xml: &mut XmlFragment<'_>| {
            for info in content.values() {
                xml.start_with("content", &[("path", info.reference_information.as_str())])?;
                xml.hashes(&info.hashes)?;
                xml.end()?;
            }
            Ok(())
        })
        .with_root_element("records")
        .with_entity_element("record");

        let mut content = ContentInfoMap::new();
        content.insert(
            "a.txt".into(),
            ContentInfo {
                reference_information: "a.txt".into(),
                size: 3,
                hashes: vec![ContentHash::new(HashFunction::Sha256, Encoding::Hex, "abcd")],
            },
        );
        PdiAssembler::<()>::start(&mut pdi, &session()).unwrap();
        pdi.add(&(), &content).unwrap();
        let xml = text(PdiAssembler::<()>::finish(&mut pdi).unwrap());
        assert!(xml.contains(r#"<records xmlns="urn:test:files:1.0">"#));
        assert!(xml.contains(r#"<content path="a.txt">"#));
        assert!(xml.contains(r#"<hash algorithm="sha-256" encoding="hex" value="abcd"/>"#));
        assert!(xml.contains("</record>"));
    }

    #[test]
    fn unclosed_fragment_element_is_an_error() {
        let mut pdi = XmlPdiAssembler::new(|_: &(), _: &ContentInfoMap, xml: &mut XmlFragment<'_>| {
            xml.start("dangling")?;
            Ok(())
        });
        PdiAssembler::<()>::start(&mut pdi, &session()).unwrap();
        let err = pdi.add(&(), &ContentInfoMap::new()).unwrap_err();
        assert!(matches!(err, SipError::Pdi(_)));
    }

    #[test]
    fn invalid_element_overrides_are_rejected_at_start() {
        let mut pdi = XmlPdiAssembler::new(name_fragment).with_root_element("x&ys");
        let err = PdiAssembler::<&str>::start(&mut pdi, &session()).unwrap_err();
        assert!(matches!(err, SipError::Pdi(_)));

        let mut pdi = XmlPdiAssembler::new(name_fragment).with_entity_element("1record");
        let err = PdiAssembler::<&str>::start(&mut pdi, &session()).unwrap_err();
        assert!(matches!(err, SipError::Pdi(_)));
        assert_eq!(PdiAssembler::<&str>::size(&pdi), 0);
    }

    #[test]
    fn invalid_fragment_element_name_is_an_error() {
        let mut pdi = XmlPdiAssembler::new(|_: &(), _: &ContentInfoMap, xml: &mut XmlFragment<'_>| {
            xml.element("a b", "text")?;
            Ok(())
        });
        PdiAssembler::<()>::start(&mut pdi, &session()).unwrap();
        let err = pdi.add(&(), &ContentInfoMap::new()).unwrap_err();
        assert!(matches!(err, SipError::Pdi(_)));
    }

    #[test]
    fn add_without_start_is_an_error() {
        let mut pdi = XmlPdiAssembler::new(name_fragment);
        assert!(pdi.add(&"x", &ContentInfoMap::new()).is_err());
    }
}
