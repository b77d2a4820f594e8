use std::collections::HashMap;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use sip_crypto::hash_bytes;
use sip_pack::{SipReader, DESCRIPTOR_ENTRY, PDI_ENTRY};
use sip_types::{Encoding, HashFunction};

/// Outcome of checking one SIP.
#[derive(Debug, Serialize)]
pub struct Verification {
    pub file: String,
    pub dss_id: Option<String>,
    pub digital_objects: usize,
    pub hashes_checked: usize,
    pub problems: Vec<String>,
}

impl Verification {
    fn new(file: String) -> Self {
        Self {
            file,
            dss_id: None,
            digital_objects: 0,
            hashes_checked: 0,
            problems: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

pub fn verify_file(path: &Path) -> Verification {
    let file = path.display().to_string();
    match SipReader::open(path) {
        Ok(reader) => verify(&reader, file),
        Err(e) => {
            let mut v = Verification::new(file);
            v.problems.push(format!("container: {e}"));
            v
        }
    }
}

/// Check entry CRCs, the descriptor's PDI hash, and every content hash the
/// PDI declares against the embedded bytes.
pub fn verify(reader: &SipReader, file: String) -> Verification {
    let mut v = Verification::new(file);

    let mut contents = HashMap::new();
    for entry in reader.digital_objects() {
        v.digital_objects += 1;
        match reader.read(entry) {
            Ok(bytes) => {
                contents.insert(entry.name.clone(), bytes);
            }
            Err(e) => v.problems.push(format!("{}: {e}", entry.name)),
        }
    }

    let pdi = match reader.pdi() {
        Ok(Some(pdi)) => pdi,
        Ok(None) => {
            v.problems.push(format!("missing {PDI_ENTRY}"));
            return v;
        }
        Err(e) => {
            v.problems.push(format!("{PDI_ENTRY}: {e}"));
            return v;
        }
    };

    match reader.descriptor() {
        Ok(Some(descriptor)) => {
            if let Err(e) = check_descriptor(&descriptor, &pdi, &mut v) {
                v.problems.push(format!("{DESCRIPTOR_ENTRY}: {e}"));
            }
        }
        Ok(None) => v.problems.push(format!("missing {DESCRIPTOR_ENTRY}")),
        Err(e) => v.problems.push(format!("{DESCRIPTOR_ENTRY}: {e}")),
    }

    if let Err(e) = check_content_hashes(&pdi, &contents, &mut v) {
        v.problems.push(format!("{PDI_ENTRY}: {e}"));
    }
    v
}

fn check_descriptor(descriptor: &[u8], pdi: &[u8], v: &mut Verification) -> anyhow::Result<()> {
    let mut reader = Reader::from_str(std::str::from_utf8(descriptor)?);
    reader.trim_text(true);

    let mut current = String::new();
    let mut hash_spec = None;
    let mut declared = None;
    let mut page_count = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                current = element_name(&e);
                if current == "pdi_hash" {
                    hash_spec = Some(attributes(&e)?);
                }
            }
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                match current.as_str() {
                    "id" => v.dss_id = Some(text),
                    "page_count" => page_count = text.parse::<usize>().ok(),
                    "pdi_hash" => declared = Some(text),
                    _ => {}
                }
            }
            Event::End(_) => current.clear(),
            Event::Eof => break,
            _ => {}
        }
    }

    match (hash_spec, declared) {
        (Some(attrs), Some(declared)) => {
            let function: HashFunction = attrs.get("algorithm").map_or("sha-256", String::as_str).parse()?;
            let encoding: Encoding = attrs.get("encoding").map_or("base64", String::as_str).parse()?;
            if hash_bytes(function, encoding, pdi).value != declared {
                v.problems.push(format!("{PDI_ENTRY}: {function} does not match descriptor"));
            }
        }
        _ => v.problems.push(format!("{DESCRIPTOR_ENTRY}: no pdi_hash")),
    }
    if let Some(count) = page_count {
        if count != v.digital_objects {
            v.problems.push(format!(
                "{DESCRIPTOR_ENTRY}: page_count {count} but {} digital objects embedded",
                v.digital_objects
            ));
        }
    }
    Ok(())
}

/// Hashes apply to the content named by the nearest preceding `<path>`
/// element or `path` attribute.
fn check_content_hashes(pdi: &[u8], contents: &HashMap<String, Vec<u8>>, v: &mut Verification) -> anyhow::Result<()> {
    let mut reader = Reader::from_str(std::str::from_utf8(pdi)?);
    reader.trim_text(true);

    let mut current = String::new();
    let mut path: Option<String> = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                current = element_name(&e);
                if let Some(p) = attributes(&e)?.remove("path") {
                    path = Some(p);
                }
            }
            Event::Text(t) if current == "path" => path = Some(t.unescape()?.into_owned()),
            Event::Empty(e) if e.name().as_ref() == b"hash" => {
                let attrs = attributes(&e)?;
                match &path {
                    Some(path) => check_hash(path, &attrs, contents, v),
                    None => v.problems.push("hash element without a content path".into()),
                }
            }
            Event::End(_) => current.clear(),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

fn check_hash(
    path: &str,
    attrs: &HashMap<String, String>,
    contents: &HashMap<String, Vec<u8>>,
    v: &mut Verification,
) {
    let (Some(algorithm), Some(encoding), Some(value)) =
        (attrs.get("algorithm"), attrs.get("encoding"), attrs.get("value"))
    else {
        v.problems.push(format!("{path}: incomplete hash element"));
        return;
    };
    let (function, encoding) = match (algorithm.parse::<HashFunction>(), encoding.parse::<Encoding>()) {
        (Ok(f), Ok(e)) => (f, e),
        (Err(e), _) | (_, Err(e)) => {
            v.problems.push(format!("{path}: {e}"));
            return;
        }
    };
    match contents.get(path) {
        Some(bytes) => {
            v.hashes_checked += 1;
            if hash_bytes(function, encoding, bytes).value != *value {
                v.problems.push(format!("{path}: {function} mismatch"));
            }
        }
        None => v.problems.push(format!("{path}: referenced by the PDI but not embedded")),
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn attributes(e: &BytesStart<'_>) -> anyhow::Result<HashMap<String, String>> {
    let mut attrs = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        attrs.insert(
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            attr.unescape_value()?.into_owned(),
        );
    }
    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use sip_pack::{Compression, EntryKind, SipWriter};

    use super::*;

    // SHA-256("abc")
    const ABC_SHA256_HEX: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    fn container(pdi: &str, descriptor: Option<String>) -> SipReader {
        let mut w = SipWriter::new(Vec::new(), Compression::None).unwrap();
        w.add_entry("a.txt", EntryKind::DigitalObject, b"abc").unwrap();
        w.add_entry(PDI_ENTRY, EntryKind::Pdi, pdi.as_bytes()).unwrap();
        if let Some(descriptor) = descriptor {
            w.add_entry(DESCRIPTOR_ENTRY, EntryKind::Descriptor, descriptor.as_bytes()).unwrap();
        }
        let (bytes, _) = w.finish().unwrap();
        SipReader::from_bytes(bytes).unwrap()
    }

    fn pdi_with_hash(value: &str) -> String {
        format!(
            r#"<files><file><path>a.txt</path><hashes><hash algorithm="sha-256" encoding="hex" value="{value}"/></hashes></file></files>"#
        )
    }

    fn descriptor_for(pdi: &str, page_count: usize) -> String {
        let hash = hash_bytes(HashFunction::Sha256, Encoding::Base64, pdi.as_bytes()).value;
        format!(
            r#"<sip><dss><id>dss-1</id></dss><page_count>{page_count}</page_count><pdi_hash algorithm="sha-256" encoding="base64">{hash}</pdi_hash></sip>"#
        )
    }

    #[test]
    fn consistent_container_passes() {
        let pdi = pdi_with_hash(ABC_SHA256_HEX);
        let v = verify(&container(&pdi, Some(descriptor_for(&pdi, 1))), "ok.sip".into());
        assert!(v.is_ok(), "{:?}", v.problems);
        assert_eq!(v.dss_id.as_deref(), Some("dss-1"));
        assert_eq!(v.digital_objects, 1);
        assert_eq!(v.hashes_checked, 1);
    }

    #[test]
    fn wrong_content_hash_is_reported() {
        let pdi = pdi_with_hash("00");
        let v = verify(&container(&pdi, Some(descriptor_for(&pdi, 1))), "bad.sip".into());
        assert_eq!(v.problems.len(), 1);
        assert!(v.problems[0].contains("a.txt"));
    }

    #[test]
    fn descriptor_problems_are_reported() {
        let pdi = pdi_with_hash(ABC_SHA256_HEX);
        let v = verify(&container(&pdi, Some(descriptor_for("<other/>", 2))), "x.sip".into());
        assert_eq!(v.problems.len(), 2);

        let v = verify(&container(&pdi, None), "x.sip".into());
        assert_eq!(v.problems, vec![format!("missing {DESCRIPTOR_ENTRY}")]);
    }

    #[test]
    fn attribute_paths_are_understood() {
        let pdi = format!(
            r#"<docs><doc><content path="a.txt"><hashes><hash algorithm="sha-256" encoding="hex" value="{ABC_SHA256_HEX}"/></hashes></content></doc></docs>"#
        );
        let v = verify(&container(&pdi, Some(descriptor_for(&pdi, 1))), "x.sip".into());
        assert!(v.is_ok(), "{:?}", v.problems);
        assert_eq!(v.hashes_checked, 1);
    }

    #[test]
    fn unreadable_file_is_a_problem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.sip");
        std::fs::write(&path, b"not a sip").unwrap();
        let v = verify_file(&path);
        assert!(!v.is_ok());
        assert!(v.problems[0].starts_with("container:"));
    }
}
