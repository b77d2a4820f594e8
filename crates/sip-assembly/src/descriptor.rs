use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use sip_types::{ContentHash, SessionPackaging, SipMetrics};

use crate::error::SipResult;

/// Namespace of the packaging descriptor.
pub const SIP_NAMESPACE: &str = "urn:x-emc:ia:schema:sip:1.0";

/// Render the `eas_sip.xml` descriptor of one sealed SIP.
///
/// Every SIP is its own data submission session, so `seqno` is always 1 and
/// `is_last` always true.
pub fn render(session: &SessionPackaging, metrics: &SipMetrics, pdi_hash: &ContentHash) -> SipResult<Vec<u8>> {
    let info = &session.info;
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("sip");
    root.push_attribute(("xmlns", SIP_NAMESPACE));
    w.write_event(Event::Start(root))?;

    w.write_event(Event::Start(BytesStart::new("dss")))?;
    text_element(&mut w, "holding", &info.holding)?;
    text_element(&mut w, "id", &session.dss_id)?;
    text_element(&mut w, "pdi_schema", &info.schema)?;
    text_element(&mut w, "pdi_schema_version", &info.pdi_schema_version)?;
    text_element(&mut w, "production_date", &timestamp(session.production_date))?;
    let retention = info.base_retention_date.unwrap_or(session.production_date);
    text_element(&mut w, "base_retention_date", &timestamp(retention))?;
    text_element(&mut w, "producer", &info.producer)?;
    text_element(&mut w, "entity", &info.entity)?;
    text_element(&mut w, "priority", &info.priority.to_string())?;
    text_element(&mut w, "application", &info.application)?;
    w.write_event(Event::End(BytesEnd::new("dss")))?;

    text_element(&mut w, "production_date", &timestamp(session.production_date))?;
    text_element(&mut w, "seqno", "1")?;
    text_element(&mut w, "is_last", "true")?;
    text_element(&mut w, "aiu_count", &metrics.num_aius().to_string())?;
    text_element(&mut w, "page_count", &metrics.num_digital_objects().to_string())?;

    let mut hash = BytesStart::new("pdi_hash");
    hash.push_attribute(("algorithm", pdi_hash.function.name()));
    hash.push_attribute(("encoding", pdi_hash.encoding.name()));
    w.write_event(Event::Start(hash))?;
    w.write_event(Event::Text(BytesText::new(&pdi_hash.value)))?;
    w.write_event(Event::End(BytesEnd::new("pdi_hash")))?;

    w.write_event(Event::End(BytesEnd::new("sip")))?;
    Ok(w.into_inner())
}

fn text_element(w: &mut Writer<Vec<u8>>, name: &str, text: &str) -> SipResult<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn timestamp(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}
