use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Property key for the archive application name.
pub const APPLICATION_NAME: &str = "ia.application.name";
/// Property key for the holding name.
pub const HOLDING_NAME: &str = "ia.holding.name";
/// Property key for the producer name.
pub const PRODUCER_NAME: &str = "ia.producer.name";
/// Property key for the entity type name.
pub const ENTITY_NAME: &str = "ia.entity.name";
/// Property key for the PDI schema (namespace URI).
pub const PDI_SCHEMA_NAME: &str = "ia.pdi.schema.name";
/// Property key for the DSS id prefix.
pub const DSS_PREFIX: &str = "ia.dss.prefix";

/// Template describing where and how a SIP is archived.
///
/// A single prototype is supplied per assembly run and specialized into a
/// [`SessionPackaging`] for every physical SIP, each with its own DSS id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingInformation {
    pub application: String,
    pub holding: String,
    pub producer: String,
    pub entity: String,
    /// Namespace URI of the PDI document.
    pub schema: String,
    /// Prefix shared by every DSS id generated from this template.
    pub dss_prefix: String,
    #[serde(default = "default_schema_version")]
    pub pdi_schema_version: String,
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub base_retention_date: Option<DateTime<Utc>>,
}

fn default_schema_version() -> String {
    "1.0".into()
}

impl PackagingInformation {
    /// Start building a packaging template.
    pub fn builder() -> PackagingInformationBuilder {
        PackagingInformationBuilder::default()
    }

    /// Read the template from a flat property map.
    ///
    /// Every key must be present. All but [`DSS_PREFIX`] must also be
    /// non-blank; an explicitly empty prefix yields unprefixed DSS ids.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self, TypeError> {
        let required = |key: &'static str| -> Result<String, TypeError> {
            properties
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
                .ok_or(TypeError::MissingField(key))
        };
        let info = Self {
            application: required(APPLICATION_NAME)?,
            holding: required(HOLDING_NAME)?,
            producer: required(PRODUCER_NAME)?,
            entity: required(ENTITY_NAME)?,
            schema: required(PDI_SCHEMA_NAME)?,
            dss_prefix: properties
                .get(DSS_PREFIX)
                .cloned()
                .ok_or(TypeError::MissingField(DSS_PREFIX))?,
            pdi_schema_version: default_schema_version(),
            priority: 0,
            base_retention_date: None,
        };
        info.validate()?;
        Ok(info)
    }

    /// Check that every required field is present.
    pub fn validate(&self) -> Result<(), TypeError> {
        let fields = [
            ("application", &self.application),
            ("holding", &self.holding),
            ("producer", &self.producer),
            ("entity", &self.entity),
            ("schema", &self.schema),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(TypeError::MissingField(name));
            }
        }
        if !is_xml_name(&self.entity) {
            return Err(TypeError::InvalidValue {
                field: "entity",
                reason: format!("{:?} is not a valid XML element name", self.entity),
            });
        }
        Ok(())
    }

    /// Specialize the template for one physical SIP.
    pub fn for_session(&self, dss_id: impl Into<String>, production_date: DateTime<Utc>) -> SessionPackaging {
        SessionPackaging {
            info: self.clone(),
            dss_id: dss_id.into(),
            production_date,
        }
    }
}

/// Whether `name` is a namespace-free XML element name (an `NCName`).
pub fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_name_start(first) => chars.all(is_name_char),
        _ => false,
    }
}

fn is_name_start(c: char) -> bool {
    matches!(c,
        'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start(c)
        || matches!(c, '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

/// Packaging information bound to a single data submission session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPackaging {
    pub info: PackagingInformation,
    pub dss_id: String,
    pub production_date: DateTime<Utc>,
}

/// Builder for [`PackagingInformation`].
#[derive(Clone, Debug, Default)]
pub struct PackagingInformationBuilder {
    application: Option<String>,
    holding: Option<String>,
    producer: Option<String>,
    entity: Option<String>,
    schema: Option<String>,
    dss_prefix: Option<String>,
    pdi_schema_version: Option<String>,
    priority: u32,
    base_retention_date: Option<DateTime<Utc>>,
}

impl PackagingInformationBuilder {
    pub fn application(mut self, name: impl Into<String>) -> Self {
        self.application = Some(name.into());
        self
    }

    pub fn holding(mut self, name: impl Into<String>) -> Self {
        self.holding = Some(name.into());
        self
    }

    pub fn producer(mut self, name: impl Into<String>) -> Self {
        self.producer = Some(name.into());
        self
    }

    pub fn entity(mut self, name: impl Into<String>) -> Self {
        self.entity = Some(name.into());
        self
    }

    pub fn schema(mut self, uri: impl Into<String>) -> Self {
        self.schema = Some(uri.into());
        self
    }

    pub fn dss_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.dss_prefix = Some(prefix.into());
        self
    }

    pub fn pdi_schema_version(mut self, version: impl Into<String>) -> Self {
        self.pdi_schema_version = Some(version.into());
        self
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn base_retention_date(mut self, date: DateTime<Utc>) -> Self {
        self.base_retention_date = Some(date);
        self
    }

    /// Build and validate the template.
    pub fn build(self) -> Result<PackagingInformation, TypeError> {
        let info = PackagingInformation {
            application: self.application.ok_or(TypeError::MissingField("application"))?,
            holding: self.holding.ok_or(TypeError::MissingField("holding"))?,
            producer: self.producer.ok_or(TypeError::MissingField("producer"))?,
            entity: self.entity.ok_or(TypeError::MissingField("entity"))?,
            schema: self.schema.ok_or(TypeError::MissingField("schema"))?,
            dss_prefix: self.dss_prefix.unwrap_or_default(),
            pdi_schema_version: self.pdi_schema_version.unwrap_or_else(default_schema_version),
            priority: self.priority,
            base_retention_date: self.base_retention_date,
        };
        info.validate()?;
        Ok(info)
    }
}
