//! v3 resource documents
//!
//! Translates JSON/YAML resource documents into [`Resource`] values and back,
//! using the descriptor tables to give each spec field its type.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use kvmig_flat::{FieldType, FieldValue, Kind, ProtoPort};

use crate::error::DocumentError;
use crate::resource::{Resource, ResourceId};
use crate::schema::{FieldDescriptor, SchemaRegistry};

/// API version written to output documents
pub const API_VERSION: &str = "projectcalico.org/v3";

/// Document metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
}

/// A v3 resource document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDocument {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    pub kind: Kind,
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: Map<String, JsonValue>,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

/// Input document format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Guess from a file extension; anything but `.json` is YAML
    #[must_use]
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext {
            Some(e) if e.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<ResourceDocument>),
    One(Box<ResourceDocument>),
}

/// Parse all documents in `text`
///
/// JSON input is a single document or an array; YAML input may hold several
/// `---`-separated documents.
///
/// # Errors
/// Returns error on invalid syntax or document shape
pub fn parse_documents(text: &str, format: Format) -> Result<Vec<ResourceDocument>, DocumentError> {
    match format {
        Format::Json => Ok(match serde_json::from_str::<OneOrMany>(text)? {
            OneOrMany::Many(docs) => docs,
            OneOrMany::One(doc) => vec![*doc],
        }),
        Format::Yaml => {
            let mut docs = Vec::new();
            for de in serde_yaml::Deserializer::from_str(text) {
                let value = serde_yaml::Value::deserialize(de)?;
                if value.is_null() {
                    continue;
                }
                docs.push(serde_yaml::from_value(value)?);
            }
            Ok(docs)
        }
    }
}

/// Render documents as multi-document YAML
///
/// # Errors
/// Returns error if serialization fails
pub fn render_yaml(docs: &[ResourceDocument]) -> Result<String, DocumentError> {
    let mut out = String::new();
    for doc in docs {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(doc)?);
    }
    Ok(out)
}

impl SchemaRegistry {
    /// Typed resource from a document
    ///
    /// `null` spec values are treated as unset.
    ///
    /// # Errors
    /// - `UnregisteredKind` if no table exists for the document's kind
    /// - `UnknownField` for a spec field no descriptor names
    /// - `InvalidValue` for a value that does not fit the descriptor type
    pub fn resource_from_document(&self, doc: &ResourceDocument) -> Result<Resource, DocumentError> {
        let table = self
            .table(doc.kind)
            .ok_or(DocumentError::UnregisteredKind(doc.kind))?;
        let mut resource = Resource::new(doc.kind, doc.metadata.name.clone());

        for (field, json) in &doc.spec {
            let descriptor = table.by_name(field).ok_or_else(|| DocumentError::UnknownField {
                resource: resource.id(),
                field: field.clone(),
            })?;
            if json.is_null() {
                continue;
            }
            let value = value_from_json(descriptor, json).map_err(|reason| {
                DocumentError::InvalidValue {
                    resource: resource.id(),
                    field: descriptor.name,
                    expected: descriptor.field_type,
                    reason,
                }
            })?;
            resource.set(descriptor.name, value);
        }
        Ok(resource)
    }

    /// Document from a typed resource, spec fields in table order
    ///
    /// # Errors
    /// - `UnregisteredKind` if no table exists for the resource's kind
    /// - `UnknownField` for a set field no descriptor names
    pub fn document_from_resource(&self, resource: &Resource) -> Result<ResourceDocument, DocumentError> {
        let table = self
            .table(resource.kind())
            .ok_or(DocumentError::UnregisteredKind(resource.kind()))?;
        if let Some((field, _)) = resource.fields().find(|(f, _)| table.by_name(f).is_none()) {
            return Err(DocumentError::UnknownField {
                resource: resource.id(),
                field: field.to_string(),
            });
        }

        let mut spec = Map::new();
        for descriptor in table.iter() {
            if let Some(value) = resource.get(descriptor.name) {
                spec.insert(descriptor.name.to_string(), value_to_json(descriptor, value));
            }
        }
        Ok(ResourceDocument {
            api_version: default_api_version(),
            kind: resource.kind(),
            metadata: Metadata {
                name: resource.name().to_string(),
            },
            spec,
        })
    }
}

impl ResourceDocument {
    #[inline]
    #[must_use]
    pub fn id(&self) -> ResourceId {
        ResourceId::new(self.kind, self.metadata.name.clone())
    }
}

fn value_from_json(descriptor: &FieldDescriptor, json: &JsonValue) -> Result<FieldValue, String> {
    let mismatch = || format!("got {json}");
    match descriptor.field_type {
        FieldType::Int => json.as_i64().map(FieldValue::Int).ok_or_else(mismatch),
        FieldType::Uint => json
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(FieldValue::Uint)
            .ok_or_else(mismatch),
        FieldType::Bool => json.as_bool().map(FieldValue::Bool).ok_or_else(mismatch),
        FieldType::String => json
            .as_str()
            .map(|s| FieldValue::String(s.to_string()))
            .ok_or_else(mismatch),
        FieldType::StringList { delimiter } => match json {
            JsonValue::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(mismatch))
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::StringList),
            // v3 resources also carry these lists pre-joined
            JsonValue::String(joined) => Ok(FieldValue::StringList(
                joined
                    .split(delimiter)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            _ => Err(mismatch()),
        },
        FieldType::ProtoPortList => serde_json::from_value::<Vec<ProtoPort>>(json.clone())
            .map(FieldValue::ProtoPortList)
            .map_err(|e| e.to_string()),
        FieldType::Object => Err("object fields have no flat representation".to_string()),
    }
}

fn value_to_json(descriptor: &FieldDescriptor, value: &FieldValue) -> JsonValue {
    match value {
        FieldValue::Int(v) => JsonValue::from(*v),
        FieldValue::Uint(v) => JsonValue::from(*v),
        FieldValue::Bool(v) => JsonValue::from(*v),
        FieldValue::String(v) => JsonValue::from(v.as_str()),
        // v3 carries string lists as one joined string
        FieldValue::StringList(items) => match descriptor.field_type {
            FieldType::StringList { delimiter } => {
                JsonValue::from(items.join(&delimiter.to_string()))
            }
            _ => JsonValue::from(items.clone()),
        },
        FieldValue::ProtoPortList(ports) => JsonValue::Array(
            ports
                .iter()
                .map(|pp| serde_json::json!({ "protocol": pp.protocol.as_str(), "port": pp.port }))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const FELIX_YAML: &str = r#"
apiVersion: projectcalico.org/v3
kind: FelixConfiguration
metadata:
  name: node.mynode
spec:
  routeRefreshIntervalSecs: 12345
  interfacePrefix: califoobar
  ipipEnabled: false
  iptablesMarkMask: 1313
  failsafeInboundHostPorts: []
  failsafeOutboundHostPorts:
    - protocol: TCP
      port: 1234
    - protocol: UDP
      port: 22
---
kind: ClusterInformation
metadata:
  name: default
spec:
  clusterGUID: abcedfg
  clusterType: Mesos,K8s
  datastoreReady: true
"#;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::with_defaults().unwrap()
    }

    #[test]
    fn parse_multi_document_yaml() {
        let docs = parse_documents(FELIX_YAML, Format::Yaml).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].kind, Kind::FelixConfiguration);
        assert_eq!(docs[1].api_version, API_VERSION);

        let registry = registry();
        let felix = registry.resource_from_document(&docs[0]).unwrap();
        assert_eq!(felix.name(), "node.mynode");
        assert_eq!(felix.get("routeRefreshIntervalSecs"), Some(&FieldValue::Int(12345)));
        assert_eq!(felix.get("iptablesMarkMask"), Some(&FieldValue::Uint(1313)));
        assert_eq!(
            felix.get("failsafeInboundHostPorts"),
            Some(&FieldValue::ProtoPortList(vec![]))
        );
        assert_eq!(
            felix.get("failsafeOutboundHostPorts"),
            Some(&FieldValue::ProtoPortList(vec![
                ProtoPort::tcp(1234),
                ProtoPort::udp(22)
            ]))
        );

        let cluster = registry.resource_from_document(&docs[1]).unwrap();
        assert_eq!(
            cluster.get("clusterType"),
            Some(&FieldValue::StringList(vec!["Mesos".into(), "K8s".into()]))
        );
    }

    #[test]
    fn parse_json_one_or_many() {
        let one = r#"{"kind":"ClusterInformation","metadata":{"name":"default"}}"#;
        assert_eq!(parse_documents(one, Format::Json).unwrap().len(), 1);
        let many = format!("[{one},{one}]");
        assert_eq!(parse_documents(&many, Format::Json).unwrap().len(), 2);
        assert!(parse_documents("{", Format::Json).is_err());
    }

    #[test]
    fn document_round_trip() {
        let registry = registry();
        let res = Resource::new(Kind::FelixConfiguration, "default")
            .with_field("ipipEnabled", true)
            .with_field("iptablesMarkMask", 0xff00_0000_u32)
            .with_field("failsafeInboundHostPorts", vec![ProtoPort::tcp(22)]);
        let doc = registry.document_from_resource(&res).unwrap();
        assert_eq!(
            JsonValue::Object(doc.spec.clone()),
            json!({
                "ipipEnabled": true,
                "iptablesMarkMask": 4_278_190_080_u32,
                "failsafeInboundHostPorts": [{"protocol": "TCP", "port": 22}],
            })
        );
        assert_eq!(registry.resource_from_document(&doc).unwrap(), res);

        let yaml = render_yaml(&[doc]).unwrap();
        let back = parse_documents(&yaml, Format::Yaml).unwrap();
        assert_eq!(registry.resource_from_document(&back[0]).unwrap(), res);
    }

    #[test]
    fn null_is_unset_and_unknown_is_rejected() {
        let registry = registry();
        let mut doc: ResourceDocument = serde_json::from_value(json!({
            "kind": "FelixConfiguration",
            "metadata": {"name": "default"},
            "spec": {"logFilePath": null}
        }))
        .unwrap();
        assert!(registry.resource_from_document(&doc).unwrap().is_empty());

        doc.spec.insert("noSuchField".into(), json!(1));
        assert!(matches!(
            registry.resource_from_document(&doc),
            Err(DocumentError::UnknownField { .. })
        ));
    }

    #[test]
    fn type_errors_name_the_field() {
        let registry = registry();
        let doc: ResourceDocument = serde_json::from_value(json!({
            "kind": "FelixConfiguration",
            "metadata": {"name": "default"},
            "spec": {"iptablesMarkMask": -1}
        }))
        .unwrap();
        match registry.resource_from_document(&doc) {
            Err(DocumentError::InvalidValue { field, expected, .. }) => {
                assert_eq!(field, "iptablesMarkMask");
                assert_eq!(expected, FieldType::Uint);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn string_lists_render_joined() {
        let registry = registry();
        let res = Resource::new(Kind::ClusterInformation, "default")
            .with_field("clusterGUID", "abcedfg")
            .with_field(
                "clusterType",
                FieldValue::StringList(vec!["Mesos".into(), "K8s".into()]),
            );
        let doc = registry.document_from_resource(&res).unwrap();
        assert_eq!(doc.spec["clusterType"], json!("Mesos,K8s"));

        let yaml = render_yaml(&[doc]).unwrap();
        assert!(yaml.contains("clusterType: Mesos,K8s"), "{yaml}");
        let back = parse_documents(&yaml, Format::Yaml).unwrap();
        assert_eq!(registry.resource_from_document(&back[0]).unwrap(), res);
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_extension(Some("JSON")), Format::Json);
        assert_eq!(Format::from_extension(Some("yml")), Format::Yaml);
        assert_eq!(Format::from_extension(None), Format::Yaml);
    }
}
