//! Testing utilities for the kvmig workspace
//!
//! Shared fixtures and proptest strategies.

#![allow(missing_docs)]

use kvmig_core::{builtin_table, Converter, ConverterConfig, Resource};
use kvmig_flat::{FieldType, FieldValue, FlatEntry, Kind, ProtoPort, Protocol, Scope};
use proptest::collection;
use proptest::prelude::*;

pub const NODE: &str = "mynode";

pub fn converter() -> Converter {
    Converter::with_defaults(ConverterConfig::new()).unwrap()
}

pub fn parallel_converter() -> Converter {
    Converter::with_defaults(ConverterConfig::new().with_parallel(true)).unwrap()
}

pub fn entry(key: &str, value: &str) -> FlatEntry {
    FlatEntry::new(key.parse().unwrap(), value)
}

/// Per-node FelixConfiguration for [`NODE`]
pub fn felix_node_resource() -> Resource {
    Resource::new(Kind::FelixConfiguration, format!("node.{NODE}"))
        .with_field("routeRefreshIntervalSecs", 12345_i64)
        .with_field("interfacePrefix", "califoobar")
        .with_field("ipipEnabled", false)
        .with_field("iptablesMarkMask", 1313_u32)
        .with_field("failsafeInboundHostPorts", Vec::<ProtoPort>::new())
        .with_field(
            "failsafeOutboundHostPorts",
            vec![
                ProtoPort::tcp(1234),
                ProtoPort::udp(22),
                ProtoPort::tcp(65535),
            ],
        )
}

/// Same field values as [`felix_node_resource`], global scope
pub fn felix_global_resource() -> Resource {
    felix_node_resource().renamed("default")
}

pub fn cluster_information_resource() -> Resource {
    Resource::new(Kind::ClusterInformation, "default")
        .with_field("clusterGUID", "abcedfg")
        .with_field(
            "clusterType",
            FieldValue::StringList(vec!["Mesos".to_string(), "K8s".to_string()]),
        )
        .with_field("datastoreReady", true)
}

pub fn arb_proto_port() -> impl Strategy<Value = ProtoPort> {
    (
        prop_oneof![Just(Protocol::Tcp), Just(Protocol::Udp), Just(Protocol::Sctp)],
        any::<u16>(),
    )
        .prop_map(|(protocol, port)| ProtoPort::new(protocol, port))
}

/// Printable strings with no surrounding whitespace
pub fn arb_token() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_./-]{1,12}"
}

/// Any value of `field_type`, `None` for types with no flat form
pub fn arb_field_value(field_type: FieldType) -> Option<BoxedStrategy<FieldValue>> {
    let strategy = match field_type {
        FieldType::Int => any::<i64>().prop_map(FieldValue::Int).boxed(),
        FieldType::Uint => any::<u32>().prop_map(FieldValue::Uint).boxed(),
        FieldType::Bool => any::<bool>().prop_map(FieldValue::Bool).boxed(),
        FieldType::String => prop_oneof![Just(String::new()), arb_token()]
            .prop_map(FieldValue::String)
            .boxed(),
        FieldType::StringList { .. } => collection::vec(arb_token(), 0..4)
            .prop_map(FieldValue::StringList)
            .boxed(),
        FieldType::ProtoPortList => collection::vec(arb_proto_port(), 0..5)
            .prop_map(FieldValue::ProtoPortList)
            .boxed(),
        FieldType::Object => return None,
    };
    Some(strategy)
}

/// Resource of `kind` setting any subset of the fields stored in its scope
///
/// The subset may be empty.
pub fn arb_resource(kind: Kind, name: &'static str) -> impl Strategy<Value = Resource> {
    let scope = Scope::from_resource_name(name).unwrap();
    let fields: Vec<_> = builtin_table(kind)
        .iter()
        .filter(|d| d.scope.applies_to(&scope))
        .filter_map(|d| {
            let name = d.name;
            arb_field_value(d.field_type)
                .map(|values| proptest::option::of(values).prop_map(move |v| (name, v)))
        })
        .collect();

    fields.prop_map(move |values| {
        let mut res = Resource::new(kind, name);
        for (field, value) in values {
            if let Some(value) = value {
                res.set(field, value);
            }
        }
        res
    })
}

pub fn arb_felix_resource(name: &'static str) -> impl Strategy<Value = Resource> {
    arb_resource(Kind::FelixConfiguration, name)
}

pub fn arb_cluster_information_resource() -> impl Strategy<Value = Resource> {
    arb_resource(Kind::ClusterInformation, "default")
}
