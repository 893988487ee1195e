//! Deserialization: from an expanded-form JSON-LD document to a host object
//! graph.
//!
//! The input is an array of node objects in expanded form. Every node object
//! is processed in document order; the instance built from the first one is
//! the call's result, so forward references between top-level nodes resolve
//! as later nodes are materialized. Nested node objects are processed by
//! recursion, driving the [`InstanceBuilder`] stack machine.
//!
//! Value nodes come in exactly four shapes: a value object
//! (`{"@value": ..}`), an identifier reference (`{"@id": ..}` alone), an
//! ordered list (`{"@list": [..]}`), and a nested node object. Anything else
//! is malformed input and fails the call.

use log::debug;
use serde_json::{Map, Value as Json};

use crate::error::Error;
use crate::instance_builder::InstanceBuilder;
use crate::keywords;
use crate::literals::{DefaultCodec, LiteralCodec};
use crate::mapping::{Attribute, AttributeKind, Entity, MappingRegistry, TypeDescriptor, Value};
use crate::options::{Options, UnknownPropertyPolicy};

/// Deserialize a document from text with default options.
pub fn from_str(input: &str, registry: &MappingRegistry, expected: &str) -> Result<Entity, Error> {
    from_str_with_options(input, registry, expected, Options::default())
}

/// Deserialize a document from text.
pub fn from_str_with_options(
    input: &str,
    registry: &MappingRegistry,
    expected: &str,
    options: Options,
) -> Result<Entity, Error> {
    from_value_with_options(serde_json::from_str(input)?, registry, expected, options)
}

/// Deserialize a document from bytes with default options.
pub fn from_slice(
    input: &[u8],
    registry: &MappingRegistry,
    expected: &str,
) -> Result<Entity, Error> {
    from_slice_with_options(input, registry, expected, Options::default())
}

/// Deserialize a document from bytes.
pub fn from_slice_with_options(
    input: &[u8],
    registry: &MappingRegistry,
    expected: &str,
    options: Options,
) -> Result<Entity, Error> {
    from_value_with_options(serde_json::from_slice(input)?, registry, expected, options)
}

/// Deserialize an already-parsed document with default options.
pub fn from_value(
    value: Json,
    registry: &MappingRegistry,
    expected: &str,
) -> Result<Entity, Error> {
    from_value_with_options(value, registry, expected, Options::default())
}

/// Deserialize an already-parsed document into an instance of the type
/// registered under `expected` (or one of its subtypes).
pub fn from_value_with_options(
    value: Json,
    registry: &MappingRegistry,
    expected: &str,
    options: Options,
) -> Result<Entity, Error> {
    let expected = registry.require(expected)?;
    let cfg = Cfg::from_options(&options);

    let Json::Array(nodes) = value else {
        return Err(Error::malformed(
            "an expanded document must be an array of node objects",
        ));
    };
    let nodes = flatten_graphs(nodes)?;
    if nodes.is_empty() {
        return Err(Error::malformed(
            "an expanded document must contain at least one node object",
        ));
    }

    if expected.is_identifier_only() {
        return identifier_only_instance(registry, expected, &nodes[0]);
    }

    let mut processor = Processor {
        registry,
        builder: InstanceBuilder::new(registry),
        codec: DefaultCodec::default(),
        cfg,
    };
    let mut root = None;
    for node in &nodes {
        let map = node_object(node)?;
        let hint = match root {
            // The first node object is the result and must satisfy the
            // caller's declared type.
            None => Some(expected),
            Some(_) => processor.top_level_hint(map),
        };
        let instance = processor.process_node_object(map, hint)?;
        root.get_or_insert(instance);
    }
    processor.builder.finish(cfg.assume_target_type)?;
    debug!("deserialized {} top-level node object(s)", nodes.len());
    root.ok_or_else(|| Error::msg("no node object produced a result"))
}

/// Immutable runtime configuration snapshot for one call.
#[derive(Clone, Copy)]
struct Cfg {
    ignore_unknown: bool,
    assume_target_type: bool,
}

impl Cfg {
    fn from_options(options: &Options) -> Self {
        Cfg {
            ignore_unknown: matches!(options.unknown_properties, UnknownPropertyPolicy::Ignore),
            assume_target_type: options.assume_target_type,
        }
    }
}

// Top-level node objects may arrive wrapped in `{"@graph": [...]}`; splice
// their contents in place.
fn flatten_graphs(nodes: Vec<Json>) -> Result<Vec<Json>, Error> {
    let mut flat = Vec::with_capacity(nodes.len());
    for node in nodes {
        let mut map = match node {
            Json::Object(map) => map,
            other => {
                flat.push(other);
                continue;
            }
        };
        if !map.contains_key(keywords::GRAPH) {
            flat.push(Json::Object(map));
            continue;
        }
        if map.keys().any(|key| key != keywords::GRAPH && key != keywords::ID) {
            return Err(Error::malformed(
                "a graph object may only carry @graph and @id",
            ));
        }
        match map.remove(keywords::GRAPH) {
            Some(Json::Array(inner)) => flat.extend(inner),
            _ => return Err(Error::malformed("@graph must map to an array")),
        }
    }
    Ok(flat)
}

fn node_object(node: &Json) -> Result<&Map<String, Json>, Error> {
    node.as_object()
        .ok_or_else(|| Error::malformed("a node object must be a JSON object"))
}

fn identifier_only_instance(
    registry: &MappingRegistry,
    expected: &TypeDescriptor,
    node: &Json,
) -> Result<Entity, Error> {
    let map = node_object(node)?;
    let id = read_id(map)?
        .ok_or_else(|| Error::malformed("the node object carries no @id to deserialize"))?;
    let identifier = registry.identifier_attribute(expected).ok_or_else(|| {
        Error::msg(format!(
            "identifier-only type '{}' has no identifier attribute",
            expected.name()
        ))
    })?;
    let instance = expected.new_instance()?;
    instance.set(identifier.slot(), Value::String(id.to_string()))?;
    Ok(instance)
}

fn read_id(map: &Map<String, Json>) -> Result<Option<&str>, Error> {
    match map.get(keywords::ID) {
        None => Ok(None),
        Some(Json::String(id)) => Ok(Some(id)),
        Some(_) => Err(Error::malformed("@id must be a string")),
    }
}

fn read_types(map: &Map<String, Json>) -> Result<Vec<String>, Error> {
    let Some(value) = map.get(keywords::TYPE) else {
        return Ok(Vec::new());
    };
    let Json::Array(entries) = value else {
        return Err(Error::malformed("@type must be an array of IRI strings"));
    };
    entries
        .iter()
        .map(|entry| match entry {
            Json::String(iri) => Ok(iri.clone()),
            _ => Err(Error::malformed("@type must be an array of IRI strings")),
        })
        .collect()
}

/// The closed set of value-node shapes.
enum ValueNode<'a> {
    Literal {
        raw: &'a Json,
        datatype: Option<&'a str>,
        language: Option<&'a str>,
    },
    Reference(&'a str),
    ListValue(&'a [Json]),
    Node(&'a Map<String, Json>),
}

fn classify(value: &Json) -> Result<ValueNode<'_>, Error> {
    let map = value
        .as_object()
        .ok_or_else(|| Error::malformed(format!("unrecognized value node shape: {value}")))?;
    if let Some(raw) = map.get(keywords::VALUE) {
        for key in map.keys() {
            if key != keywords::VALUE && key != keywords::TYPE && key != keywords::LANGUAGE {
                return Err(Error::malformed(format!(
                    "unexpected key '{key}' in a value object"
                )));
            }
        }
        let datatype = match map.get(keywords::TYPE) {
            None => None,
            Some(Json::String(iri)) => Some(iri.as_str()),
            Some(_) => return Err(Error::malformed("@type of a value object must be a string")),
        };
        let language = match map.get(keywords::LANGUAGE) {
            None => None,
            Some(Json::String(tag)) => Some(tag.as_str()),
            Some(_) => return Err(Error::malformed("@language must be a string")),
        };
        return Ok(ValueNode::Literal {
            raw,
            datatype,
            language,
        });
    }
    if let Some(list) = map.get(keywords::LIST) {
        if map.len() != 1 {
            return Err(Error::malformed("a list object may only carry @list"));
        }
        let Json::Array(items) = list else {
            return Err(Error::malformed("@list must map to an array"));
        };
        return Ok(ValueNode::ListValue(items));
    }
    if map.len() == 1 {
        if let Some(id) = map.get(keywords::ID) {
            let id = id
                .as_str()
                .ok_or_else(|| Error::malformed("@id must be a string"))?;
            return Ok(ValueNode::Reference(id));
        }
    }
    Ok(ValueNode::Node(map))
}

struct Processor<'r> {
    registry: &'r MappingRegistry,
    builder: InstanceBuilder<'r>,
    codec: DefaultCodec,
    cfg: Cfg,
}

impl<'r> Processor<'r> {
    /// Expected type for a non-root top-level node: whatever assumed type an
    /// earlier pending reference recorded for its id, if any.
    fn top_level_hint(&self, map: &Map<String, Json>) -> Option<&'r TypeDescriptor> {
        let id = read_id(map).ok().flatten()?;
        let assumed = self.builder.assumed_type_for(id)?;
        self.registry.descriptor(&assumed)
    }

    fn process_node_object(
        &mut self,
        map: &Map<String, Json>,
        expected: Option<&'r TypeDescriptor>,
    ) -> Result<Entity, Error> {
        let id = read_id(map)?.map(str::to_string);
        let type_iris = read_types(map)?;
        self.builder
            .open_object(id.as_deref(), &type_iris, expected)?;
        let descriptor = self.builder.current_descriptor()?;

        for (key, value) in map {
            if key == keywords::ID || key == keywords::TYPE {
                continue;
            }
            if keywords::is_keyword(key) {
                return Err(Error::malformed(format!(
                    "unexpected keyword '{key}' on a node object"
                )));
            }
            let Json::Array(values) = value else {
                return Err(Error::malformed(format!(
                    "values of property '{key}' must form an array"
                )));
            };
            match self.registry.attribute_for_edge(descriptor, key) {
                Some(attribute) if attribute.cardinality().is_collection() => {
                    self.builder.open_collection(attribute)?;
                    for item in values {
                        self.process_item(attribute, item)?;
                    }
                    self.builder.close_collection()?;
                }
                Some(attribute) => {
                    if values.len() != 1 {
                        return Err(Error::malformed(format!(
                            "single-valued property '{key}' carries {} values",
                            values.len()
                        )));
                    }
                    self.process_item(attribute, &values[0])?;
                }
                None => self.process_unmapped(descriptor, key, values)?,
            }
        }
        self.builder.close_object()
    }

    /// One value node of an attribute, singular or inside an open
    /// collection. A `@list` wrapper collapses into the same enclosing
    /// collection without an extra nesting level.
    fn process_item(&mut self, attribute: &Attribute, value: &Json) -> Result<(), Error> {
        match classify(value)? {
            ValueNode::Literal {
                raw,
                datatype,
                language,
            } => {
                let decoded = self.codec.decode(raw, datatype, language)?;
                self.builder.add_value(attribute.slot(), decoded)
            }
            ValueNode::Reference(id) => {
                if attribute.kind() == AttributeKind::Data {
                    // An identifier in a literal slot is just an IRI value.
                    return self
                        .builder
                        .add_value(attribute.slot(), Value::String(id.to_string()));
                }
                self.builder
                    .add_node_reference(id, attribute.slot(), attribute.target_type())
            }
            ValueNode::ListValue(items) => {
                if !attribute.cardinality().is_collection() {
                    return Err(Error::malformed(format!(
                        "list value for single-valued property '{}'",
                        attribute.edge()
                    )));
                }
                for item in items {
                    self.process_item(attribute, item)?;
                }
                Ok(())
            }
            ValueNode::Node(nested) => {
                let expected = match attribute.target_type() {
                    Some(name) => Some(self.registry.require(name)?),
                    None => None,
                };
                let entity = self.process_node_object(nested, expected)?;
                self.builder
                    .add_value(attribute.slot(), Value::Entity(entity))
            }
        }
    }

    fn process_unmapped(
        &mut self,
        descriptor: &'r TypeDescriptor,
        edge: &str,
        values: &[Json],
    ) -> Result<(), Error> {
        if self.registry.bag_attribute(descriptor).is_some() {
            let mut decoded = Vec::with_capacity(values.len());
            for value in values {
                decoded.push(self.bag_value(value)?);
            }
            let entry = match decoded.pop() {
                Some(single) if decoded.is_empty() => single,
                Some(last) => {
                    decoded.push(last);
                    Value::Collection(decoded)
                }
                None => Value::Collection(decoded),
            };
            return self.builder.add_bag_entry(edge, entry);
        }
        if self.cfg.ignore_unknown {
            debug!("ignoring unknown property '{edge}'");
            return Ok(());
        }
        Err(Error::UnknownProperty {
            edge: edge.to_string(),
            type_name: descriptor.name().to_string(),
        })
    }

    // Bag entries are kept as plain values: literals decode, references
    // degrade to their IRI, nested node objects materialize unconstrained.
    fn bag_value(&mut self, value: &Json) -> Result<Value, Error> {
        match classify(value)? {
            ValueNode::Literal {
                raw,
                datatype,
                language,
            } => self.codec.decode(raw, datatype, language),
            ValueNode::Reference(id) => Ok(Value::String(id.to_string())),
            ValueNode::ListValue(items) => {
                let mut decoded = Vec::with_capacity(items.len());
                for item in items {
                    decoded.push(self.bag_value(item)?);
                }
                Ok(Value::Collection(decoded))
            }
            ValueNode::Node(nested) => {
                let entity = self.process_node_object(nested, None)?;
                Ok(Value::Entity(entity))
            }
        }
    }
}
