//! Document tree model: the intermediate representation a serialization call
//! builds before handing it to the JSON writer.
//!
//! Nodes are purely structural. They know how to render themselves into a
//! `serde_json::Value` by dispatching on their own variant, and nothing else:
//! no IO, no mapping logic, no validation beyond shape. A tree is built by
//! exactly one serialization call, is immutable once that call finishes, and
//! is owned exclusively by it.

use serde_json::{Map, Value as Json};

use crate::keywords;

/// Scalar payload of a literal node.
#[derive(Clone, Debug, PartialEq)]
pub enum LiteralValue {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
}

impl LiteralValue {
    fn write(&self) -> Json {
        match self {
            LiteralValue::Boolean(b) => Json::Bool(*b),
            LiteralValue::Integer(i) => Json::from(*i),
            LiteralValue::Double(d) => {
                // JSON has no NaN/Inf; those degrade to null like serde_json
                // itself does.
                serde_json::Number::from_f64(*d).map_or(Json::Null, Json::Number)
            }
            LiteralValue::String(s) => Json::String(s.clone()),
        }
    }
}

/// One node of the document tree.
///
/// Every node except the synthetic root may carry a `name`, the edge or term
/// under which it hangs in its parent object. A node without a name is a pure
/// value (a collection item, or the root itself).
#[derive(Clone, Debug, PartialEq)]
pub struct JsonNode {
    name: Option<String>,
    kind: NodeKind,
}

/// The closed set of node variants the document format fixes.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// A literal, optionally tagged with a datatype IRI or a language tag.
    /// With either tag present the literal renders as a value object
    /// (`{"@value": ..}`), otherwise as a bare scalar.
    Literal {
        value: LiteralValue,
        datatype: Option<String>,
        language: Option<String>,
    },
    /// An object node with ordered, named children.
    Object(Vec<JsonNode>),
    /// An ordered list. Renders as the explicit `{"@list": [..]}` wrapper so
    /// item order survives the wire format.
    List(Vec<JsonNode>),
    /// An unordered set. Renders as a plain array; items keep insertion order
    /// so repeated writes are syntactically stable, but consumers must not
    /// read meaning into it.
    Set(Vec<JsonNode>),
    /// Explicit null.
    Null,
    /// A reference to a node defined elsewhere, `{"@id": ..}` on the wire.
    IdReference(String),
}

impl JsonNode {
    pub fn literal(name: Option<String>, value: LiteralValue) -> Self {
        JsonNode {
            name,
            kind: NodeKind::Literal {
                value,
                datatype: None,
                language: None,
            },
        }
    }

    pub fn typed_literal(name: Option<String>, value: LiteralValue, datatype: String) -> Self {
        JsonNode {
            name,
            kind: NodeKind::Literal {
                value,
                datatype: Some(datatype),
                language: None,
            },
        }
    }

    pub fn language_literal(name: Option<String>, value: String, language: String) -> Self {
        JsonNode {
            name,
            kind: NodeKind::Literal {
                value: LiteralValue::String(value),
                datatype: None,
                language: Some(language),
            },
        }
    }

    pub fn string_literal(name: Option<String>, value: impl Into<String>) -> Self {
        Self::literal(name, LiteralValue::String(value.into()))
    }

    pub fn object(name: Option<String>, children: Vec<JsonNode>) -> Self {
        JsonNode {
            name,
            kind: NodeKind::Object(children),
        }
    }

    pub fn list(name: Option<String>, items: Vec<JsonNode>) -> Self {
        JsonNode {
            name,
            kind: NodeKind::List(items),
        }
    }

    pub fn set(name: Option<String>, items: Vec<JsonNode>) -> Self {
        JsonNode {
            name,
            kind: NodeKind::Set(items),
        }
    }

    pub fn null(name: Option<String>) -> Self {
        JsonNode {
            name,
            kind: NodeKind::Null,
        }
    }

    pub fn id_reference(name: Option<String>, id: impl Into<String>) -> Self {
        JsonNode {
            name,
            kind: NodeKind::IdReference(id.into()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The same node reattached under a different name.
    pub fn into_named(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Attach a child to an object node or an item to a collection node.
    ///
    /// Attaching to a literal, null, or reference node is a caller bug; the
    /// child is dropped rather than corrupting the tree.
    pub fn push(&mut self, child: JsonNode) {
        match &mut self.kind {
            NodeKind::Object(children) | NodeKind::List(children) | NodeKind::Set(children) => {
                children.push(child);
            }
            _ => debug_assert!(false, "push on a non-container node"),
        }
    }

    /// Children of an object node, items of a collection node.
    pub fn children(&self) -> &[JsonNode] {
        match &self.kind {
            NodeKind::Object(children) | NodeKind::List(children) | NodeKind::Set(children) => {
                children
            }
            _ => &[],
        }
    }

    /// Render this node into a JSON value the external writer can emit.
    ///
    /// Dispatch is purely on variant; object children keep insertion order
    /// and list items keep their sequence.
    pub fn write(&self) -> Json {
        match &self.kind {
            NodeKind::Literal {
                value,
                datatype,
                language,
            } => {
                if datatype.is_none() && language.is_none() {
                    return value.write();
                }
                let mut map = Map::new();
                map.insert(keywords::VALUE.to_string(), value.write());
                if let Some(dt) = datatype {
                    map.insert(keywords::TYPE.to_string(), Json::String(dt.clone()));
                }
                if let Some(lang) = language {
                    map.insert(keywords::LANGUAGE.to_string(), Json::String(lang.clone()));
                }
                Json::Object(map)
            }
            NodeKind::Object(children) => {
                let mut map = Map::new();
                for child in children {
                    if let Some(name) = child.name() {
                        map.insert(name.to_string(), child.write());
                    }
                }
                Json::Object(map)
            }
            NodeKind::List(items) => {
                let rendered: Vec<Json> = items.iter().map(JsonNode::write).collect();
                let mut map = Map::new();
                map.insert(keywords::LIST.to_string(), Json::Array(rendered));
                Json::Object(map)
            }
            NodeKind::Set(items) => Json::Array(items.iter().map(JsonNode::write).collect()),
            NodeKind::Null => Json::Null,
            NodeKind::IdReference(id) => {
                let mut map = Map::new();
                map.insert(keywords::ID.to_string(), Json::String(id.clone()));
                Json::Object(map)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_literal_writes_as_scalar() {
        let node = JsonNode::literal(None, LiteralValue::Integer(42));
        assert_eq!(node.write(), json!(42));
    }

    #[test]
    fn typed_literal_writes_as_value_object() {
        let node = JsonNode::typed_literal(
            None,
            LiteralValue::String("2007-04-05".into()),
            "http://www.w3.org/2001/XMLSchema#date".into(),
        );
        assert_eq!(
            node.write(),
            json!({"@value": "2007-04-05", "@type": "http://www.w3.org/2001/XMLSchema#date"})
        );
    }

    #[test]
    fn language_literal_writes_language_tag() {
        let node = JsonNode::language_literal(None, "budova".into(), "cs".into());
        assert_eq!(node.write(), json!({"@value": "budova", "@language": "cs"}));
    }

    #[test]
    fn object_children_keep_insertion_order() {
        let mut obj = JsonNode::object(None, vec![]);
        obj.push(JsonNode::string_literal(Some("@id".into()), "urn:a"));
        obj.push(JsonNode::literal(Some("b".into()), LiteralValue::Boolean(true)));
        obj.push(JsonNode::literal(Some("a".into()), LiteralValue::Integer(1)));
        let written = serde_json::to_string(&obj.write()).unwrap();
        assert_eq!(written, r#"{"@id":"urn:a","b":true,"a":1}"#);
    }

    #[test]
    fn list_preserves_order_under_wrapper() {
        let items = vec![
            JsonNode::literal(None, LiteralValue::Integer(3)),
            JsonNode::literal(None, LiteralValue::Integer(1)),
            JsonNode::literal(None, LiteralValue::Integer(2)),
        ];
        let node = JsonNode::list(None, items);
        assert_eq!(node.write(), json!({"@list": [3, 1, 2]}));
    }

    #[test]
    fn set_writes_as_plain_array() {
        let node = JsonNode::set(
            None,
            vec![
                JsonNode::string_literal(None, "x"),
                JsonNode::string_literal(None, "y"),
            ],
        );
        assert_eq!(node.write(), json!(["x", "y"]));
    }

    #[test]
    fn id_reference_writes_id_object() {
        let node = JsonNode::id_reference(None, "urn:org1");
        assert_eq!(node.write(), json!({"@id": "urn:org1"}));
    }

    #[test]
    fn unnamed_object_children_are_skipped() {
        let obj = JsonNode::object(None, vec![JsonNode::literal(None, LiteralValue::Integer(1))]);
        assert_eq!(obj.write(), json!({}));
    }
}
