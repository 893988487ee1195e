//! Serialization: from a host object graph to a JSON-LD document.
//!
//! The [`ObjectGraphTraverser`] walks the graph and narrates it; the
//! [`TreeBuilder`] here listens, assembles the document tree, and feeds the
//! term table of the [`Context`] as a side effect. Actual text production is
//! the JSON writer's business, reached through [`JsonNode::write`].
//!
//! Two output shapes are supported, selected by
//! [`SerializerOptions::context`]:
//!
//! - **Compacted**: a single object keyed by terms, with an embedded
//!   `@context` block describing the term table. This is the human-facing
//!   shape.
//! - **Expanded**: a one-element array of node objects keyed by raw edge
//!   IRIs, every attribute value wrapped in an array of value objects. This
//!   is the machine-facing shape the deserializer consumes, so a round trip
//!   is `from_value(to_value_with_options(.., expanded))`.

use log::debug;
use serde_json::Value as Json;

use crate::context::{Context, ScopeId};
use crate::error::Error;
use crate::keywords;
use crate::literals::{DefaultCodec, LiteralCodec};
use crate::mapping::{Attribute, AttributeKind, Cardinality, Entity, MappingRegistry, Value};
use crate::nodes::{JsonNode, NodeKind};
use crate::serializer_options::{ContextPolicy, SerializerOptions};
use crate::traverser::{GraphVisitor, ObjectGraphTraverser, SerializationContext};

/// Serialize with default options (compacted output).
pub fn to_value(entity: &Entity, registry: &MappingRegistry) -> Result<Json, Error> {
    to_value_with_options(entity, registry, SerializerOptions::default())
}

/// Serialize to a JSON value with the given options.
pub fn to_value_with_options(
    entity: &Entity,
    registry: &MappingRegistry,
    options: SerializerOptions,
) -> Result<Json, Error> {
    let expanded = matches!(options.context, ContextPolicy::Expanded);
    let mut builder = TreeBuilder::new(&options);
    let mut traverser = ObjectGraphTraverser::new(registry, &mut builder, options.require_identifier);
    traverser.traverse(entity)?;
    let tree = builder.finish()?;
    let document = tree.write();
    debug!("serialized one instance graph into a {} document", if expanded { "expanded" } else { "compacted" });
    Ok(if expanded {
        Json::Array(vec![document])
    } else {
        document
    })
}

/// Serialize with default options and render through the JSON writer.
pub fn to_string(entity: &Entity, registry: &MappingRegistry) -> Result<String, Error> {
    to_string_with_options(entity, registry, SerializerOptions::default())
}

/// Serialize to text with the given options.
pub fn to_string_with_options(
    entity: &Entity,
    registry: &MappingRegistry,
    options: SerializerOptions,
) -> Result<String, Error> {
    let value = to_value_with_options(entity, registry, options)?;
    Ok(serde_json::to_string(&value)?)
}

enum PendingNode {
    Object {
        name: Option<String>,
        scope: ScopeId,
        children: Vec<JsonNode>,
    },
    Collection {
        name: Option<String>,
        ordered: bool,
        datatype: Option<String>,
        language: Option<String>,
        items: Vec<JsonNode>,
    },
}

/// Visitor that builds the document tree and populates the context.
pub struct TreeBuilder {
    compact: bool,
    context: Context,
    scope_stack: Vec<ScopeId>,
    stack: Vec<PendingNode>,
    result: Option<JsonNode>,
    codec: DefaultCodec,
}

impl TreeBuilder {
    pub fn new(options: &SerializerOptions) -> Self {
        let compact = matches!(options.context, ContextPolicy::Compacted);
        let context = if compact {
            Context::compacting()
        } else {
            Context::expanded()
        };
        let root = context.root();
        TreeBuilder {
            compact,
            context,
            scope_stack: vec![root],
            stack: Vec::new(),
            result: None,
            codec: DefaultCodec::from_options(options),
        }
    }

    /// The finished tree, once the traversal has closed the root object.
    pub fn finish(self) -> Result<JsonNode, Error> {
        self.result
            .ok_or_else(|| Error::msg("traversal finished without producing a document"))
    }

    fn current_scope(&self) -> ScopeId {
        self.scope_stack
            .last()
            .copied()
            .unwrap_or_else(|| self.context.root())
    }

    /// The node name for an event: the term in compacted output, the raw
    /// edge IRI otherwise. Collection items and the root have none.
    fn name_for(&mut self, ctx: &SerializationContext<'_>) -> Result<Option<String>, Error> {
        if let Some(attribute) = ctx.attribute {
            if self.compact {
                self.register_term(attribute)?;
                return Ok(Some(attribute.term().to_string()));
            }
            return Ok(Some(attribute.edge().to_string()));
        }
        Ok(ctx.edge.map(str::to_string))
    }

    // Plain IRI mapping for untagged data attributes, a descriptor object
    // for reference, datatyped, and language-tagged ones.
    fn register_term(&mut self, attribute: &Attribute) -> Result<(), Error> {
        let plain = attribute.kind() == AttributeKind::Data
            && attribute.datatype().is_none()
            && attribute.language().is_none();
        let mapping = if plain {
            JsonNode::string_literal(None, attribute.edge())
        } else {
            let mut children = vec![JsonNode::string_literal(
                Some(keywords::ID.to_string()),
                attribute.edge(),
            )];
            if attribute.kind() == AttributeKind::Reference {
                children.push(JsonNode::string_literal(
                    Some(keywords::TYPE.to_string()),
                    keywords::ID,
                ));
            } else if let Some(datatype) = attribute.datatype() {
                children.push(JsonNode::string_literal(
                    Some(keywords::TYPE.to_string()),
                    datatype,
                ));
            }
            if let Some(language) = attribute.language() {
                children.push(JsonNode::string_literal(
                    Some(keywords::LANGUAGE.to_string()),
                    language,
                ));
            }
            JsonNode::object(None, children)
        };
        let scope = self.current_scope();
        self.context
            .register_term_node(scope, attribute.term(), mapping)
    }

    /// Attach a completed node under `name`. In expanded output a named
    /// singular value gains the mandatory array wrapper; sets are already
    /// arrays and keyword children never come through here.
    fn emit(&mut self, name: Option<String>, node: JsonNode) -> Result<(), Error> {
        match self.stack.last_mut() {
            None => {
                self.result = Some(node.into_named(name));
                Ok(())
            }
            Some(PendingNode::Object { children, .. }) => {
                let wrap = !self.compact && !matches!(node.kind(), NodeKind::Set(_));
                let node = if wrap {
                    JsonNode::set(name, vec![node])
                } else {
                    node.into_named(name)
                };
                children.push(node);
                Ok(())
            }
            Some(PendingNode::Collection { items, .. }) => {
                items.push(node);
                Ok(())
            }
        }
    }

    fn push_keyword_child(&mut self, node: JsonNode) {
        if let Some(PendingNode::Object { children, .. }) = self.stack.last_mut() {
            children.push(node);
        }
    }

    // Literal metadata comes from the attribute itself, or from the
    // attribute that opened the enclosing collection.
    fn literal_meta(&self, ctx: &SerializationContext<'_>) -> (Option<String>, Option<String>) {
        if let Some(attribute) = ctx.attribute {
            return (
                attribute.datatype().map(str::to_string),
                attribute.language().map(str::to_string),
            );
        }
        if let Some(PendingNode::Collection {
            datatype, language, ..
        }) = self.stack.last()
        {
            return (datatype.clone(), language.clone());
        }
        (None, None)
    }

    fn literal_node(
        &self,
        ctx: &SerializationContext<'_>,
        value: &Value,
    ) -> Result<JsonNode, Error> {
        let (datatype, language) = self.literal_meta(ctx);
        let literal = self.codec.encode(value, datatype.as_deref())?;
        if self.compact {
            // Datatype and language ride in the term descriptor; the literal
            // itself stays bare.
            return Ok(JsonNode::literal(None, literal));
        }
        let mut children = vec![JsonNode::literal(Some(keywords::VALUE.to_string()), literal)];
        if let Some(datatype) = datatype {
            children.push(JsonNode::string_literal(
                Some(keywords::TYPE.to_string()),
                datatype,
            ));
        }
        if let Some(language) = language {
            children.push(JsonNode::string_literal(
                Some(keywords::LANGUAGE.to_string()),
                language,
            ));
        }
        Ok(JsonNode::object(None, children))
    }
}

impl GraphVisitor for TreeBuilder {
    fn open_object(
        &mut self,
        ctx: &SerializationContext<'_>,
        _entity: &Entity,
    ) -> Result<(), Error> {
        let name = self.name_for(ctx)?;
        let scope = if self.stack.is_empty() {
            self.current_scope()
        } else {
            self.context.child_embedded(self.current_scope())
        };
        self.scope_stack.push(scope);
        self.stack.push(PendingNode::Object {
            name,
            scope,
            children: Vec::new(),
        });
        Ok(())
    }

    fn close_object(&mut self) -> Result<(), Error> {
        let Some(PendingNode::Object {
            name,
            scope,
            mut children,
        }) = self.stack.pop()
        else {
            return Err(Error::msg("close_object without a matching open_object"));
        };
        self.scope_stack.pop();
        if self.compact && !self.context.is_empty(scope) {
            children.insert(0, self.context.to_node(scope));
        }
        self.emit(name, JsonNode::object(None, children))
    }

    fn visit_identifier(&mut self, id: &str) -> Result<(), Error> {
        self.push_keyword_child(JsonNode::string_literal(Some(keywords::ID.to_string()), id));
        Ok(())
    }

    fn visit_types(&mut self, type_iris: &[String]) -> Result<(), Error> {
        let items = type_iris
            .iter()
            .map(|iri| JsonNode::string_literal(None, iri.clone()))
            .collect();
        self.push_keyword_child(JsonNode::set(Some(keywords::TYPE.to_string()), items));
        Ok(())
    }

    fn visit_value(&mut self, ctx: &SerializationContext<'_>, value: &Value) -> Result<(), Error> {
        let name = self.name_for(ctx)?;
        let node = self.literal_node(ctx, value)?;
        self.emit(name, node)
    }

    fn visit_known_instance(
        &mut self,
        ctx: &SerializationContext<'_>,
        id: &str,
    ) -> Result<(), Error> {
        let name = self.name_for(ctx)?;
        self.emit(name, JsonNode::id_reference(None, id))
    }

    fn open_collection(&mut self, ctx: &SerializationContext<'_>) -> Result<(), Error> {
        let name = self.name_for(ctx)?;
        let (datatype, language) = self.literal_meta(ctx);
        let ordered = ctx
            .attribute
            .is_some_and(|attr| attr.cardinality() == Cardinality::List);
        self.stack.push(PendingNode::Collection {
            name,
            ordered,
            datatype,
            language,
            items: Vec::new(),
        });
        Ok(())
    }

    fn close_collection(&mut self) -> Result<(), Error> {
        let Some(PendingNode::Collection {
            name,
            ordered,
            items,
            ..
        }) = self.stack.pop()
        else {
            return Err(Error::msg(
                "close_collection without a matching open_collection",
            ));
        };
        let node = match (ordered, self.compact) {
            // The explicit list wrapper carries order through both shapes;
            // expanded output additionally needs the outer array.
            (true, true) => JsonNode::list(None, items),
            (true, false) => JsonNode::set(None, vec![JsonNode::list(None, items)]),
            (false, _) => JsonNode::set(None, items),
        };
        self.emit(name, node)
    }

    fn open_property_bag(&mut self, _attribute: &Attribute) -> Result<(), Error> {
        let scope = self.context.child_write_through(self.current_scope());
        self.scope_stack.push(scope);
        Ok(())
    }

    fn close_property_bag(&mut self) -> Result<(), Error> {
        self.scope_stack.pop();
        Ok(())
    }
}
