//! Object graph traverser: walks a host instance graph and narrates it as
//! structural events.
//!
//! The traverser holds no document-building logic. Registered visitors (the
//! tree builder, and through it the context builder) receive every event and
//! decide what to make of it.
//!
//! Sharing and cycles are handled with an explicit identity map, keyed by the
//! instance address and created fresh for every call. The first sighting of
//! an instance traverses it in full; every later sighting, including a
//! sighting of an instance still open higher up the stack, emits only a
//! reference to its identifier. The comparison key is identity, never value
//! equality: two equal but distinct instances serialize as two full nodes.

use std::collections::HashMap;

use log::trace;
use nohash_hasher::BuildNoHashHasher;

use crate::error::Error;
use crate::mapping::{Attribute, AttributeKind, Entity, MappingRegistry, Value};

/// Where in the host graph an event originates.
///
/// An ephemeral record handed to every visitor callback; not persisted.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerializationContext<'a> {
    /// Compact-output term for the attribute, when one is mapped.
    pub term: Option<&'a str>,
    /// Raw edge IRI the value is attached under.
    pub edge: Option<&'a str>,
    /// The mapped attribute descriptor; `None` for collection items, bag
    /// entries, and the root.
    pub attribute: Option<&'a Attribute>,
}

impl<'a> SerializationContext<'a> {
    /// Context of the root instance: attached under nothing.
    pub fn root() -> Self {
        SerializationContext::default()
    }

    pub fn for_attribute(attribute: &'a Attribute) -> Self {
        SerializationContext {
            term: Some(attribute.term()),
            edge: Some(attribute.edge()),
            attribute: Some(attribute),
        }
    }

    /// Context of a property-bag entry, attached under its raw edge.
    pub fn for_bag_entry(edge: &'a str) -> Self {
        SerializationContext {
            term: None,
            edge: Some(edge),
            attribute: None,
        }
    }

    /// Context of a collection item: a pure value.
    pub fn item() -> Self {
        SerializationContext::default()
    }
}

/// Receiver of traversal events.
pub trait GraphVisitor {
    fn open_object(
        &mut self,
        ctx: &SerializationContext<'_>,
        entity: &Entity,
    ) -> Result<(), Error>;

    fn close_object(&mut self) -> Result<(), Error>;

    fn visit_identifier(&mut self, id: &str) -> Result<(), Error>;

    fn visit_types(&mut self, type_iris: &[String]) -> Result<(), Error>;

    /// A literal value, either an attribute's or a collection item's.
    fn visit_value(&mut self, ctx: &SerializationContext<'_>, value: &Value) -> Result<(), Error>;

    /// A repeat sighting of an already-visited instance.
    fn visit_known_instance(
        &mut self,
        ctx: &SerializationContext<'_>,
        id: &str,
    ) -> Result<(), Error>;

    fn open_collection(&mut self, ctx: &SerializationContext<'_>) -> Result<(), Error>;

    fn close_collection(&mut self) -> Result<(), Error>;

    fn open_property_bag(&mut self, attribute: &Attribute) -> Result<(), Error>;

    fn close_property_bag(&mut self) -> Result<(), Error>;
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Open,
    Closed,
}

struct VisitedInstance {
    id: String,
    state: VisitState,
}

/// One serialization call's walk over the host graph.
pub struct ObjectGraphTraverser<'r, 'v, V: GraphVisitor> {
    registry: &'r MappingRegistry,
    visitor: &'v mut V,
    require_identifier: bool,
    visited: HashMap<usize, VisitedInstance, BuildNoHashHasher<usize>>,
    blank_counter: usize,
}

impl<'r, 'v, V: GraphVisitor> ObjectGraphTraverser<'r, 'v, V> {
    pub fn new(registry: &'r MappingRegistry, visitor: &'v mut V, require_identifier: bool) -> Self {
        ObjectGraphTraverser {
            registry,
            visitor,
            require_identifier,
            visited: HashMap::with_hasher(BuildNoHashHasher::default()),
            blank_counter: 0,
        }
    }

    pub fn traverse(&mut self, root: &Entity) -> Result<(), Error> {
        self.visit_instance(&SerializationContext::root(), root)
    }

    fn visit_instance(
        &mut self,
        ctx: &SerializationContext<'_>,
        entity: &Entity,
    ) -> Result<(), Error> {
        let key = entity.addr();
        if let Some(known) = self.visited.get(&key) {
            trace!(
                "re-emitting {} as reference '{}'",
                if known.state == VisitState::Open {
                    "cyclic instance"
                } else {
                    "shared instance"
                },
                known.id
            );
            let id = known.id.clone();
            return self.visitor.visit_known_instance(ctx, &id);
        }

        let type_name = entity.type_name();
        let descriptor = self.registry.require(&type_name)?;
        let id = self.identifier_of(entity)?;
        let type_iris = self.type_iris_of(entity)?;
        trace!("opening node '{id}' of type '{type_name}'");

        self.visited.insert(
            key,
            VisitedInstance {
                id: id.clone(),
                state: VisitState::Open,
            },
        );

        self.visitor.open_object(ctx, entity)?;
        self.visitor.visit_identifier(&id)?;
        self.visitor.visit_types(&type_iris)?;

        for attribute in self.registry.attributes_of(descriptor) {
            match attribute.kind() {
                AttributeKind::Identifier | AttributeKind::Types => {}
                AttributeKind::Data | AttributeKind::Reference => {
                    self.visit_attribute(attribute, &entity.get(attribute.slot()))?;
                }
                AttributeKind::PropertyBag => {
                    self.visit_bag(attribute, &entity.get(attribute.slot()))?;
                }
            }
        }

        if let Some(entry) = self.visited.get_mut(&key) {
            entry.state = VisitState::Closed;
        }
        self.visitor.close_object()
    }

    fn visit_attribute(&mut self, attribute: &Attribute, value: &Value) -> Result<(), Error> {
        let ctx = SerializationContext::for_attribute(attribute);
        self.visit_any(&ctx, value)
    }

    // Dispatch on the value shape; null attributes are simply not emitted.
    fn visit_any(
        &mut self,
        ctx: &SerializationContext<'_>,
        value: &Value,
    ) -> Result<(), Error> {
        match value {
            Value::Null => Ok(()),
            Value::Entity(entity) => self.visit_instance(ctx, entity),
            Value::Collection(items) => {
                self.visitor.open_collection(ctx)?;
                for item in items {
                    self.visit_any(&SerializationContext::item(), item)?;
                }
                self.visitor.close_collection()
            }
            Value::Bag(_) => Err(Error::msg(
                "a property bag value may only appear in a property-bag attribute",
            )),
            scalar => self.visitor.visit_value(ctx, scalar),
        }
    }

    // Each bag entry fans out as if it were an attribute of its own.
    fn visit_bag(&mut self, attribute: &Attribute, value: &Value) -> Result<(), Error> {
        let entries = match value {
            Value::Bag(entries) if !entries.is_empty() => entries,
            Value::Bag(_) | Value::Null => return Ok(()),
            other => {
                return Err(Error::msg(format!(
                    "property-bag slot '{}' produced a non-bag value {other:?}",
                    attribute.slot()
                )));
            }
        };
        self.visitor.open_property_bag(attribute)?;
        for (edge, entry) in entries {
            let ctx = SerializationContext::for_bag_entry(edge);
            self.visit_any(&ctx, entry)?;
        }
        self.visitor.close_property_bag()
    }

    fn identifier_of(&mut self, entity: &Entity) -> Result<String, Error> {
        let type_name = entity.type_name();
        let descriptor = self.registry.require(&type_name)?;
        let stored = self
            .registry
            .identifier_attribute(descriptor)
            .map(|attr| entity.get(attr.slot()));
        match stored {
            Some(Value::String(id)) if !id.is_empty() => Ok(id),
            _ if self.require_identifier => Err(Error::MissingIdentifier { type_name }),
            _ => {
                // Anonymous instance: mint a call-scoped blank node id so
                // repeat sightings still have something to reference.
                let id = format!("_:b{}", self.blank_counter);
                self.blank_counter += 1;
                Ok(id)
            }
        }
    }

    fn type_iris_of(&self, entity: &Entity) -> Result<Vec<String>, Error> {
        let type_name = entity.type_name();
        let descriptor = self.registry.require(&type_name)?;
        let mut iris = self.registry.declared_type_iris(descriptor);
        if let Some(types_attr) = self.registry.types_attribute(descriptor) {
            if let Value::Collection(items) = entity.get(types_attr.slot()) {
                for item in items {
                    if let Value::String(iri) = item {
                        if !iris.contains(&iri) {
                            iris.push(iri);
                        }
                    }
                }
            }
        }
        if iris.is_empty() {
            return Err(Error::MissingTypeInfo { type_name });
        }
        Ok(iris)
    }
}
