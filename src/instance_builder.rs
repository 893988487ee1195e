//! Instance builder: the stack machine materializing typed instances from
//! document events.
//!
//! The expanded-form processor walks the document depth first and drives the
//! builder: open a node object, add literal values and references, open and
//! close collections, close the node object. One frame per open node object;
//! stack depth equals document nesting depth.
//!
//! Closing a frame registers the instance under its identifier, which is the
//! moment earlier forward references to that identifier are reconciled (see
//! [`PendingReferences`]).

use ahash::AHashMap;
use log::trace;

use crate::error::Error;
use crate::mapping::{Attribute, Entity, MappingRegistry, TypeDescriptor, Value};
use crate::pending::PendingReferences;
use crate::resolver;

struct OpenCollection {
    slot: String,
    items: Vec<Value>,
}

struct Frame<'r> {
    descriptor: &'r TypeDescriptor,
    instance: Entity,
    id: Option<String>,
    open_collection: Option<OpenCollection>,
    bag: Vec<(String, Value)>,
}

/// One deserialization call's builder state.
pub struct InstanceBuilder<'r> {
    registry: &'r MappingRegistry,
    stack: Vec<Frame<'r>>,
    known: AHashMap<String, Entity>,
    pending: PendingReferences,
}

impl<'r> InstanceBuilder<'r> {
    pub fn new(registry: &'r MappingRegistry) -> Self {
        InstanceBuilder {
            registry,
            stack: Vec::new(),
            known: AHashMap::new(),
            pending: PendingReferences::new(),
        }
    }

    /// Open a frame for a node object.
    ///
    /// A node whose identifier is already known continues populating the
    /// existing instance (flattened documents may split one node over several
    /// objects); otherwise the concrete type is resolved and a fresh instance
    /// constructed.
    pub fn open_object(
        &mut self,
        id: Option<&str>,
        type_iris: &[String],
        expected: Option<&'r TypeDescriptor>,
    ) -> Result<(), Error> {
        let (descriptor, instance) = match id.and_then(|id| self.known.get(id)) {
            Some(existing) => {
                let descriptor = self.registry.require(&existing.type_name())?;
                (descriptor, existing.clone())
            }
            None => {
                let descriptor = resolver::resolve(self.registry, expected, type_iris)?;
                let instance = descriptor.new_instance()?;
                if let Some(id) = id {
                    if let Some(identifier) = self.registry.identifier_attribute(descriptor) {
                        instance.set(identifier.slot(), Value::String(id.to_string()))?;
                    }
                }
                if !type_iris.is_empty() {
                    if let Some(types) = self.registry.types_attribute(descriptor) {
                        instance.set(
                            types.slot(),
                            Value::Collection(
                                type_iris.iter().cloned().map(Value::String).collect(),
                            ),
                        )?;
                    }
                }
                (descriptor, instance)
            }
        };
        trace!(
            "opening frame for '{}' node '{}'",
            descriptor.name(),
            id.unwrap_or("<anonymous>")
        );
        self.stack.push(Frame {
            descriptor,
            instance,
            id: id.map(str::to_string),
            open_collection: None,
            bag: Vec::new(),
        });
        Ok(())
    }

    /// Close the top frame and return the built instance.
    ///
    /// If the node carried an identifier, the instance becomes visible to
    /// later references and every earlier pending reference to it is applied
    /// now.
    pub fn close_object(&mut self) -> Result<Entity, Error> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| Error::msg("close_object without a matching open_object"))?;
        if !frame.bag.is_empty() {
            if let Some(bag) = self.registry.bag_attribute(frame.descriptor) {
                frame.instance.set(bag.slot(), Value::Bag(frame.bag))?;
            }
        }
        if let Some(id) = frame.id {
            trace!("registering node '{id}' as '{}'", frame.descriptor.name());
            self.known.insert(id.clone(), frame.instance.clone());
            self.pending.resolve(&id, &frame.instance, self.registry)?;
        }
        Ok(frame.instance)
    }

    /// Descriptor of the node object currently being populated.
    pub fn current_descriptor(&self) -> Result<&'r TypeDescriptor, Error> {
        self.stack
            .last()
            .map(|frame| frame.descriptor)
            .ok_or_else(|| Error::msg("no node object is open"))
    }

    pub fn open_collection(&mut self, attribute: &Attribute) -> Result<(), Error> {
        let frame = self
            .stack
            .last_mut()
            .ok_or_else(|| Error::msg("no node object is open"))?;
        if frame.open_collection.is_some() {
            return Err(Error::msg("a collection is already open on this frame"));
        }
        frame.open_collection = Some(OpenCollection {
            slot: attribute.slot().to_string(),
            items: Vec::new(),
        });
        Ok(())
    }

    pub fn close_collection(&mut self) -> Result<(), Error> {
        let frame = self
            .stack
            .last_mut()
            .ok_or_else(|| Error::msg("no node object is open"))?;
        let collection = frame
            .open_collection
            .take()
            .ok_or_else(|| Error::msg("close_collection without a matching open_collection"))?;
        frame
            .instance
            .set(&collection.slot, Value::Collection(collection.items))
    }

    /// Add a value: into the open collection if one is open, directly into
    /// the slot otherwise.
    pub fn add_value(&mut self, slot: &str, value: Value) -> Result<(), Error> {
        let frame = self
            .stack
            .last_mut()
            .ok_or_else(|| Error::msg("no node object is open"))?;
        match &mut frame.open_collection {
            Some(collection) => {
                collection.items.push(value);
                Ok(())
            }
            None => frame.instance.set(slot, value),
        }
    }

    /// Add a reference to the node identified by `id`: in place when the
    /// node is already materialized, as a pending reference otherwise.
    pub fn add_node_reference(
        &mut self,
        id: &str,
        slot: &str,
        assumed_type: Option<&str>,
    ) -> Result<(), Error> {
        let known = self.known.get(id).cloned();
        let frame = self
            .stack
            .last_mut()
            .ok_or_else(|| Error::msg("no node object is open"))?;
        if let Some(referenced) = known {
            if let Some(assumed) = assumed_type {
                let actual = referenced.type_name();
                if !self.registry.is_subtype_of(&actual, assumed) {
                    return Err(Error::TargetTypeMismatch {
                        id: id.to_string(),
                        actual,
                        expected: assumed.to_string(),
                    });
                }
            }
            return match &mut frame.open_collection {
                Some(collection) => {
                    collection.items.push(Value::Entity(referenced));
                    Ok(())
                }
                None => frame.instance.set(slot, Value::Entity(referenced)),
            };
        }
        trace!("recording pending reference to '{id}'");
        match &frame.open_collection {
            Some(collection) => self.pending.add_collection(
                id,
                frame.instance.clone(),
                &collection.slot,
                assumed_type,
            ),
            None => self
                .pending
                .add_singular(id, frame.instance.clone(), slot, assumed_type),
        }
        Ok(())
    }

    /// Record an unmapped property for the frame's bag attribute.
    pub fn add_bag_entry(&mut self, edge: &str, value: Value) -> Result<(), Error> {
        let frame = self
            .stack
            .last_mut()
            .ok_or_else(|| Error::msg("no node object is open"))?;
        frame.bag.push((edge.to_string(), value));
        Ok(())
    }

    /// The assumed target type a pending reference recorded for `id`, if any.
    pub fn assumed_type_for(&self, id: &str) -> Option<String> {
        self.pending.assumed_type_for(id).map(str::to_string)
    }

    /// End-of-pass reconciliation: optionally stub assumed-typed leftovers,
    /// then verify nothing stayed unresolved.
    pub fn finish(&mut self, assume_target_type: bool) -> Result<(), Error> {
        if assume_target_type {
            self.pending.replace_with_assumed_typed_stubs(self.registry)?;
        }
        self.pending.verify_resolved()
    }
}
