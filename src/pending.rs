//! Pending reference registry: obligations to assign nodes that have not
//! been materialized yet.
//!
//! While the instance builder consumes a document, an attribute value may be
//! nothing but `{"@id": ...}` for a node whose full object appears later (or
//! never). Each such sighting is recorded here, keyed by the referenced id;
//! several independent consumers may wait on the same id. When the node is
//! materialized, every consumer is satisfied from the one resolved instance.

use ahash::AHashMap;
use log::debug;

use crate::error::Error;
use crate::mapping::{Entity, MappingRegistry, Value};

/// One recorded obligation.
#[derive(Debug)]
pub enum PendingReference {
    /// A singular attribute slot awaiting the referenced instance.
    Singular {
        owner: Entity,
        slot: String,
        assumed_type: Option<String>,
    },
    /// A collection-valued attribute slot awaiting one more member.
    Collection {
        owner: Entity,
        slot: String,
        assumed_type: Option<String>,
    },
}

impl PendingReference {
    fn assumed_type(&self) -> Option<&str> {
        match self {
            PendingReference::Singular { assumed_type, .. }
            | PendingReference::Collection { assumed_type, .. } => assumed_type.as_deref(),
        }
    }
}

/// Registry of unresolved references for one deserialization call.
#[derive(Default)]
pub struct PendingReferences {
    by_id: AHashMap<String, Vec<PendingReference>>,
}

impl PendingReferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_singular(
        &mut self,
        id: &str,
        owner: Entity,
        slot: &str,
        assumed_type: Option<&str>,
    ) {
        self.by_id
            .entry(id.to_string())
            .or_default()
            .push(PendingReference::Singular {
                owner,
                slot: slot.to_string(),
                assumed_type: assumed_type.map(str::to_string),
            });
    }

    pub fn add_collection(
        &mut self,
        id: &str,
        owner: Entity,
        slot: &str,
        assumed_type: Option<&str>,
    ) {
        self.by_id
            .entry(id.to_string())
            .or_default()
            .push(PendingReference::Collection {
                owner,
                slot: slot.to_string(),
                assumed_type: assumed_type.map(str::to_string),
            });
    }

    /// The first assumed target type any consumer recorded for `id`.
    pub fn assumed_type_for(&self, id: &str) -> Option<&str> {
        self.by_id
            .get(id)?
            .iter()
            .find_map(PendingReference::assumed_type)
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Apply every reference recorded under `id` to the materialized
    /// `referenced` instance, then forget the id.
    ///
    /// Singular slots are assigned; collection slots get the instance
    /// appended. Late resolution appends at the end of the target collection,
    /// so for collection-typed slots the source document order is not
    /// reconstructed.
    pub fn resolve(
        &mut self,
        id: &str,
        referenced: &Entity,
        registry: &MappingRegistry,
    ) -> Result<(), Error> {
        let Some(references) = self.by_id.remove(id) else {
            return Ok(());
        };
        debug!("resolving {} pending reference(s) to '{id}'", references.len());
        for reference in references {
            if let Some(assumed) = reference.assumed_type() {
                let actual = referenced.type_name();
                if !registry.is_subtype_of(&actual, assumed) {
                    return Err(Error::TargetTypeMismatch {
                        id: id.to_string(),
                        actual,
                        expected: assumed.to_string(),
                    });
                }
            }
            match reference {
                PendingReference::Singular { owner, slot, .. } => {
                    owner.set(&slot, Value::Entity(referenced.clone()))?;
                }
                PendingReference::Collection { owner, slot, .. } => {
                    owner.push(&slot, Value::Entity(referenced.clone()))?;
                }
            }
        }
        Ok(())
    }

    /// Best-effort pass before the strict check: for every still-pending id
    /// with at least one assumed target type, build one minimal stub of that
    /// type, populate only its identifier, and resolve the id against it. All
    /// consumers of one id share the single stub. Ids without any assumed
    /// type stay pending for [`Self::verify_resolved`] to report.
    pub fn replace_with_assumed_typed_stubs(
        &mut self,
        registry: &MappingRegistry,
    ) -> Result<(), Error> {
        let stubbable: Vec<(String, String)> = self
            .by_id
            .iter()
            .filter_map(|(id, refs)| {
                refs.iter()
                    .find_map(PendingReference::assumed_type)
                    .map(|assumed| (id.clone(), assumed.to_string()))
            })
            .collect();
        for (id, assumed) in stubbable {
            let descriptor = registry.require(&assumed)?;
            let identifier = registry.identifier_attribute(descriptor).ok_or_else(|| {
                Error::msg(format!(
                    "cannot stub '{id}': assumed type '{assumed}' has no identifier attribute"
                ))
            })?;
            let stub = descriptor.new_instance()?;
            stub.set(identifier.slot(), Value::String(id.clone()))?;
            debug!("stubbing unresolved node '{id}' as '{assumed}'");
            self.resolve(&id, &stub, registry)?;
        }
        Ok(())
    }

    /// Strict end-of-pass check: fails naming every id that was referenced
    /// but never resolved.
    pub fn verify_resolved(&self) -> Result<(), Error> {
        if self.by_id.is_empty() {
            return Ok(());
        }
        let mut ids: Vec<String> = self.by_id.keys().cloned().collect();
        ids.sort();
        Err(Error::UnresolvedReferences { ids })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{Attribute, LdInstance, TypeDescriptor};
    use std::any::Any;

    #[derive(Default)]
    struct Node {
        uri: Option<String>,
        next: Option<Entity>,
        members: Vec<Entity>,
    }

    impl LdInstance for Node {
        fn type_name(&self) -> &str {
            "Node"
        }

        fn get(&self, slot: &str) -> Value {
            match slot {
                "uri" => self.uri.clone().map_or(Value::Null, Value::String),
                "next" => self.next.clone().map_or(Value::Null, Value::Entity),
                "members" => {
                    Value::Collection(self.members.iter().cloned().map(Value::Entity).collect())
                }
                _ => Value::Null,
            }
        }

        fn set(&mut self, slot: &str, value: Value) -> Result<(), Error> {
            match (slot, value) {
                ("uri", Value::String(s)) => self.uri = Some(s),
                ("next", Value::Entity(e)) => self.next = Some(e),
                ("members", Value::Collection(items)) => {
                    self.members = items
                        .into_iter()
                        .filter_map(|v| match v {
                            Value::Entity(e) => Some(e),
                            _ => None,
                        })
                        .collect();
                }
                (slot, _) => return Err(Error::from(format!("no slot '{slot}'"))),
            }
            Ok(())
        }

        fn push(&mut self, slot: &str, value: Value) -> Result<(), Error> {
            match (slot, value) {
                ("members", Value::Entity(e)) => {
                    self.members.push(e);
                    Ok(())
                }
                (slot, _) => Err(Error::from(format!("slot '{slot}' is not multi-valued"))),
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn registry() -> MappingRegistry {
        MappingRegistry::from_types([TypeDescriptor::new("Node", "http://example.org/Node")
            .attribute(Attribute::identifier("uri"))
            .attribute(Attribute::reference("next", "http://example.org/next", "Node"))
            .attribute(
                Attribute::reference("members", "http://example.org/member", "Node").multiple(),
            )
            .factory(|| Entity::new(Node::default()))])
        .unwrap()
    }

    #[test]
    fn all_consumers_share_the_resolved_instance() {
        let registry = registry();
        let a = Entity::new(Node::default());
        let b = Entity::new(Node::default());
        let mut pending = PendingReferences::new();
        pending.add_singular("urn:x", a.clone(), "next", Some("Node"));
        pending.add_singular("urn:x", b.clone(), "next", Some("Node"));

        let resolved = Entity::new(Node::default());
        pending.resolve("urn:x", &resolved, &registry).unwrap();

        let a_next = a.borrow_as::<Node>().unwrap().next.clone().unwrap();
        let b_next = b.borrow_as::<Node>().unwrap().next.clone().unwrap();
        assert!(Entity::ptr_eq(&a_next, &b_next));
        assert!(Entity::ptr_eq(&a_next, &resolved));
        assert!(pending.is_empty());
    }

    #[test]
    fn collection_references_are_appended() {
        let registry = registry();
        let owner = Entity::new(Node::default());
        let mut pending = PendingReferences::new();
        pending.add_collection("urn:m1", owner.clone(), "members", Some("Node"));
        pending.add_collection("urn:m2", owner.clone(), "members", Some("Node"));

        pending
            .resolve("urn:m2", &Entity::new(Node::default()), &registry)
            .unwrap();
        pending
            .resolve("urn:m1", &Entity::new(Node::default()), &registry)
            .unwrap();
        assert_eq!(owner.borrow_as::<Node>().unwrap().members.len(), 2);
    }

    #[test]
    fn verify_names_every_unresolved_id() {
        let mut pending = PendingReferences::new();
        let owner = Entity::new(Node::default());
        pending.add_singular("urn:b", owner.clone(), "next", None);
        pending.add_singular("urn:a", owner, "next", None);
        let err = pending.verify_resolved().unwrap_err();
        assert!(
            matches!(err, Error::UnresolvedReferences { ids } if ids == vec!["urn:a", "urn:b"])
        );
    }

    #[test]
    fn stub_pass_satisfies_assumed_typed_references_only() {
        let registry = registry();
        let owner = Entity::new(Node::default());
        let mut pending = PendingReferences::new();
        pending.add_singular("urn:typed", owner.clone(), "next", Some("Node"));
        pending.add_collection("urn:untyped", owner.clone(), "members", None);

        pending.replace_with_assumed_typed_stubs(&registry).unwrap();

        let stub = owner.borrow_as::<Node>().unwrap().next.clone().unwrap();
        assert_eq!(
            stub.borrow_as::<Node>().unwrap().uri.as_deref(),
            Some("urn:typed")
        );
        let err = pending.verify_resolved().unwrap_err();
        assert!(matches!(err, Error::UnresolvedReferences { ids } if ids == vec!["urn:untyped"]));
    }
}
