//! Host-side mapping metadata and the object seam the engine works against.
//!
//! Discovery of this metadata is not the engine's business. Some external
//! step, a derive macro, a registry assembled by hand, a code generator,
//! produces one immutable [`MappingRegistry`] at load time; the engine only
//! ever reads it. The registry answers exactly two questions: which attribute
//! of a type maps to which edge IRI, and which concrete types are candidates
//! for a given type IRI.
//!
//! Instances cross the seam as [`Entity`] handles, shared `Rc` cells over the
//! [`LdInstance`] trait. Sharing is the point: the same handle can sit in any
//! number of attribute slots, and identity (the `Rc` pointer, never value
//! equality) is what the traverser keys its visited set on.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::error::Error;

/// What an attribute of a mapped type holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeKind {
    /// The node identifier slot, written as `@id`.
    Identifier,
    /// The runtime type-set slot, written as `@type`.
    Types,
    /// A literal-valued attribute.
    Data,
    /// An attribute referencing other mapped instances.
    Reference,
    /// The catch-all bag for properties no mapped attribute claims.
    PropertyBag,
}

/// How many values an attribute holds, and in which container they travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cardinality {
    Singular,
    /// Unordered collection; wire form is a plain array.
    Set,
    /// Ordered collection; wire form is the `@list` wrapper (or a plain array
    /// under an `@container: @list` term in compacted output).
    List,
}

impl Cardinality {
    pub fn is_collection(self) -> bool {
        !matches!(self, Cardinality::Singular)
    }
}

/// Mapping descriptor for one attribute slot of a host type.
#[derive(Clone, Debug)]
pub struct Attribute {
    slot: String,
    term: String,
    edge: String,
    kind: AttributeKind,
    cardinality: Cardinality,
    target_type: Option<String>,
    datatype: Option<String>,
    language: Option<String>,
}

impl Attribute {
    /// The identifier slot. At most one per type chain.
    pub fn identifier(slot: impl Into<String>) -> Self {
        Self::new(slot, "", AttributeKind::Identifier)
    }

    /// The runtime type-set slot, a collection of IRI strings.
    pub fn types(slot: impl Into<String>) -> Self {
        let mut attr = Self::new(slot, "", AttributeKind::Types);
        attr.cardinality = Cardinality::Set;
        attr
    }

    /// A literal-valued attribute mapped to `edge`.
    pub fn data(slot: impl Into<String>, edge: impl Into<String>) -> Self {
        Self::new(slot, edge, AttributeKind::Data)
    }

    /// An entity-valued attribute mapped to `edge`, declared to hold
    /// instances of `target_type`.
    pub fn reference(
        slot: impl Into<String>,
        edge: impl Into<String>,
        target_type: impl Into<String>,
    ) -> Self {
        let mut attr = Self::new(slot, edge, AttributeKind::Reference);
        attr.target_type = Some(target_type.into());
        attr
    }

    /// An entity-valued attribute with no declared target type. References
    /// through it resolve purely from the document's type identifiers and
    /// can never be stubbed by the assumed-type pass.
    pub fn untyped_reference(slot: impl Into<String>, edge: impl Into<String>) -> Self {
        Self::new(slot, edge, AttributeKind::Reference)
    }

    /// The unmapped-extra-properties bag.
    pub fn property_bag(slot: impl Into<String>) -> Self {
        Self::new(slot, "", AttributeKind::PropertyBag)
    }

    fn new(slot: impl Into<String>, edge: impl Into<String>, kind: AttributeKind) -> Self {
        let slot = slot.into();
        Attribute {
            term: slot.clone(),
            slot,
            edge: edge.into(),
            kind,
            cardinality: Cardinality::Singular,
            target_type: None,
            datatype: None,
            language: None,
        }
    }

    /// Make this an unordered multi-valued attribute.
    pub fn multiple(mut self) -> Self {
        self.cardinality = Cardinality::Set;
        self
    }

    /// Make this an ordered multi-valued attribute.
    pub fn ordered(mut self) -> Self {
        self.cardinality = Cardinality::List;
        self
    }

    /// Override the compact-output term; defaults to the slot name.
    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = term.into();
        self
    }

    /// Tag literal values of this attribute with a datatype IRI.
    pub fn with_datatype(mut self, datatype: impl Into<String>) -> Self {
        self.datatype = Some(datatype.into());
        self
    }

    /// Tag literal values of this attribute with a language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn edge(&self) -> &str {
        &self.edge
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn target_type(&self) -> Option<&str> {
        self.target_type.as_deref()
    }

    pub fn datatype(&self) -> Option<&str> {
        self.datatype.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

type Factory = Box<dyn Fn() -> Entity + Send + Sync>;

/// Mapping descriptor for one host type.
pub struct TypeDescriptor {
    name: String,
    type_iri: Option<String>,
    supertype: Option<String>,
    identifier_only: bool,
    attributes: Vec<Attribute>,
    factory: Option<Factory>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, type_iri: impl Into<String>) -> Self {
        TypeDescriptor {
            name: name.into(),
            type_iri: Some(type_iri.into()),
            supertype: None,
            identifier_only: false,
            attributes: Vec::new(),
            factory: None,
        }
    }

    /// A descriptor for a type with no type IRI of its own. Serializing an
    /// instance of such a type fails with missing type info unless the
    /// instance carries runtime types.
    pub fn anonymous(name: impl Into<String>) -> Self {
        TypeDescriptor {
            name: name.into(),
            type_iri: None,
            supertype: None,
            identifier_only: false,
            attributes: Vec::new(),
            factory: None,
        }
    }

    pub fn with_supertype(mut self, supertype: impl Into<String>) -> Self {
        self.supertype = Some(supertype.into());
        self
    }

    /// Mark this type as carrying nothing but an identifier. Deserializing
    /// into it skips target-type resolution entirely.
    pub fn identifier_only(mut self) -> Self {
        self.identifier_only = true;
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn factory(mut self, factory: impl Fn() -> Entity + Send + Sync + 'static) -> Self {
        self.factory = Some(Box::new(factory));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_iri(&self) -> Option<&str> {
        self.type_iri.as_deref()
    }

    pub fn supertype(&self) -> Option<&str> {
        self.supertype.as_deref()
    }

    pub fn is_identifier_only(&self) -> bool {
        self.identifier_only
    }

    /// Attributes declared directly on this type, excluding inherited ones.
    pub fn own_attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Construct a fresh, empty instance of this type.
    pub fn new_instance(&self) -> Result<Entity, Error> {
        match &self.factory {
            Some(factory) => Ok(factory()),
            None => Err(Error::msg(format!(
                "type '{}' has no instance factory registered",
                self.name
            ))),
        }
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("type_iri", &self.type_iri)
            .field("supertype", &self.supertype)
            .field("attributes", &self.attributes.len())
            .finish()
    }
}

/// Immutable registry of everything the discovery step found out about the
/// mapped types. Built once, then shared read-only; concurrent calls need no
/// synchronization around it.
pub struct MappingRegistry {
    types: AHashMap<String, TypeDescriptor>,
    by_iri: AHashMap<String, Vec<String>>,
}

impl MappingRegistry {
    /// Assemble a registry from discovered type descriptors.
    ///
    /// Fails on duplicate type names, on a supertype reference naming an
    /// unregistered type, and on inheritance cycles.
    pub fn from_types(
        descriptors: impl IntoIterator<Item = TypeDescriptor>,
    ) -> Result<Self, Error> {
        let mut types = AHashMap::new();
        let mut by_iri: AHashMap<String, Vec<String>> = AHashMap::new();
        for descriptor in descriptors {
            if let Some(iri) = descriptor.type_iri() {
                by_iri
                    .entry(iri.to_string())
                    .or_default()
                    .push(descriptor.name.clone());
            }
            let name = descriptor.name.clone();
            if types.insert(name.clone(), descriptor).is_some() {
                return Err(Error::msg(format!(
                    "duplicate type descriptor registered under '{name}'"
                )));
            }
        }
        let registry = MappingRegistry { types, by_iri };
        registry.validate_hierarchy()?;
        Ok(registry)
    }

    fn validate_hierarchy(&self) -> Result<(), Error> {
        for descriptor in self.types.values() {
            let mut seen = vec![descriptor.name()];
            let mut current = descriptor.supertype();
            while let Some(supertype) = current {
                if seen.contains(&supertype) {
                    return Err(Error::msg(format!(
                        "inheritance cycle through type '{supertype}'"
                    )));
                }
                let parent = self
                    .types
                    .get(supertype)
                    .ok_or_else(|| Error::unknown_type(supertype))?;
                seen.push(parent.name());
                current = parent.supertype();
            }
        }
        Ok(())
    }

    pub fn descriptor(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&TypeDescriptor, Error> {
        self.descriptor(name).ok_or_else(|| Error::unknown_type(name))
    }

    /// Candidate target types registered under a type IRI.
    pub fn candidates_for(&self, iri: &str) -> impl Iterator<Item = &TypeDescriptor> {
        self.by_iri
            .get(iri)
            .into_iter()
            .flatten()
            .filter_map(|name| self.types.get(name))
    }

    /// True when at least one type is registered under the IRI.
    pub fn is_registered_iri(&self, iri: &str) -> bool {
        self.by_iri.contains_key(iri)
    }

    /// Subtype-or-equal check along the supertype chain.
    pub fn is_subtype_of(&self, sub: &str, sup: &str) -> bool {
        let mut current = Some(sub);
        while let Some(name) = current {
            if name == sup {
                return true;
            }
            current = self.types.get(name).and_then(TypeDescriptor::supertype);
        }
        false
    }

    /// All attributes of a type, inherited ones first, in declaration order.
    pub fn attributes_of<'r>(&'r self, descriptor: &'r TypeDescriptor) -> Vec<&'r Attribute> {
        let mut chain = Vec::new();
        let mut current = Some(descriptor);
        while let Some(desc) = current {
            chain.push(desc);
            current = desc.supertype().and_then(|name| self.types.get(name));
        }
        chain
            .iter()
            .rev()
            .flat_map(|desc| desc.own_attributes())
            .collect()
    }

    /// The attribute of `descriptor` (or an ancestor) mapped to `edge`.
    /// Attributes declared closer to the type shadow inherited ones.
    pub fn attribute_for_edge<'r>(
        &'r self,
        descriptor: &'r TypeDescriptor,
        edge: &str,
    ) -> Option<&'r Attribute> {
        let mut current = Some(descriptor);
        while let Some(desc) = current {
            if let Some(attr) = desc.own_attributes().iter().find(|a| a.edge() == edge) {
                return Some(attr);
            }
            current = desc.supertype().and_then(|name| self.types.get(name));
        }
        None
    }

    fn attribute_of_kind<'r>(
        &'r self,
        descriptor: &'r TypeDescriptor,
        kind: AttributeKind,
    ) -> Option<&'r Attribute> {
        let mut current = Some(descriptor);
        while let Some(desc) = current {
            if let Some(attr) = desc.own_attributes().iter().find(|a| a.kind() == kind) {
                return Some(attr);
            }
            current = desc.supertype().and_then(|name| self.types.get(name));
        }
        None
    }

    pub fn identifier_attribute<'r>(
        &'r self,
        descriptor: &'r TypeDescriptor,
    ) -> Option<&'r Attribute> {
        self.attribute_of_kind(descriptor, AttributeKind::Identifier)
    }

    pub fn types_attribute<'r>(&'r self, descriptor: &'r TypeDescriptor) -> Option<&'r Attribute> {
        self.attribute_of_kind(descriptor, AttributeKind::Types)
    }

    pub fn bag_attribute<'r>(&'r self, descriptor: &'r TypeDescriptor) -> Option<&'r Attribute> {
        self.attribute_of_kind(descriptor, AttributeKind::PropertyBag)
    }

    /// Declared type IRIs of a descriptor: its own, then its ancestors'.
    pub fn declared_type_iris(&self, descriptor: &TypeDescriptor) -> Vec<String> {
        let mut iris = Vec::new();
        let mut current = Some(descriptor);
        while let Some(desc) = current {
            if let Some(iri) = desc.type_iri() {
                if !iris.iter().any(|known| known == iri) {
                    iris.push(iri.to_string());
                }
            }
            current = desc.supertype().and_then(|name| self.types.get(name));
        }
        iris
    }
}

impl fmt::Debug for MappingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingRegistry")
            .field("types", &self.types.len())
            .finish()
    }
}

/// A value crossing the object seam, in either direction.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    /// A reference to another mapped instance.
    Entity(Entity),
    /// The value of a multi-valued attribute.
    Collection(Vec<Value>),
    /// The value of a property-bag attribute: edge IRI to value, in
    /// registration order.
    Bag(Vec<(String, Value)>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            // Entities compare by identity, consistent with the engine's own
            // notion of instance equality.
            (Value::Entity(a), Value::Entity(b)) => Entity::ptr_eq(a, b),
            (Value::Collection(a), Value::Collection(b)) => a == b,
            (Value::Bag(a), Value::Bag(b)) => a == b,
            _ => false,
        }
    }
}

/// The object seam: what a host type must expose for the engine to read and
/// populate it. Implementations are usually generated by whatever external
/// step also produces the [`MappingRegistry`].
pub trait LdInstance: Any {
    /// Name of this instance's type descriptor in the registry.
    fn type_name(&self) -> &str;

    /// Read an attribute slot. Unknown slots read as [`Value::Null`].
    fn get(&self, slot: &str) -> Value;

    /// Assign an attribute slot.
    fn set(&mut self, slot: &str, value: Value) -> Result<(), Error>;

    /// Append to a multi-valued attribute slot.
    fn push(&mut self, slot: &str, value: Value) -> Result<(), Error>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Shared handle to a mapped instance.
///
/// Cloning the handle clones the reference, not the instance; every clone
/// observes the same underlying object. This is what lets a deserialized
/// graph share sub-instances the way the source graph did.
#[derive(Clone)]
pub struct Entity(Rc<RefCell<dyn LdInstance>>);

impl Entity {
    pub fn new<T: LdInstance>(instance: T) -> Self {
        Entity(Rc::new(RefCell::new(instance)))
    }

    /// Stable address of the underlying instance for the lifetime of the
    /// handle; the identity-map key.
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// Identity comparison: do both handles point at the same instance?
    pub fn ptr_eq(a: &Entity, b: &Entity) -> bool {
        std::ptr::eq(
            Rc::as_ptr(&a.0) as *const (),
            Rc::as_ptr(&b.0) as *const (),
        )
    }

    pub fn borrow(&self) -> Ref<'_, dyn LdInstance> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, dyn LdInstance> {
        self.0.borrow_mut()
    }

    /// Borrow the concrete host type behind the handle, if it is a `T`.
    pub fn borrow_as<T: Any>(&self) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.0.borrow(), |instance| {
            instance.as_any().downcast_ref::<T>()
        })
        .ok()
    }

    pub fn type_name(&self) -> String {
        self.0.borrow().type_name().to_string()
    }

    pub fn get(&self, slot: &str) -> Value {
        self.0.borrow().get(slot)
    }

    pub fn set(&self, slot: &str, value: Value) -> Result<(), Error> {
        self.0.borrow_mut().set(slot, value)
    }

    pub fn push(&self, slot: &str, value: Value) -> Result<(), Error> {
        self.0.borrow_mut().push(slot, value)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The instance may be mutably borrowed by the very call that is
        // formatting this entity for an error message.
        match self.0.try_borrow() {
            Ok(instance) => write!(f, "Entity<{}@{:#x}>", instance.type_name(), self.addr()),
            Err(_) => write!(f, "Entity<in use@{:#x}>", self.addr()),
        }
    }
}
