//! Bidirectional mapping between JSON-LD documents and typed Rust object
//! graphs.
//!
//! Host types expose themselves through the [`LdInstance`] seam and describe
//! their mapping (attribute slot to edge IRI, type name to type IRI) in an
//! immutable [`MappingRegistry`] assembled once at load time. From there the
//! engine does the rest in both directions:
//!
//! - [`to_value`] / [`to_string`] walk the object graph, detect shared and
//!   cyclic references by instance identity, and produce either a compacted
//!   document with an embedded `@context` or a pure expanded-form document.
//! - [`from_value`] / [`from_str`] consume an expanded-form document, pick
//!   concrete target types for polymorphic nodes, and reconcile references
//!   to nodes that have not been materialized yet, so the deserialized graph
//!   shares sub-instances exactly the way the document does.
//!
//! ```rust
//! use std::any::Any;
//! use jsonld_bind::{
//!     Attribute, ContextPolicy, Entity, Error, LdInstance, MappingRegistry,
//!     TypeDescriptor, Value,
//! };
//!
//! #[derive(Default)]
//! struct City {
//!     uri: Option<String>,
//!     name: Option<String>,
//! }
//!
//! impl LdInstance for City {
//!     fn type_name(&self) -> &str { "City" }
//!     fn get(&self, slot: &str) -> Value {
//!         match slot {
//!             "uri" => self.uri.clone().map_or(Value::Null, Value::String),
//!             "name" => self.name.clone().map_or(Value::Null, Value::String),
//!             _ => Value::Null,
//!         }
//!     }
//!     fn set(&mut self, slot: &str, value: Value) -> Result<(), Error> {
//!         match (slot, value) {
//!             ("uri", Value::String(s)) => self.uri = Some(s),
//!             ("name", Value::String(s)) => self.name = Some(s),
//!             (slot, _) => return Err(Error::msg(format!("no slot '{slot}'"))),
//!         }
//!         Ok(())
//!     }
//!     fn push(&mut self, slot: &str, _value: Value) -> Result<(), Error> {
//!         Err(Error::msg(format!("slot '{slot}' is not multi-valued")))
//!     }
//!     fn as_any(&self) -> &dyn Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn Any { self }
//! }
//!
//! let registry = MappingRegistry::from_types([
//!     TypeDescriptor::new("City", "http://example.org/City")
//!         .attribute(Attribute::identifier("uri"))
//!         .attribute(Attribute::data("name", "http://example.org/name"))
//!         .factory(|| Entity::new(City::default())),
//! ])?;
//!
//! let prague = Entity::new(City {
//!     uri: Some("urn:prague".into()),
//!     name: Some("Prague".into()),
//! });
//! let expanded = jsonld_bind::to_value_with_options(
//!     &prague,
//!     &registry,
//!     jsonld_bind::ser_options! { context: ContextPolicy::Expanded },
//! )?;
//! let back = jsonld_bind::from_value(expanded, &registry, "City")?;
//! let city = back.borrow_as::<City>().unwrap();
//! assert_eq!(city.name.as_deref(), Some("Prague"));
//! # Ok::<(), jsonld_bind::Error>(())
//! ```
//!
//! Reading and writing JSON text is `serde_json`'s business; mapping
//! metadata discovery and per-datatype literal codecs are external
//! collaborators behind the [`MappingRegistry`] and
//! [`literals::LiteralCodec`] seams.

pub use de::{
    from_slice, from_slice_with_options, from_str, from_str_with_options, from_value,
    from_value_with_options,
};
pub use error::Error;
pub use mapping::{
    Attribute, AttributeKind, Cardinality, Entity, LdInstance, MappingRegistry, TypeDescriptor,
    Value,
};
pub use options::{Options, UnknownPropertyPolicy};
pub use ser::{to_string, to_string_with_options, to_value, to_value_with_options};
pub use serializer_options::{ContextPolicy, SerializerOptions};

pub mod context;
pub mod de;
pub mod error;
pub mod instance_builder;
pub mod keywords;
pub mod literals;
mod macros;
pub mod mapping;
pub mod nodes;
pub mod options;
pub mod pending;
pub mod resolver;
pub mod ser;
pub mod serializer_options;
pub mod traverser;
