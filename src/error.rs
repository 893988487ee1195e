//! Error type shared by the serialization and deserialization paths.
//!
//! Every variant is unrecoverable for the call that raised it: the engine
//! never retries internally and never returns partial results. The only
//! sanctioned relaxations live elsewhere (the ignore-unknown-properties
//! switch and the assumed-type stub pass) and are configuration, not error
//! recovery.

use std::fmt;

/// Error raised by the mapping engine.
#[derive(Debug)]
pub enum Error {
    /// A context scope was asked to register a second, different mapping for
    /// an already-mapped term.
    TermConflict {
        term: String,
        existing: String,
        attempted: String,
    },
    /// Polymorphic resolution found two or more incomparable candidate types
    /// for a node's type-identifier set.
    AmbiguousTargetType {
        type_iris: Vec<String>,
        candidates: Vec<String>,
    },
    /// Polymorphic resolution found no compatible candidate type.
    NoMatchingTargetType {
        expected: String,
        type_iris: Vec<String>,
    },
    /// A serialized instance has neither declared nor runtime type IRIs.
    MissingTypeInfo { type_name: String },
    /// A serialized instance lacks a required identifier.
    MissingIdentifier { type_name: String },
    /// A document edge has no mapped attribute slot and the ignore-unknown
    /// policy is off.
    UnknownProperty { edge: String, type_name: String },
    /// Identifiers referenced in the document were never matched to a full
    /// node object and could not be stubbed.
    UnresolvedReferences { ids: Vec<String> },
    /// A resolved reference's type is incompatible with the attribute slot it
    /// is being assigned to.
    TargetTypeMismatch {
        id: String,
        actual: String,
        expected: String,
    },
    /// The input is not a well-formed expanded document, or a value node has
    /// an unrecognized shape.
    MalformedInput { msg: String },
    /// The mapping registry holds no descriptor for the requested type name.
    UnknownType { name: String },
    /// Error from the underlying JSON reader or writer.
    Json { cause: serde_json::Error },
    /// Free-form error, mostly raised by host `LdInstance` implementations.
    Message { msg: String },
}

impl Error {
    /// Construct a free-form `Message` error.
    pub fn msg<S: Into<String>>(s: S) -> Self {
        Error::Message { msg: s.into() }
    }

    #[cold]
    #[inline(never)]
    pub(crate) fn malformed<S: Into<String>>(s: S) -> Self {
        Error::MalformedInput { msg: s.into() }
    }

    #[cold]
    #[inline(never)]
    pub(crate) fn unknown_type<S: Into<String>>(name: S) -> Self {
        Error::UnknownType { name: name.into() }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TermConflict {
                term,
                existing,
                attempted,
            } => write!(
                f,
                "term '{term}' is already mapped to {existing}, cannot remap it to {attempted}"
            ),
            Error::AmbiguousTargetType {
                type_iris,
                candidates,
            } => write!(
                f,
                "type identifiers {type_iris:?} match multiple incomparable target types: {}",
                candidates.join(", ")
            ),
            Error::NoMatchingTargetType {
                expected,
                type_iris,
            } => write!(
                f,
                "no candidate target class assignable to '{expected}' matches the type identifiers {type_iris:?}"
            ),
            Error::MissingTypeInfo { type_name } => write!(
                f,
                "instance of '{type_name}' carries no type identifiers, neither declared nor runtime"
            ),
            Error::MissingIdentifier { type_name } => {
                write!(f, "instance of '{type_name}' lacks a required identifier")
            }
            Error::UnknownProperty { edge, type_name } => write!(
                f,
                "no attribute of '{type_name}' is mapped to property '{edge}'"
            ),
            Error::UnresolvedReferences { ids } => write!(
                f,
                "referenced nodes were never materialized: {}",
                ids.join(", ")
            ),
            Error::TargetTypeMismatch {
                id,
                actual,
                expected,
            } => write!(
                f,
                "node '{id}' resolved to '{actual}', which is not assignable to a slot of type '{expected}'"
            ),
            Error::MalformedInput { msg } => write!(f, "malformed input: {msg}"),
            Error::UnknownType { name } => {
                write!(f, "no type descriptor registered under the name '{name}'")
            }
            Error::Json { cause } => write!(f, "{cause}"),
            Error::Message { msg } => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json { cause } => Some(cause),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(cause: serde_json::Error) -> Self {
        Error::Json { cause }
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Message { msg }
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Message {
            msg: msg.to_string(),
        }
    }
}
