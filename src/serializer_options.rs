//! Serializer configuration.

use serde::{Deserialize, Serialize};

/// Shape of the produced document.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextPolicy {
    /// One object keyed by terms, with an embedded `@context` block. The
    /// human-facing shape.
    Compacted,
    /// A one-element array of node objects keyed by raw edge IRIs, every
    /// value wrapped in an array of value objects. No context is built at
    /// all; this is the shape the deserializer consumes.
    Expanded,
}

/// Serializer options.
///
/// Construct via the [`ser_options!`](crate::ser_options!) macro so fields
/// can be added without breaking call sites:
///
/// ```rust
/// use jsonld_bind::ContextPolicy;
///
/// let options = jsonld_bind::ser_options! {
///     context: ContextPolicy::Expanded,
///     require_identifier: true,
/// };
/// assert!(options.require_identifier);
/// ```
#[non_exhaustive]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SerializerOptions {
    /// Output shape. Default: [`ContextPolicy::Compacted`].
    pub context: ContextPolicy,
    /// When true, an instance without an identifier fails the call. When
    /// false, anonymous instances get call-scoped blank node ids (`_:b0`,
    /// `_:b1`, ...). Default: false.
    pub require_identifier: bool,
    /// Format override handed to the literal codec for temporal values. The
    /// built-in codec carries it without reinterpreting anything; richer
    /// codecs honor it.
    pub temporal_format: Option<String>,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        SerializerOptions {
            context: ContextPolicy::Compacted,
            require_identifier: false,
            temporal_format: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_is_compacted() {
        let options = SerializerOptions::default();
        assert_eq!(options.context, ContextPolicy::Compacted);
        assert!(!options.require_identifier);
        assert!(options.temporal_format.is_none());
    }
}
