//! JSON-LD keywords used by the mapper.
//!
//! Only the subset of the keyword table that the engine actually reads or
//! writes is listed here. Everything else a conforming document may contain
//! is either out of scope (see crate docs) or rejected as malformed input.

/// Node identifier keyword.
pub const ID: &str = "@id";
/// Type-set keyword. In expanded form it maps to an array of IRI strings.
pub const TYPE: &str = "@type";
/// Literal value keyword inside a value object.
pub const VALUE: &str = "@value";
/// Language tag keyword inside a value object.
pub const LANGUAGE: &str = "@language";
/// Container keyword inside a term descriptor.
pub const CONTAINER: &str = "@container";
/// "No language / no index" keyword.
pub const NONE: &str = "@none";
/// Context block keyword.
pub const CONTEXT: &str = "@context";
/// Named-graph keyword.
pub const GRAPH: &str = "@graph";
/// Ordered-list wrapper keyword.
pub const LIST: &str = "@list";

/// Returns true for keys the engine treats as keywords rather than edges.
pub(crate) fn is_keyword(key: &str) -> bool {
    matches!(
        key,
        ID | TYPE | VALUE | LANGUAGE | CONTAINER | NONE | CONTEXT | GRAPH | LIST
    )
}
