//! Deserializer configuration.
//!
//! Options are resolved before a call begins and read-only during it; the
//! engine snapshots what it needs and never consults them again mid-walk.

use serde::{Deserialize, Serialize};

/// What to do with a document property no mapped attribute claims.
///
/// A type carrying a property-bag attribute absorbs unmapped properties
/// regardless of this policy; the policy only applies when there is nowhere
/// at all to put the value.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownPropertyPolicy {
    /// Skip the property and keep going.
    Ignore,
    /// Fail the call with an unknown-property error.
    Fail,
}

/// Deserializer options.
///
/// Construct via the [`options!`](crate::options!) macro so fields can be
/// added without breaking call sites:
///
/// ```rust
/// use jsonld_bind::UnknownPropertyPolicy;
///
/// let options = jsonld_bind::options! {
///     unknown_properties: UnknownPropertyPolicy::Ignore,
///     assume_target_type: true,
/// };
/// assert!(options.assume_target_type);
/// ```
#[non_exhaustive]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Options {
    /// Policy for document properties without a mapped attribute slot.
    /// Default: [`UnknownPropertyPolicy::Fail`].
    pub unknown_properties: UnknownPropertyPolicy,
    /// When true, identifiers that are referenced but never defined get a
    /// best-effort stub instance of the referencing slot's declared type,
    /// with only the identifier populated, before the strict unresolved
    /// check runs. Default: false.
    pub assume_target_type: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            unknown_properties: UnknownPropertyPolicy::Fail,
            assume_target_type: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict() {
        let options = Options::default();
        assert_eq!(options.unknown_properties, UnknownPropertyPolicy::Fail);
        assert!(!options.assume_target_type);
    }

    #[test]
    fn options_macro_equals_field_assignment() {
        let via_macro = crate::options! {
            unknown_properties: UnknownPropertyPolicy::Ignore,
        };
        let mut by_hand = Options::default();
        by_hand.unknown_properties = UnknownPropertyPolicy::Ignore;
        assert_eq!(via_macro.unknown_properties, by_hand.unknown_properties);
        assert_eq!(via_macro.assume_target_type, by_hand.assume_target_type);
    }
}
