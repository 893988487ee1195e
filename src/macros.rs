//! Public macros for constructing option structs without struct literal
//! syntax, so the option structs can grow fields without breaking callers.

/// Construct [`crate::Options`] from `Default` and a list of field
/// assignments.
///
/// ```rust
/// use jsonld_bind::UnknownPropertyPolicy;
///
/// let options = jsonld_bind::options! {
///     unknown_properties: UnknownPropertyPolicy::Ignore,
/// };
/// ```
#[macro_export]
macro_rules! options {
    ( $( $field:ident : $value:expr ),* $(,)? ) => {{
        let mut opt = $crate::Options::default();
        $(
            opt.$field = $value;
        )*
        opt
    }};
}

/// Construct [`crate::SerializerOptions`] from `Default` and a list of field
/// assignments.
///
/// ```rust
/// use jsonld_bind::ContextPolicy;
///
/// let options = jsonld_bind::ser_options! {
///     context: ContextPolicy::Expanded,
/// };
/// ```
#[macro_export]
macro_rules! ser_options {
    ( $( $field:ident : $value:expr ),* $(,)? ) => {{
        let mut opt = $crate::SerializerOptions::default();
        $(
            opt.$field = $value;
        )*
        opt
    }};
}
