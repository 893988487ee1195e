//! Target class resolution for polymorphic nodes.
//!
//! Given the type declared for a slot (or for the whole call) and the type
//! IRIs found on a document node, pick the concrete type to instantiate. Ties
//! between incomparable candidates are a hard failure, never broken by
//! declaration order; a wrong silent pick would be far worse than an error
//! naming the tie.

use crate::error::Error;
use crate::mapping::{MappingRegistry, TypeDescriptor};

/// Resolve the concrete target type for a node.
///
/// Candidates are every type registered under any of `type_iris`, filtered to
/// subtypes of `expected` when one is declared. Two fallbacks apply:
///
/// - No IRI in `type_iris` is registered at all, but `expected` itself
///   declares one of them: `expected` is used unchanged.
/// - `type_iris` is empty and `expected` is declared: the node is assumed to
///   be a plain `expected`.
///
/// Among the surviving candidates the unique most specific one wins, where
/// most specific means not a proper ancestor of any other candidate.
pub fn resolve<'r>(
    registry: &'r MappingRegistry,
    expected: Option<&'r TypeDescriptor>,
    type_iris: &[String],
) -> Result<&'r TypeDescriptor, Error> {
    if type_iris.is_empty() {
        return expected.ok_or_else(|| Error::NoMatchingTargetType {
            expected: "<unconstrained>".to_string(),
            type_iris: Vec::new(),
        });
    }

    let mut candidates: Vec<&TypeDescriptor> = Vec::new();
    for iri in type_iris {
        for candidate in registry.candidates_for(iri) {
            if candidates.iter().any(|c| c.name() == candidate.name()) {
                continue;
            }
            let assignable = expected
                .is_none_or(|exp| registry.is_subtype_of(candidate.name(), exp.name()));
            if assignable {
                candidates.push(candidate);
            }
        }
    }

    if candidates.is_empty() {
        if let Some(expected) = expected {
            let none_registered = !type_iris.iter().any(|iri| registry.is_registered_iri(iri));
            let declares_one = expected
                .type_iri()
                .is_some_and(|iri| type_iris.iter().any(|given| given == iri));
            if none_registered && declares_one {
                return Ok(expected);
            }
        }
        return Err(Error::NoMatchingTargetType {
            expected: expected.map_or("<unconstrained>", TypeDescriptor::name).to_string(),
            type_iris: type_iris.to_vec(),
        });
    }

    // Drop every candidate that is a proper ancestor of another one.
    let most_specific: Vec<&TypeDescriptor> = candidates
        .iter()
        .copied()
        .filter(|candidate| {
            !candidates.iter().any(|other| {
                other.name() != candidate.name()
                    && registry.is_subtype_of(other.name(), candidate.name())
            })
        })
        .collect();

    match most_specific.as_slice() {
        [single] => Ok(*single),
        // Unreachable for the acyclic hierarchies the registry enforces, but
        // a total function beats a panic.
        [] => Err(Error::NoMatchingTargetType {
            expected: expected.map_or("<unconstrained>", TypeDescriptor::name).to_string(),
            type_iris: type_iris.to_vec(),
        }),
        tied => Err(Error::AmbiguousTargetType {
            type_iris: type_iris.to_vec(),
            candidates: tied.iter().map(|c| c.name().to_string()).collect(),
        }),
    }
}
