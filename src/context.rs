//! Context builder: the term to edge-IRI mapping table emitted as `@context`.
//!
//! Scopes form a chain addressed by [`ScopeId`] handles into one arena owned
//! by the [`Context`]. Lookups delegate from a scope to its parent; what a
//! write does depends on the scope kind:
//!
//! - **Embedded** scopes own a term table. A write lands in the scope itself
//!   unless an ancestor already owns the identical mapping (then it is a
//!   no-op) or a conflicting one (then it fails).
//! - **Write-through** scopes own nothing and forward every write to their
//!   parent. They exist so that terms registered while a free-form property
//!   bag is being processed land in the nearest real object scope instead of
//!   a throwaway one.
//! - The **dummy** root answers every lookup empty and swallows every write.
//!   It is the whole-context mode used when no context is being built at all,
//!   e.g. for pure expanded-form output.
//!
//! Within one scope chain a term maps to at most one distinct value. The
//! engine supports no context scoping beyond simple parent delegation, so a
//! conflicting re-registration cannot be shadowed away and fails instead.

use crate::error::Error;
use crate::keywords;
use crate::nodes::{JsonNode, NodeKind};

/// Handle to one scope in a [`Context`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScopeId(usize);

#[derive(Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Embedded,
    WriteThrough,
    Dummy,
}

struct Scope {
    kind: ScopeKind,
    parent: Option<ScopeId>,
    // Contexts hold tens of terms at most; a vector keeps registration order
    // for rendering and makes reverse lookup a plain scan.
    terms: Vec<(String, JsonNode)>,
}

/// Arena of term-mapping scopes built during one serialization call.
pub struct Context {
    scopes: Vec<Scope>,
}

impl Context {
    /// A context that records term mappings, rooted in an embedded scope.
    pub fn compacting() -> Self {
        Context {
            scopes: vec![Scope {
                kind: ScopeKind::Embedded,
                parent: None,
                terms: Vec::new(),
            }],
        }
    }

    /// A context that records nothing, rooted in the dummy scope.
    pub fn expanded() -> Self {
        Context {
            scopes: vec![Scope {
                kind: ScopeKind::Dummy,
                parent: None,
                terms: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    fn is_dummy(&self, scope: ScopeId) -> bool {
        self.scopes[scope.0].kind == ScopeKind::Dummy
    }

    /// Open an embedded child scope. Under a dummy root the parent itself is
    /// returned; a recording scope must never hang off a non-recording chain.
    pub fn child_embedded(&mut self, parent: ScopeId) -> ScopeId {
        if self.is_dummy(parent) {
            return parent;
        }
        self.scopes.push(Scope {
            kind: ScopeKind::Embedded,
            parent: Some(parent),
            terms: Vec::new(),
        });
        ScopeId(self.scopes.len() - 1)
    }

    /// Open a write-through child scope. Under a dummy root the parent itself
    /// is returned.
    pub fn child_write_through(&mut self, parent: ScopeId) -> ScopeId {
        if self.is_dummy(parent) {
            return parent;
        }
        self.scopes.push(Scope {
            kind: ScopeKind::WriteThrough,
            parent: Some(parent),
            terms: Vec::new(),
        });
        ScopeId(self.scopes.len() - 1)
    }

    /// Register `term -> iri` as a plain identifier mapping.
    pub fn register_term(
        &mut self,
        scope: ScopeId,
        term: &str,
        iri: impl Into<String>,
    ) -> Result<(), Error> {
        self.register_term_node(scope, term, JsonNode::string_literal(None, iri.into()))
    }

    /// Register a term with a full mapping descriptor, e.g.
    /// `{"@id": iri, "@container": "@list"}`.
    ///
    /// Registering the identical mapping again is a no-op; registering a
    /// different mapping for an existing term fails with a term conflict.
    pub fn register_term_node(
        &mut self,
        scope: ScopeId,
        term: &str,
        mapping: JsonNode,
    ) -> Result<(), Error> {
        let target = self.write_target(scope);
        if self.is_dummy(target) {
            return Ok(());
        }
        if let Some(existing) = self.lookup(target, term) {
            if *existing == mapping {
                return Ok(());
            }
            return Err(Error::TermConflict {
                term: term.to_string(),
                existing: render(existing),
                attempted: render(&mapping),
            });
        }
        self.scopes[target.0].terms.push((term.to_string(), mapping));
        Ok(())
    }

    // A write through a write-through scope lands in the nearest ancestor
    // that owns a table.
    fn write_target(&self, scope: ScopeId) -> ScopeId {
        let mut current = scope;
        while self.scopes[current.0].kind == ScopeKind::WriteThrough {
            match self.scopes[current.0].parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// Look a term up in this scope, delegating to ancestors on a miss.
    pub fn lookup(&self, scope: ScopeId, term: &str) -> Option<&JsonNode> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let data = &self.scopes[id.0];
            if let Some((_, mapping)) = data.terms.iter().find(|(t, _)| t == term) {
                return Some(mapping);
            }
            current = data.parent;
        }
        None
    }

    /// Reverse lookup: the term mapped to `iri`, scanning this scope's own
    /// mappings before delegating to the parent.
    pub fn term_for(&self, scope: ScopeId, iri: &str) -> Option<&str> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let data = &self.scopes[id.0];
            for (term, mapping) in &data.terms {
                if mapping_iri(mapping) == Some(iri) {
                    return Some(term);
                }
            }
            current = data.parent;
        }
        None
    }

    /// True when the scope owns no mappings of its own.
    pub fn is_empty(&self, scope: ScopeId) -> bool {
        self.scopes[scope.0].terms.is_empty()
    }

    /// Render the scope's own mappings as an object node named `@context`,
    /// ready to embed into the output.
    pub fn to_node(&self, scope: ScopeId) -> JsonNode {
        let children = self.scopes[scope.0]
            .terms
            .iter()
            .map(|(term, mapping)| mapping.clone().into_named(Some(term.clone())))
            .collect();
        JsonNode::object(Some(keywords::CONTEXT.to_string()), children)
    }
}

/// The IRI a mapping denotes: the literal itself for plain mappings, the
/// `@id` child for descriptor objects.
fn mapping_iri(mapping: &JsonNode) -> Option<&str> {
    match mapping.kind() {
        NodeKind::Literal {
            value: crate::nodes::LiteralValue::String(s),
            ..
        } => Some(s),
        NodeKind::Object(_) => mapping
            .children()
            .iter()
            .find(|child| child.name() == Some(keywords::ID))
            .and_then(|child| match child.kind() {
                NodeKind::Literal {
                    value: crate::nodes::LiteralValue::String(s),
                    ..
                } => Some(s.as_str()),
                _ => None,
            }),
        _ => None,
    }
}

fn render(node: &JsonNode) -> String {
    node.write().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_reregistration_is_a_no_op() {
        let mut ctx = Context::compacting();
        let root = ctx.root();
        ctx.register_term(root, "name", "http://xmlns.com/foaf/0.1/name")
            .unwrap();
        ctx.register_term(root, "name", "http://xmlns.com/foaf/0.1/name")
            .unwrap();
        assert_eq!(
            ctx.to_node(root).write(),
            json!({"name": "http://xmlns.com/foaf/0.1/name"})
        );
    }

    #[test]
    fn conflicting_registration_fails() {
        let mut ctx = Context::compacting();
        let root = ctx.root();
        ctx.register_term(root, "name", "http://xmlns.com/foaf/0.1/name")
            .unwrap();
        let err = ctx
            .register_term(root, "name", "http://schema.org/name")
            .unwrap_err();
        assert!(matches!(err, Error::TermConflict { term, .. } if term == "name"));
    }

    #[test]
    fn child_delegates_lookup_and_owns_new_terms() {
        let mut ctx = Context::compacting();
        let root = ctx.root();
        ctx.register_term(root, "name", "http://xmlns.com/foaf/0.1/name")
            .unwrap();
        let child = ctx.child_embedded(root);
        assert!(ctx.lookup(child, "name").is_some());

        ctx.register_term(child, "age", "http://xmlns.com/foaf/0.1/age")
            .unwrap();
        assert!(!ctx.is_empty(root));
        assert!(ctx.lookup(root, "age").is_none());
        assert!(ctx.lookup(child, "age").is_some());
    }

    #[test]
    fn child_does_not_duplicate_parent_terms() {
        let mut ctx = Context::compacting();
        let root = ctx.root();
        ctx.register_term(root, "name", "http://xmlns.com/foaf/0.1/name")
            .unwrap();
        let child = ctx.child_embedded(root);
        ctx.register_term(child, "name", "http://xmlns.com/foaf/0.1/name")
            .unwrap();
        assert!(ctx.is_empty(child));
    }

    #[test]
    fn child_cannot_shadow_parent_mapping() {
        let mut ctx = Context::compacting();
        let root = ctx.root();
        ctx.register_term(root, "name", "http://xmlns.com/foaf/0.1/name")
            .unwrap();
        let child = ctx.child_embedded(root);
        let err = ctx
            .register_term(child, "name", "http://schema.org/name")
            .unwrap_err();
        assert!(matches!(err, Error::TermConflict { .. }));
    }

    #[test]
    fn write_through_scope_writes_into_parent() {
        let mut ctx = Context::compacting();
        let root = ctx.root();
        let bag = ctx.child_write_through(root);
        ctx.register_term(bag, "note", "http://example.org/note")
            .unwrap();
        assert!(ctx.is_empty(bag));
        assert!(ctx.lookup(root, "note").is_some());
    }

    #[test]
    fn write_through_chain_lands_in_nearest_owning_scope() {
        let mut ctx = Context::compacting();
        let root = ctx.root();
        let object = ctx.child_embedded(root);
        let outer = ctx.child_write_through(object);
        let inner = ctx.child_write_through(outer);
        ctx.register_term(inner, "note", "http://example.org/note")
            .unwrap();
        assert!(ctx.lookup(object, "note").is_some());
        assert!(ctx.lookup(root, "note").is_none());
    }

    #[test]
    fn dummy_context_swallows_everything() {
        let mut ctx = Context::expanded();
        let root = ctx.root();
        ctx.register_term(root, "name", "http://xmlns.com/foaf/0.1/name")
            .unwrap();
        // A second, conflicting registration is also fine: nothing is stored.
        ctx.register_term(root, "name", "http://schema.org/name")
            .unwrap();
        assert!(ctx.lookup(root, "name").is_none());
        assert!(ctx.is_empty(root));
        assert_eq!(ctx.child_embedded(root), root);
    }

    #[test]
    fn reverse_lookup_sees_descriptor_mappings() {
        let mut ctx = Context::compacting();
        let root = ctx.root();
        let descriptor = JsonNode::object(
            None,
            vec![
                JsonNode::string_literal(Some("@id".into()), "http://example.org/memberList"),
                JsonNode::string_literal(Some("@container".into()), "@list"),
            ],
        );
        ctx.register_term_node(root, "memberList", descriptor).unwrap();
        assert_eq!(ctx.term_for(root, "http://example.org/memberList"), Some("memberList"));
        assert_eq!(ctx.term_for(root, "http://example.org/other"), None);
    }

    #[test]
    fn context_renders_descriptors_and_plain_terms() {
        let mut ctx = Context::compacting();
        let root = ctx.root();
        ctx.register_term(root, "name", "http://xmlns.com/foaf/0.1/name")
            .unwrap();
        let descriptor = JsonNode::object(
            None,
            vec![
                JsonNode::string_literal(Some("@id".into()), "http://example.org/memberList"),
                JsonNode::string_literal(Some("@container".into()), "@list"),
            ],
        );
        ctx.register_term_node(root, "memberList", descriptor).unwrap();
        assert_eq!(
            ctx.to_node(root).write(),
            json!({
                "name": "http://xmlns.com/foaf/0.1/name",
                "memberList": {"@id": "http://example.org/memberList", "@container": "@list"}
            })
        );
    }
}
