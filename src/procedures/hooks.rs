//! Named script hooks
//!
//! Procedures refer to hooks by name. The registry on the world maps names to
//! closures; a name with no registered closure behaves as if no hook were
//! configured.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::check::Outcome;
use crate::entity::Character;
use crate::procedures::target::ResolvedTarget;
use crate::procedures::Procedure;

/// What a hook gets to look at
pub struct HookContext<'a> {
    pub procedure: &'a Procedure,
    pub surgeon: &'a Character,
    pub patient: &'a Character,
    pub target: &'a ResolvedTarget,
    /// 1-based phase number, `None` outside a phase
    pub phase: Option<usize>,
    pub outcome: Outcome,
}

pub type PredicateHook = Arc<dyn Fn(&HookContext) -> bool + Send + Sync>;
pub type TextHook = Arc<dyn Fn(&HookContext) -> String + Send + Sync>;
pub type EffectHook = Arc<dyn Fn(&HookContext) + Send + Sync>;

/// Hook names a procedure is configured with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcedureHooks {
    /// Predicate: may this procedure be used at all right now
    pub usability: Option<String>,
    /// Text: explanation when the usability predicate says no
    pub why_cannot: Option<String>,
    /// Effect: after completion consequences
    pub completion: Option<String>,
    /// Effect: after interruption consequences, narrated or silent
    pub abort: Option<String>,
}

#[derive(Default, Clone)]
pub struct HookRegistry {
    predicates: AHashMap<String, PredicateHook>,
    texts: AHashMap<String, TextHook>,
    effects: AHashMap<String, EffectHook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_predicate(
        &mut self,
        name: impl Into<String>,
        hook: impl Fn(&HookContext) -> bool + Send + Sync + 'static,
    ) {
        self.predicates.insert(name.into(), Arc::new(hook));
    }

    pub fn register_text(
        &mut self,
        name: impl Into<String>,
        hook: impl Fn(&HookContext) -> String + Send + Sync + 'static,
    ) {
        self.texts.insert(name.into(), Arc::new(hook));
    }

    pub fn register_effect(
        &mut self,
        name: impl Into<String>,
        hook: impl Fn(&HookContext) + Send + Sync + 'static,
    ) {
        self.effects.insert(name.into(), Arc::new(hook));
    }

    /// `None` when the name is not registered
    pub fn test(&self, name: &str, ctx: &HookContext) -> Option<bool> {
        match self.predicates.get(name) {
            Some(hook) => Some(hook(ctx)),
            None => {
                tracing::warn!("Predicate hook '{}' is not registered", name);
                None
            }
        }
    }

    pub fn text(&self, name: &str, ctx: &HookContext) -> Option<String> {
        match self.texts.get(name) {
            Some(hook) => Some(hook(ctx)),
            None => {
                tracing::warn!("Text hook '{}' is not registered", name);
                None
            }
        }
    }

    /// Returns false when the name is not registered
    pub fn fire(&self, name: &str, ctx: &HookContext) -> bool {
        match self.effects.get(name) {
            Some(hook) => {
                hook(ctx);
                true
            }
            None => {
                tracing::warn!("Effect hook '{}' is not registered", name);
                false
            }
        }
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("predicates", &self.predicates.keys().collect::<Vec<_>>())
            .field("texts", &self.texts.keys().collect::<Vec<_>>())
            .field("effects", &self.effects.keys().collect::<Vec<_>>())
            .finish()
    }
}
