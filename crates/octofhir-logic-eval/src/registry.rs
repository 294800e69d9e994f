//! Token to rule bindings.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::rule::Rule;

/// Registered rules, looked up by token during evaluation.
#[derive(Default, Clone)]
pub struct RuleRegistry {
    rules: IndexMap<String, Arc<dyn Rule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `token` to `rule`, replacing any previous binding.
    pub fn register(&mut self, token: impl Into<String>, rule: Arc<dyn Rule>) {
        self.rules.insert(token.into(), rule);
    }

    /// Rule bound to `token`, if any.
    pub fn get(&self, token: &str) -> Option<Arc<dyn Rule>> {
        self.rules.get(token).cloned()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.rules.contains_key(token)
    }

    /// Registered tokens in registration order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("tokens", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}
