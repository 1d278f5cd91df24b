use crate::traits::Action;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tars_core::{ActionDispatcher, ActionError, ActionInput, ActionSpec};
use tracing::debug;

/// Named actions, and the dispatcher that routes requests to them.
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    pub fn register(&mut self, action: Arc<dyn Action>) {
        self.actions.insert(action.name().to_string(), action);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Specs of every registered action, sorted by name.
    pub fn specs(&self) -> Vec<ActionSpec> {
        self.names()
            .iter()
            .filter_map(|name| self.actions.get(name))
            .map(|action| action.spec())
            .collect()
    }

    /// Specs for `names`, in the order given. Fails on the first unknown name.
    pub fn select(&self, names: &[String]) -> Result<Vec<ActionSpec>, ActionError> {
        names
            .iter()
            .map(|name| {
                self.actions
                    .get(name)
                    .map(|action| action.spec())
                    .ok_or_else(|| ActionError::UnknownAction(name.clone()))
            })
            .collect()
    }

    /// A registry holding only `names`. Fails on the first unknown name.
    pub fn restrict(&self, names: &[String]) -> Result<ActionRegistry, ActionError> {
        let mut restricted = ActionRegistry::new();
        for name in names {
            let action = self
                .get(name)
                .ok_or_else(|| ActionError::UnknownAction(name.clone()))?;
            restricted.register(action);
        }
        Ok(restricted)
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionDispatcher for ActionRegistry {
    async fn dispatch(&self, name: &str, input: &ActionInput) -> Result<String, ActionError> {
        let action = self
            .get(name)
            .ok_or_else(|| ActionError::UnknownAction(name.to_string()))?;
        debug!("executing action {}", name);
        action.execute(input).await
    }
}
