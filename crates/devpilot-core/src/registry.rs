//! The tool registry: catalog entries paired with their adapters.

use std::sync::Arc;

use devpilot_contracts::tool::ToolSpec;

use crate::traits::ToolAdapter;

/// Shown in progress logs for tools registered without a description.
pub const DESCRIPTION_PLACEHOLDER: &str = "Tool ";

/// One registered tool.
#[derive(Clone)]
pub struct RegisteredTool {
    pub spec: ToolSpec,
    pub adapter: Arc<dyn ToolAdapter>,
}

/// Name-indexed tool table. Registration order is the order tools are
/// presented to the model.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` under `spec.name`, replacing any previous entry of
    /// the same name in place.
    pub fn register(&mut self, spec: ToolSpec, adapter: Arc<dyn ToolAdapter>) {
        let entry = RegisteredTool { spec, adapter };
        match self.tools.iter_mut().find(|t| t.spec.name == entry.spec.name) {
            Some(existing) => *existing = entry,
            None => self.tools.push(entry),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|t| t.spec.name == name)
    }

    pub fn spec(&self, name: &str) -> Option<&ToolSpec> {
        self.get(name).map(|t| &t.spec)
    }

    /// All catalog entries, in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec.clone()).collect()
    }

    /// The description shown in progress logs for `name`.
    pub fn description(&self, name: &str) -> &str {
        self.spec(name)
            .map(|s| s.description.as_str())
            .filter(|d| !d.is_empty())
            .unwrap_or(DESCRIPTION_PLACEHOLDER)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.spec.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use devpilot_contracts::message::Arguments;

    use super::*;

    struct Echo(&'static str);

    #[async_trait]
    impl ToolAdapter for Echo {
        async fn invoke(&self, _arguments: &Arguments) -> String {
            self.0.to_string()
        }
    }

    #[tokio::test]
    async fn register_replaces_same_name_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolSpec::new("git_exec", "Execute git commands"), Arc::new(Echo("v1")));
        registry.register(ToolSpec::new("helm_exec", "Execute Helm commands"), Arc::new(Echo("helm")));
        registry.register(ToolSpec::new("git_exec", "Execute git commands"), Arc::new(Echo("v2")));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["git_exec", "helm_exec"]);

        let tool = registry.get("git_exec").unwrap();
        assert_eq!(tool.adapter.invoke(&Arguments::new()).await, "v2");
    }

    #[test]
    fn description_falls_back_to_placeholder() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolSpec::new("bq_exec", ""), Arc::new(Echo("")));

        assert_eq!(registry.description("bq_exec"), DESCRIPTION_PLACEHOLDER);
        assert_eq!(registry.description("missing"), DESCRIPTION_PLACEHOLDER);
    }
}
