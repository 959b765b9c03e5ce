// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Arc;

use relay_provider::ToolSchema;

use crate::Tool;

/// Central registry holding all available native tools.  Immutable after
/// construction; dispatch only reads.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Schemas for every registered tool, sorted by name.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .values()
            .map(|t| ToolSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Schemas restricted to a requested subset (`None` → default tools).
    pub fn schemas_for(&self, requested: Option<&[String]>) -> Vec<ToolSchema> {
        match requested {
            Some(names) => self
                .schemas()
                .into_iter()
                .filter(|s| names.iter().any(|n| n == &s.name))
                .collect(),
            None => {
                let mut schemas: Vec<ToolSchema> = self
                    .tools
                    .values()
                    .filter(|t| t.is_default())
                    .map(|t| ToolSchema {
                        name: t.name().to_string(),
                        description: t.description().to_string(),
                        parameters: t.parameters_schema(),
                    })
                    .collect();
                schemas.sort_by(|a, b| a.name.cmp(&b.name));
                schemas
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
