//! In-memory brain; contents are lost on exit.

use std::collections::HashMap;

use async_trait::async_trait;
use botgate_core::{Brain, RepoResult};
use serde_json::Value;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryBrain {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryBrain {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }
}

#[async_trait]
impl Brain for MemoryBrain {
    async fn get(&self, key: &str) -> RepoResult<Option<Value>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> RepoResult<()> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }
}
