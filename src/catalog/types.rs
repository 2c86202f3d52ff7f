//! Type definitions for the task catalog.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw file layout: a list of `[[tasks]]` tables.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFile {
    pub tasks: Vec<Task>,
}

/// One checklist item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique key used in reports and API routes (e.g., "bed")
    pub id: String,
    /// Display label
    pub label: String,
    /// 1-based rank; defines display and serialization order
    pub order: u32,
    /// Points awarded when the task passes
    pub weight: u32,
    /// Guidance shown next to the task
    pub advice: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog has no tasks")]
    Empty,

    #[error("duplicate task id '{0}'")]
    DuplicateId(String),

    #[error("duplicate order {0}")]
    DuplicateOrder(u32),

    #[error("task '{0}' has order 0 (orders are 1-based)")]
    ZeroOrder(String),

    #[error("task '{0}' must have a positive weight")]
    ZeroWeight(String),

    #[error("task id must not be blank")]
    BlankId,
}

/// Validated, order-sorted list of tasks.
#[derive(Debug, Clone)]
pub struct TaskCatalog {
    tasks: Vec<Task>,
}

impl TaskCatalog {
    /// Validate and sort the given tasks.
    ///
    /// Ids must be unique and non-blank, orders must be unique and 1-based,
    /// weights must be positive.
    pub fn new(mut tasks: Vec<Task>) -> Result<Self, CatalogError> {
        if tasks.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut ids = HashSet::new();
        let mut orders = HashSet::new();
        for task in &tasks {
            if task.id.trim().is_empty() {
                return Err(CatalogError::BlankId);
            }
            if !ids.insert(task.id.as_str()) {
                return Err(CatalogError::DuplicateId(task.id.clone()));
            }
            if task.order == 0 {
                return Err(CatalogError::ZeroOrder(task.id.clone()));
            }
            if !orders.insert(task.order) {
                return Err(CatalogError::DuplicateOrder(task.order));
            }
            if task.weight == 0 {
                return Err(CatalogError::ZeroWeight(task.id.clone()));
            }
        }

        tasks.sort_by_key(|t| t.order);
        Ok(Self { tasks })
    }

    /// Tasks in catalog order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Highest possible total score (every task passed).
    pub fn max_score(&self) -> u32 {
        self.tasks.iter().map(|t| t.weight).sum()
    }
}
