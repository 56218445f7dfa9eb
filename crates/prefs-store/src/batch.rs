//! Accumulated edit operations, applied as one unit on commit.

use std::collections::BTreeMap;

use prefs_types::Value;

use crate::error::{StoreError, StoreResult};

/// A single staged mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum EditOp {
    Put { key: String, value: Value },
    Remove { key: String },
    Clear,
}

/// Operations recorded by an editor, in recording order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditBatch {
    ops: Vec<EditOp>,
}

impl EditBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: Value) {
        self.ops.push(EditOp::Put {
            key: key.into(),
            value,
        });
    }

    pub fn remove(&mut self, key: impl Into<String>) {
        self.ops.push(EditOp::Remove { key: key.into() });
    }

    pub fn clear(&mut self) {
        self.ops.push(EditOp::Clear);
    }

    pub fn ops(&self) -> &[EditOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Reject the batch if any put carries a value that cannot be stored.
    pub fn check_storable(&self) -> StoreResult<()> {
        for op in &self.ops {
            if let EditOp::Put { key, value } = op {
                if !value.is_storable() {
                    return Err(StoreError::UnstorableValue {
                        key: key.clone(),
                        value: value.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Apply every operation to `entries` in order.
    pub fn apply_to(self, entries: &mut BTreeMap<String, Value>) {
        for op in self.ops {
            match op {
                EditOp::Put { key, value } => {
                    entries.insert(key, value);
                }
                EditOp::Remove { key } => {
                    entries.remove(&key);
                }
                EditOp::Clear => entries.clear(),
            }
        }
    }
}
