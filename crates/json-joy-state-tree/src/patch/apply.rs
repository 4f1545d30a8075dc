//! Replaying JSON patches through the typed mutation API.

use json_joy_tree_path::{is_valid_index, parse_pointer};
use tracing::debug;

use super::{Patch, PatchOp};
use crate::error::TreeError;
use crate::tree::{NodeId, Payload, Store};

impl Store {
    /// Applies `patches` in order, with paths relative to `node`.
    ///
    /// Each patch goes through the same validation, interceptors and
    /// listeners as a direct mutation. Patches applied before a failing one
    /// stay applied.
    pub fn apply_patch(&mut self, node: NodeId, patches: &[Patch]) -> Result<(), TreeError> {
        for patch in patches {
            self.apply_one(node, patch)?;
        }
        Ok(())
    }

    fn apply_one(&mut self, node: NodeId, patch: &Patch) -> Result<(), TreeError> {
        debug!(node = %node, op = patch.op.as_str(), path = %patch.path, "apply patch");
        let segments = parse_pointer(&patch.path);
        let value = || {
            patch
                .value
                .clone()
                .ok_or_else(|| TreeError::Patch(format!("{} at '{}' needs a value", patch.op.as_str(), patch.path)))
        };

        let Some((last, parents)) = segments.split_last() else {
            return match patch.op {
                PatchOp::Replace => self.apply_snapshot(node, value()?),
                _ => Err(TreeError::Patch(format!(
                    "cannot {} the node the patch is applied to",
                    patch.op.as_str()
                ))),
            };
        };
        let target = self
            .descend(node, parents)
            .ok_or_else(|| TreeError::Patch(format!("no container at '{}'", patch.path)))?;

        match self.data(target)?.payload {
            Payload::Array(_) => {
                let index = match (patch.op, last.as_str()) {
                    (PatchOp::Add, "-") => None,
                    (_, key) if is_valid_index(key) => key.parse::<usize>().ok(),
                    _ => {
                        return Err(TreeError::Patch(format!(
                            "invalid array index in '{}'",
                            patch.path
                        )))
                    }
                };
                match (patch.op, index) {
                    (PatchOp::Add, None) => self.push(target, value()?).map(|_| ()),
                    (PatchOp::Add, Some(i)) => self.insert(target, i, value()?).map(|_| ()),
                    (PatchOp::Replace, Some(i)) => self.set_index(target, i, value()?),
                    (PatchOp::Remove, Some(i)) => self.remove_at(target, i).map(|_| ()),
                    (_, None) => Err(TreeError::Patch(format!(
                        "invalid array index in '{}'",
                        patch.path
                    ))),
                }
            }
            Payload::Map(_) => match patch.op {
                PatchOp::Add | PatchOp::Replace => self.map_put(target, last, value()?).map(|_| ()),
                PatchOp::Remove => match self.map_delete(target, last)? {
                    Some(_) => Ok(()),
                    None => Err(TreeError::Patch(format!("no entry at '{}'", patch.path))),
                },
            },
            Payload::Model(_) => match patch.op {
                PatchOp::Add | PatchOp::Replace => self.set_prop(target, last, value()?),
                PatchOp::Remove => {
                    // removing a property resets it to its default
                    let default = self
                        .child_type(target, last)?
                        .default_value()
                        .ok_or_else(|| {
                            TreeError::Patch(format!("required property at '{}' cannot be removed", patch.path))
                        })?;
                    self.set_prop(target, last, default)
                }
            },
            Payload::Scalar(_) => Err(TreeError::Patch(format!(
                "'{}' does not address a container child",
                patch.path
            ))),
        }
    }
}
