//! In-memory joint hierarchy
//!
//! Joints live in a flat table indexed by position. Each joint carries the id
//! of its bone-table entry, the id of its parent, its children in traversal
//! order and the draw calls attached to it. Position 0 is the root.
//!
//! Material and shape tables belong to the surrounding model; the hierarchy
//! only sees their sizes through [`TableBounds`].

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::bytecode::Table;
use crate::error::{Result, SceneGraphError};

/// Identity of a joint (its index in the bone table)
pub type JointId = u16;

/// Draw call: render `shape` with `material` at the joint's transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Display {
    pub material: u16,
    pub shape: u16,
}

impl Display {
    pub const fn new(material: u16, shape: u16) -> Self {
        Self { material, shape }
    }
}

/// Sizes of the externally owned tables that command indices refer to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableBounds {
    pub joints: usize,
    pub materials: usize,
    pub shapes: usize,
}

impl TableBounds {
    pub const fn new(joints: usize, materials: usize, shapes: usize) -> Self {
        Self {
            joints,
            materials,
            shapes,
        }
    }

    pub fn len(&self, table: Table) -> usize {
        match table {
            Table::Joint => self.joints,
            Table::Material => self.materials,
            Table::Shape => self.shapes,
        }
    }

    /// Validate `index` against `table`, returning it as an unsigned index.
    ///
    /// `offset` is the byte offset of the record being decoded, if any.
    pub fn check(&self, table: Table, index: i32, offset: Option<usize>) -> Result<u16> {
        let len = self.len(table);
        match u16::try_from(index) {
            Ok(value) if (value as usize) < len => Ok(value),
            _ => Err(SceneGraphError::DanglingIndex {
                offset,
                table,
                index,
                len,
            }),
        }
    }
}

/// A node of the skeleton
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Joint {
    pub id: JointId,
    #[serde(default)]
    pub parent: Option<JointId>,
    #[serde(default)]
    pub children: Vec<JointId>,
    #[serde(default)]
    pub displays: Vec<Display>,
}

impl Joint {
    pub fn new(id: JointId) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            displays: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Joint tree with per-joint draw calls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    #[serde(default)]
    joints: Vec<Joint>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unlinked joints `0..count`, each with id equal to its position.
    ///
    /// Ids are 16-bit, so `count` is capped at 65536.
    pub fn with_joints(count: usize) -> Self {
        let count = count.min(JointId::MAX as usize + 1);
        Self {
            joints: (0..count).map(|i| Joint::new(i as JointId)).collect(),
        }
    }

    pub fn from_joints(joints: Vec<Joint>) -> Self {
        Self { joints }
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Joint at table position `pos`
    pub fn joint(&self, pos: usize) -> Option<&Joint> {
        self.joints.get(pos)
    }

    pub fn joint_mut(&mut self, pos: usize) -> Option<&mut Joint> {
        self.joints.get_mut(pos)
    }

    /// The joint at position 0, if it is parentless.
    pub fn root(&self) -> Option<&Joint> {
        self.joints.first().filter(|j| j.parent.is_none())
    }

    /// Table position of the joint carrying `id`
    pub fn position_of(&self, id: JointId) -> Option<usize> {
        self.joints.iter().position(|j| j.id == id)
    }

    /// Map from joint id to table position.
    pub fn id_map(&self) -> Result<HashMap<JointId, usize>> {
        let mut map = HashMap::with_capacity(self.joints.len());
        for (pos, joint) in self.joints.iter().enumerate() {
            if map.insert(joint.id, pos).is_some() {
                return Err(SceneGraphError::DuplicateJoint { id: joint.id });
            }
        }
        Ok(map)
    }

    /// Append a joint whose id is its position, optionally linked under `parent`.
    pub fn add_joint(&mut self, parent: Option<JointId>) -> Result<JointId> {
        let id = JointId::try_from(self.joints.len()).map_err(|_| {
            SceneGraphError::IndexOverflow {
                table: Table::Joint,
                value: self.joints.len(),
            }
        })?;
        self.joints.push(Joint::new(id));
        if let Some(parent) = parent {
            self.link(parent, id)?;
        }
        Ok(id)
    }

    /// Append `child` to `parent`'s children and record the parent link.
    pub fn link(&mut self, parent: JointId, child: JointId) -> Result<()> {
        let parent_pos = self
            .position_of(parent)
            .ok_or(SceneGraphError::UnknownJoint { id: parent })?;
        let child_pos = self
            .position_of(child)
            .ok_or(SceneGraphError::UnknownJoint { id: child })?;
        self.joints[parent_pos].children.push(child);
        self.joints[child_pos].parent = Some(parent);
        Ok(())
    }

    pub fn push_display(&mut self, joint: JointId, display: Display) -> Result<()> {
        let pos = self
            .position_of(joint)
            .ok_or(SceneGraphError::UnknownJoint { id: joint })?;
        self.joints[pos].displays.push(display);
        Ok(())
    }

    /// Smallest tables that every joint id and display in the hierarchy fits.
    pub fn required_bounds(&self) -> TableBounds {
        let mut bounds = TableBounds::default();
        for joint in &self.joints {
            bounds.joints = bounds.joints.max(joint.id as usize + 1);
            for display in &joint.displays {
                bounds.materials = bounds.materials.max(display.material as usize + 1);
                bounds.shapes = bounds.shapes.max(display.shape as usize + 1);
            }
        }
        bounds
    }

    /// Walk the tree from the root, yielding `(depth, joint)` in traversal order.
    ///
    /// Children that cannot be resolved, or joints already yielded, are skipped.
    /// Use [`Hierarchy::validate`] to detect those cases.
    pub fn depth_first(&self) -> DepthFirst<'_> {
        let positions = self
            .joints
            .iter()
            .enumerate()
            .map(|(pos, j)| (j.id, pos))
            .collect();
        DepthFirst {
            hierarchy: self,
            positions,
            stack: if self.joints.is_empty() {
                Vec::new()
            } else {
                vec![(0, 0)]
            },
            visited: HashSet::new(),
        }
    }

    /// Check the tree invariants and table bounds.
    ///
    /// - position 0 exists and has no parent
    /// - ids are unique and inside the joint table
    /// - every child id resolves, records its parent, and is reached once
    /// - every joint is reachable from the root
    /// - every display references valid material and shape entries
    pub fn validate(&self, bounds: &TableBounds) -> Result<()> {
        let root = self.joints.first().ok_or(SceneGraphError::MissingRoot {
            reason: "hierarchy has no joints",
        })?;
        if root.parent.is_some() {
            return Err(SceneGraphError::MissingRoot {
                reason: "joint 0 has a parent",
            });
        }

        let positions = self.id_map()?;

        for joint in &self.joints {
            bounds.check(Table::Joint, joint.id as i32, None)?;
            for display in &joint.displays {
                bounds.check(Table::Material, display.material as i32, None)?;
                bounds.check(Table::Shape, display.shape as i32, None)?;
            }
        }

        let mut visited = HashSet::with_capacity(self.joints.len());
        let mut stack = vec![0usize];
        visited.insert(root.id);
        while let Some(pos) = stack.pop() {
            let joint = &self.joints[pos];
            for &child in &joint.children {
                let child_pos = *positions
                    .get(&child)
                    .ok_or(SceneGraphError::UnknownJoint { id: child })?;
                let child_joint = &self.joints[child_pos];
                if child_joint.parent != Some(joint.id) {
                    return Err(SceneGraphError::ParentMismatch {
                        joint: child,
                        parent: child_joint.parent,
                        expected: joint.id,
                    });
                }
                if !visited.insert(child) {
                    return Err(SceneGraphError::JointRevisited { id: child });
                }
                stack.push(child_pos);
            }
        }

        if let Some(orphan) = self.joints.iter().find(|j| !visited.contains(&j.id)) {
            return Err(SceneGraphError::Unreachable { id: orphan.id });
        }

        Ok(())
    }
}

/// Depth-first traversal, see [`Hierarchy::depth_first`]
pub struct DepthFirst<'a> {
    hierarchy: &'a Hierarchy,
    positions: HashMap<JointId, usize>,
    stack: Vec<(usize, usize)>,
    visited: HashSet<usize>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = (usize, &'a Joint);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((depth, pos)) = self.stack.pop() {
            if !self.visited.insert(pos) {
                continue;
            }
            let joint = &self.hierarchy.joints[pos];
            // Reverse so the first child is popped first
            for child in joint.children.iter().rev() {
                if let Some(&child_pos) = self.positions.get(child) {
                    self.stack.push((depth + 1, child_pos));
                }
            }
            return Some((depth, joint));
        }
        None
    }
}

/// Display list as it reads back after an encode/decode round trip.
///
/// The encoder only emits a shape command when the shape differs from the
/// previous display's, so a display that repeats its predecessor's shape is
/// folded into it, whatever its material.
pub fn canonical_displays(displays: &[Display]) -> Vec<Display> {
    let mut last_shape = None;
    displays
        .iter()
        .filter(|d| {
            let changed = last_shape != Some(d.shape);
            last_shape = Some(d.shape);
            changed
        })
        .copied()
        .collect()
}
