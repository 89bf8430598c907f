//! Role hierarchy graph
//!
//! Edges point from a role to its subordinate roles. Construction runs
//! Kahn's algorithm so a cyclic hierarchy never makes it into a catalog;
//! traversals still carry a visited set.

use crate::error::{AuthzError, Result};
use crate::types::RoleId;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Parent -> children graph of role ids
#[derive(Debug, Clone, Default)]
pub struct RoleHierarchy {
    /// Role -> subordinate roles
    children: BTreeMap<RoleId, Vec<RoleId>>,

    /// Role -> roles it is directly subordinate to
    parents: HashMap<RoleId, Vec<RoleId>>,
}

impl RoleHierarchy {
    /// Build a hierarchy, rejecting cycles
    pub fn new(children: BTreeMap<RoleId, Vec<RoleId>>) -> Result<Self> {
        let hierarchy = Self::build(children);
        hierarchy.check_acyclic()?;
        Ok(hierarchy)
    }

    /// Build without the acyclicity check (fixtures only)
    #[cfg(test)]
    pub(crate) fn new_unchecked(children: BTreeMap<RoleId, Vec<RoleId>>) -> Self {
        Self::build(children)
    }

    fn build(children: BTreeMap<RoleId, Vec<RoleId>>) -> Self {
        let mut parents: HashMap<RoleId, Vec<RoleId>> = HashMap::new();
        for (parent, subordinates) in &children {
            for child in subordinates {
                let entry = parents.entry(child.clone()).or_default();
                if !entry.contains(parent) {
                    entry.push(parent.clone());
                }
            }
        }

        Self { children, parents }
    }

    /// Kahn's algorithm over every role mentioned in the graph
    ///
    /// Roles that never reach in-degree 0 sit on (or behind) a cycle and are
    /// reported in the error.
    fn check_acyclic(&self) -> Result<()> {
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        for (parent, subordinates) in &self.children {
            in_degree.entry(parent.as_str()).or_insert(0);
            for child in subordinates {
                *in_degree.entry(child.as_str()).or_insert(0) += 1;
            }
        }

        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(role, _)| *role)
            .collect();

        let mut visited = 0;
        while let Some(current) = queue.pop_front() {
            visited += 1;
            for child in self.children(current) {
                if let Some(degree) = in_degree.get_mut(child.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(child.as_str());
                    }
                }
            }
        }

        if visited != in_degree.len() {
            let cycle: Vec<String> = in_degree
                .into_iter()
                .filter(|(_, degree)| *degree > 0)
                .map(|(role, _)| role.to_string())
                .collect();
            return Err(AuthzError::CircularHierarchy { cycle });
        }

        Ok(())
    }

    /// Direct subordinates of a role
    pub fn children(&self, role_id: &str) -> &[RoleId] {
        self.children.get(role_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The full parent -> children map
    pub fn as_map(&self) -> &BTreeMap<RoleId, Vec<RoleId>> {
        &self.children
    }

    /// True iff `parent_id` is reachable upward from `child_id`
    /// (a role inherits from itself)
    pub fn inherits_from(&self, child_id: &str, parent_id: &str) -> bool {
        if child_id == parent_id {
            return true;
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([child_id]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            for parent in self.parents.get(current).into_iter().flatten() {
                if parent == parent_id {
                    return true;
                }
                queue.push_back(parent.as_str());
            }
        }

        false
    }

    /// Every role reachable downward from `role_id`, sorted, excluding itself
    pub fn subordinates(&self, role_id: &str) -> Vec<RoleId> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = self.children(role_id).iter().map(String::as_str).collect();

        while let Some(current) = queue.pop_front() {
            if current == role_id || !visited.insert(current) {
                continue;
            }
            queue.extend(self.children(current).iter().map(String::as_str));
        }

        let mut result: Vec<RoleId> = visited.into_iter().map(str::to_string).collect();
        result.sort();
        result
    }
}
