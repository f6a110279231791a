//! Location hierarchy resolution.
//!
//! Locations form a forest through their `parent_id` links. [`LocationTree`]
//! holds a snapshot of the location table as an arena keyed by id plus a
//! parent-to-children index, and answers path and subtree questions by
//! iterative traversal. Every walk keeps a visited set, so a cycle written
//! to the table out-of-band cannot hang a report.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::warn;

use crate::error::{EntityKind, Error, Result};
use crate::model::{Location, LocationId};
use crate::store::RecordStore;

/// Separator used when rendering a location path.
pub const PATH_SEPARATOR: &str = " > ";

/// An indexed snapshot of the location forest.
#[derive(Debug, Clone, Default)]
pub struct LocationTree {
    nodes: HashMap<LocationId, Location>,
    children: HashMap<LocationId, Vec<LocationId>>,
    roots: Vec<LocationId>,
}

impl LocationTree {
    /// Build the tree from a set of locations.
    ///
    /// A parent id that does not resolve to a known location is treated as
    /// a root.
    #[must_use]
    pub fn new(locations: impl IntoIterator<Item = Location>) -> Self {
        let nodes: HashMap<LocationId, Location> =
            locations.into_iter().map(|loc| (loc.id, loc)).collect();

        let mut children: HashMap<LocationId, Vec<LocationId>> = HashMap::new();
        let mut roots = Vec::new();
        for loc in nodes.values() {
            match loc.parent_id.filter(|p| nodes.contains_key(p)) {
                Some(parent) => children.entry(parent).or_default().push(loc.id),
                None => roots.push(loc.id),
            }
        }

        let by_name = |a: &LocationId, b: &LocationId| {
            let (la, lb) = (&nodes[a], &nodes[b]);
            la.location_name
                .cmp(&lb.location_name)
                .then_with(|| la.id.cmp(&lb.id))
        };
        for list in children.values_mut() {
            list.sort_by(by_name);
        }
        roots.sort_by(by_name);

        Self {
            nodes,
            children,
            roots,
        }
    }

    /// Load every location from a record store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub fn load<S: RecordStore + ?Sized>(store: &S) -> Result<Self> {
        Ok(Self::new(store.locations()?))
    }

    /// Number of locations in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no locations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a location.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is not in the tree.
    pub fn get(&self, id: LocationId) -> Result<&Location> {
        self.nodes
            .get(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Location, id))
    }

    /// Top-level locations, ordered by name.
    #[must_use]
    pub fn roots(&self) -> Vec<&Location> {
        self.roots.iter().map(|id| &self.nodes[id]).collect()
    }

    /// Direct children of a location, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is not in the tree.
    pub fn children_of(&self, id: LocationId) -> Result<Vec<&Location>> {
        self.get(id)?;
        Ok(self
            .children
            .get(&id)
            .map(|ids| ids.iter().map(|c| &self.nodes[c]).collect())
            .unwrap_or_default())
    }

    /// Ancestors of a location, root first and immediate parent last.
    ///
    /// Empty for a root location.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is not in the tree.
    pub fn ancestors_of(&self, id: LocationId) -> Result<Vec<&Location>> {
        let start = self.get(id)?;
        let mut seen = HashSet::from([id]);
        let mut ancestors = Vec::new();

        let mut next = start.parent_id;
        while let Some(parent_id) = next {
            let Some(parent) = self.nodes.get(&parent_id) else {
                break;
            };
            if !seen.insert(parent_id) {
                warn!("Location {} has a cyclic parent chain", id);
                break;
            }
            ancestors.push(parent);
            next = parent.parent_id;
        }

        ancestors.reverse();
        Ok(ancestors)
    }

    /// Names from the root down to and including the location itself.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is not in the tree.
    pub fn full_path(&self, id: LocationId) -> Result<Vec<&str>> {
        let mut path: Vec<&str> = self
            .ancestors_of(id)?
            .into_iter()
            .map(|loc| loc.location_name.as_str())
            .collect();
        path.push(&self.nodes[&id].location_name);
        Ok(path)
    }

    /// The full path joined with `" > "`, e.g. `Canada > Ontario > Toronto`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is not in the tree.
    pub fn full_path_string(&self, id: LocationId) -> Result<String> {
        Ok(self.full_path(id)?.join(PATH_SEPARATOR))
    }

    /// Every location below `id`, at any depth, ordered by name.
    ///
    /// Never contains `id` itself.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is not in the tree.
    pub fn descendants_of(&self, id: LocationId) -> Result<Vec<&Location>> {
        self.get(id)?;
        let mut seen = HashSet::from([id]);
        let mut stack = vec![id];
        let mut found = Vec::new();

        while let Some(current) = stack.pop() {
            let Some(kids) = self.children.get(&current) else {
                continue;
            };
            for kid in kids {
                if seen.insert(*kid) {
                    found.push(&self.nodes[kid]);
                    stack.push(*kid);
                }
            }
        }

        found.sort_by(|a, b| {
            a.location_name
                .cmp(&b.location_name)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(found)
    }

    /// The location and all of its descendants, for scoping sighting queries.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is not in the tree.
    pub fn expand_to_location_set(&self, id: LocationId) -> Result<BTreeSet<LocationId>> {
        let mut set: BTreeSet<LocationId> =
            self.descendants_of(id)?.into_iter().map(|l| l.id).collect();
        set.insert(id);
        Ok(set)
    }

    /// Check that giving `id` the parent `new_parent` keeps the forest acyclic.
    ///
    /// Walks upward from the proposed parent; reaching `id` means the
    /// location would become its own ancestor.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a circular reference and `NotFound` if either
    /// location is unknown.
    pub fn check_reparent(&self, id: LocationId, new_parent: Option<LocationId>) -> Result<()> {
        self.get(id)?;
        let Some(new_parent) = new_parent else {
            return Ok(());
        };
        self.get(new_parent)?;

        let mut seen = HashSet::new();
        let mut current = Some(new_parent);
        while let Some(node) = current {
            if node == id {
                return Err(Error::validation(format!(
                    "cannot set parent of location {id} to {new_parent}: \
                     this would create a circular reference"
                )));
            }
            if !seen.insert(node) {
                break;
            }
            current = self.nodes.get(&node).and_then(|loc| loc.parent_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(id: i64, name: &str, parent: Option<i64>) -> Location {
        Location {
            id: LocationId(id),
            location_name: name.to_string(),
            parent_id: parent.map(LocationId),
        }
    }

    /// Canada > Ontario > {Toronto > High Park, Ottawa}; USA (separate root)
    fn sample_tree() -> LocationTree {
        LocationTree::new(vec![
            loc(1, "Canada", None),
            loc(2, "Ontario", Some(1)),
            loc(3, "Toronto", Some(2)),
            loc(4, "Ottawa", Some(2)),
            loc(5, "High Park", Some(3)),
            loc(6, "USA", None),
        ])
    }

    fn ids(locations: &[&Location]) -> Vec<i64> {
        locations.iter().map(|l| l.id.0).collect()
    }

    #[test]
    fn test_roots_sorted_by_name() {
        let tree = sample_tree();
        assert_eq!(ids(&tree.roots()), vec![1, 6]);
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn test_ancestors_root_first() {
        let tree = sample_tree();
        assert_eq!(ids(&tree.ancestors_of(LocationId(5)).unwrap()), vec![1, 2, 3]);
        assert!(tree.ancestors_of(LocationId(1)).unwrap().is_empty());
    }

    #[test]
    fn test_full_path_string() {
        let tree = sample_tree();
        assert_eq!(
            tree.full_path_string(LocationId(5)).unwrap(),
            "Canada > Ontario > Toronto > High Park"
        );
        assert_eq!(tree.full_path_string(LocationId(6)).unwrap(), "USA");
    }

    #[test]
    fn test_descendants_exclude_self() {
        let tree = sample_tree();
        let descendants = tree.descendants_of(LocationId(2)).unwrap();
        assert_eq!(ids(&descendants), vec![5, 4, 3]); // High Park, Ottawa, Toronto
        assert!(!descendants.iter().any(|l| l.id == LocationId(2)));
        assert!(tree.descendants_of(LocationId(6)).unwrap().is_empty());
    }

    #[test]
    fn test_expand_to_location_set() {
        let tree = sample_tree();
        let set = tree.expand_to_location_set(LocationId(3)).unwrap();
        assert_eq!(set, BTreeSet::from([LocationId(3), LocationId(5)]));
    }

    #[test]
    fn test_children_of() {
        let tree = sample_tree();
        assert_eq!(ids(&tree.children_of(LocationId(2)).unwrap()), vec![4, 3]);
        assert!(tree.children_of(LocationId(5)).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_location_is_not_found() {
        let tree = sample_tree();
        assert!(tree.get(LocationId(99)).unwrap_err().is_not_found());
        assert!(tree.ancestors_of(LocationId(99)).is_err());
        assert!(tree.descendants_of(LocationId(99)).is_err());
    }

    #[test]
    fn test_deep_chain_terminates() {
        let mut locations = vec![loc(0, "root", None)];
        for i in 1..=1000 {
            locations.push(loc(i, &format!("level {i}"), Some(i - 1)));
        }
        let tree = LocationTree::new(locations);

        assert_eq!(tree.descendants_of(LocationId(0)).unwrap().len(), 1000);
        assert_eq!(tree.ancestors_of(LocationId(1000)).unwrap().len(), 1000);
    }

    #[test]
    fn test_cycle_in_data_terminates() {
        // 1 -> 2 -> 3 -> 1, written without going through the store.
        let tree = LocationTree::new(vec![
            loc(1, "a", Some(3)),
            loc(2, "b", Some(1)),
            loc(3, "c", Some(2)),
        ]);

        let descendants = tree.descendants_of(LocationId(1)).unwrap();
        assert_eq!(descendants.len(), 2);
        assert!(!descendants.iter().any(|l| l.id == LocationId(1)));

        let ancestors = tree.ancestors_of(LocationId(1)).unwrap();
        assert_eq!(ancestors.len(), 2);
    }

    #[test]
    fn test_check_reparent_rejects_cycle() {
        // A -> B -> C
        let tree = LocationTree::new(vec![
            loc(1, "A", None),
            loc(2, "B", Some(1)),
            loc(3, "C", Some(2)),
        ]);

        let err = tree
            .check_reparent(LocationId(1), Some(LocationId(3)))
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("circular"));

        assert!(tree
            .check_reparent(LocationId(2), Some(LocationId(2)))
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_check_reparent_allows_valid_moves() {
        let tree = sample_tree();
        assert!(tree.check_reparent(LocationId(3), Some(LocationId(6))).is_ok());
        assert!(tree.check_reparent(LocationId(3), None).is_ok());
        assert!(tree.check_reparent(LocationId(6), Some(LocationId(5))).is_ok());
    }

    #[test]
    fn test_check_reparent_unknown_parent() {
        let tree = sample_tree();
        assert!(tree
            .check_reparent(LocationId(3), Some(LocationId(99)))
            .unwrap_err()
            .is_not_found());
    }
}
