//! Dependency graph for formula cells.
//!
//! Tracks, for every formula cell, the cells it reads (precedents) and, for
//! every referenced cell, the formula cells that read it (dependents). The
//! dependents direction drives cache invalidation and the pre-commit cycle
//! check; evaluation itself never walks the graph.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::position::Position;

/// Bidirectional adjacency over cell positions.
///
/// # Invariants
///
/// 1. **Bidirectional consistency:** if A is in `preds[B]` then B is in
///    `succs[A]`, and vice versa.
/// 2. **No dangling entries:** empty sets are removed, not stored.
/// 3. **No duplicate edges:** set semantics enforced by `FxHashSet`.
/// 4. **Atomic updates:** `replace_edges` is the only mutator that touches
///    both maps.
/// 5. **Acyclic:** callers gate every commit on `would_create_cycle`, so
///    the stored graph never contains a cycle.
#[derive(Default, Debug, Clone)]
pub struct DepGraph {
    /// For each formula cell, the cells its expression reads.
    preds: FxHashMap<Position, FxHashSet<Position>>,

    /// For each referenced cell, the formula cells that read it.
    succs: FxHashMap<Position, FxHashSet<Position>>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cells this formula cell reads (its outgoing references).
    pub fn precedents(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.preds
            .get(&cell)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// The formula cells that read this cell (its incoming references).
    pub fn dependents(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.succs
            .get(&cell)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// True iff at least one formula currently reads this cell.
    pub fn is_referenced(&self, cell: Position) -> bool {
        self.succs.contains_key(&cell)
    }

    /// Number of formula cells with at least one outgoing reference.
    pub fn formula_cell_count(&self) -> usize {
        self.preds.len()
    }

    /// Number of cells read by at least one formula.
    pub fn referenced_cell_count(&self) -> usize {
        self.succs.len()
    }

    /// Would giving `cell` the outgoing references `new_preds` close a cycle
    /// through the committed graph?
    ///
    /// Walks `cell` together with every cell that currently depends on it,
    /// directly or transitively (the dependents closure); the edit is a cycle
    /// iff one of the candidate references lands inside that closure. Cost is
    /// linear in the closure, not the sheet.
    pub fn would_create_cycle(
        &self,
        cell: Position,
        new_preds: &FxHashSet<Position>,
    ) -> bool {
        if new_preds.is_empty() {
            return false;
        }
        let mut visited: FxHashSet<Position> = FxHashSet::default();
        let mut stack = vec![cell];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if new_preds.contains(&current) {
                return true;
            }
            stack.extend(self.dependents(current));
        }
        false
    }

    /// Replace all outgoing references of `cell` atomically.
    ///
    /// Removes `cell` from its old precedents' dependent sets, then installs
    /// the new edges symmetrically. Pass an empty set to detach the cell.
    pub fn replace_edges(&mut self, cell: Position, new_preds: FxHashSet<Position>) {
        if let Some(old_preds) = self.preds.remove(&cell) {
            for pred in old_preds {
                if let Some(deps) = self.succs.get_mut(&pred) {
                    deps.remove(&cell);
                    if deps.is_empty() {
                        self.succs.remove(&pred);
                    }
                }
            }
        }

        if new_preds.is_empty() {
            return;
        }

        for pred in &new_preds {
            self.succs.entry(*pred).or_default().insert(cell);
        }
        self.preds.insert(cell, new_preds);
    }

    /// Detach all outgoing references of `cell` (content no longer a formula).
    pub fn clear_cell(&mut self, cell: Position) {
        self.replace_edges(cell, FxHashSet::default());
    }
}
