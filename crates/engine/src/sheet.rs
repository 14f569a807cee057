//! The sheet: sparse ragged cell storage, the dependency graph, and the
//! printable bounding box.
//!
//! All edits go through `set_cell`/`clear_cell`, which keep three structures
//! consistent: the grid itself, the reference graph (always acyclic, checked
//! before any commit), and the per-cell value memos (invalidated along the
//! dependents closure of every edit).

use std::io::{self, Write};

use rustc_hash::FxHashSet;

use crate::cell::{Cell, Content};
use crate::dep_graph::DepGraph;
use crate::error::SheetError;
use crate::formula::{CellReader, ExprEngine, FormulaEngine};
use crate::position::{Position, Size};
use crate::value::Value;

pub struct Sheet {
    /// Ragged rows: each row's allocated length is independent, and growth
    /// never shrinks a row. A `None` slot reads the same as an unallocated
    /// one.
    rows: Vec<Vec<Option<Cell>>>,
    /// Cached printable bounding box. Extended in O(1) on every set, fully
    /// recomputed only when a boundary cell is cleared, so it can overshoot
    /// between a non-boundary clear and the next rescan.
    printable: Size,
    graph: DepGraph,
    engine: Box<dyn FormulaEngine>,
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new()
    }
}

impl Sheet {
    /// A sheet wired to the built-in arithmetic formula engine.
    pub fn new() -> Self {
        Self::with_engine(Box::new(ExprEngine))
    }

    /// A sheet with a caller-supplied formula engine.
    pub fn with_engine(engine: Box<dyn FormulaEngine>) -> Self {
        Self {
            rows: Vec::new(),
            printable: Size::default(),
            graph: DepGraph::new(),
            engine,
        }
    }

    /// Set the cell at `pos` from raw input text.
    ///
    /// Fails with `InvalidPosition`, `Parse` or `CircularDependency`, in
    /// that order, and a failed call mutates nothing: the cell's prior
    /// content, the graph and the printable box all stay authoritative.
    /// Empty input is a clear.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), SheetError> {
        self.check(pos)?;
        if text.is_empty() {
            self.clear_at(pos);
            return Ok(());
        }

        let content = Content::from_input(text, self.engine.as_ref())?;
        let new_refs: FxHashSet<Position> =
            content.referenced_cells().iter().copied().collect();
        if self.graph.would_create_cycle(pos, &new_refs) {
            return Err(SheetError::CircularDependency(pos));
        }

        // Committed: nothing below can fail.
        for &target in content.referenced_cells() {
            // Referenced-but-unset cells materialize as empty placeholders
            // so the back-edge has a cell to resolve to.
            self.ensure_cell(target);
        }
        self.ensure_cell(pos).commit(content);
        self.graph.replace_edges(pos, new_refs);
        self.invalidate_from(pos);
        self.extend_printable(pos);
        Ok(())
    }

    /// Clear the cell at `pos`. Idempotent; never creates.
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), SheetError> {
        self.check(pos)?;
        self.clear_at(pos);
        Ok(())
    }

    /// The cell at `pos`, if one exists. Never creates.
    pub fn cell(&self, pos: Position) -> Result<Option<&Cell>, SheetError> {
        self.check(pos)?;
        Ok(self.slot(pos))
    }

    /// Evaluated value at `pos`; `Value::Empty` where no cell exists.
    pub fn value(&self, pos: Position) -> Result<Value, SheetError> {
        self.check(pos)?;
        Ok(match self.slot(pos) {
            Some(cell) => cell.value(self),
            None => Value::Empty,
        })
    }

    /// Input-equivalent text at `pos`; empty where no cell exists.
    pub fn text(&self, pos: Position) -> Result<String, SheetError> {
        self.check(pos)?;
        Ok(self.slot(pos).map(Cell::text).unwrap_or_default())
    }

    pub fn printable_size(&self) -> Size {
        self.printable
    }

    /// The reference graph, for diagnostics.
    pub fn graph(&self) -> &DepGraph {
        &self.graph
    }

    /// Write the evaluated values of the printable area, tab-separated,
    /// one newline-terminated line per row.
    pub fn print_values<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |cell, sheet| cell.value(sheet).to_string())
    }

    /// Write the input-equivalent texts of the printable area in the same
    /// layout as `print_values`.
    pub fn print_texts<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |cell, _| cell.text())
    }

    fn print_with<W, F>(&self, out: &mut W, render: F) -> io::Result<()>
    where
        W: Write,
        F: Fn(&Cell, &Sheet) -> String,
    {
        for row in 0..self.printable.rows {
            for col in 0..self.printable.cols {
                if col > 0 {
                    out.write_all(b"\t")?;
                }
                if let Some(cell) = self.slot_index(row, col) {
                    out.write_all(render(cell, self).as_bytes())?;
                }
            }
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn check(&self, pos: Position) -> Result<(), SheetError> {
        if pos.is_valid() {
            Ok(())
        } else {
            Err(SheetError::InvalidPosition(pos))
        }
    }

    /// Storage lookup without validation. Out-of-range within an allocated
    /// row behaves exactly like an unallocated slot.
    fn slot(&self, pos: Position) -> Option<&Cell> {
        if !pos.is_valid() {
            return None;
        }
        self.slot_index(pos.row as usize, pos.col as usize)
    }

    fn slot_index(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row)?.get(col)?.as_ref()
    }

    /// Get-or-create the cell at a valid position, growing the grid as
    /// needed. Growth is ragged: only the target row's allocation changes.
    fn ensure_cell(&mut self, pos: Position) -> &mut Cell {
        let (row, col) = (pos.row as usize, pos.col as usize);
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize_with(col + 1, || None);
        }
        cells[col].get_or_insert_with(Cell::new)
    }

    /// Clear semantics shared by `clear_cell` and empty-text `set_cell`:
    /// empty the content, detach its outgoing edges, invalidate dependents,
    /// drop the cell from storage once nothing references it, and rescan the
    /// printable box if the position sat on its boundary.
    fn clear_at(&mut self, pos: Position) {
        if self.slot(pos).is_some() {
            let (row, col) = (pos.row as usize, pos.col as usize);
            if let Some(cell) = self.rows[row][col].as_mut() {
                cell.commit(Content::Empty);
            }
            self.graph.clear_cell(pos);
            self.invalidate_from(pos);
            if !self.graph.is_referenced(pos) {
                self.rows[row][col] = None;
            }
        }
        let on_boundary = pos.row as usize + 1 == self.printable.rows
            || pos.col as usize + 1 == self.printable.cols;
        if on_boundary {
            self.printable = self.rescan_printable();
        }
    }

    /// Reverse-graph worklist from an edited cell. The origin is always
    /// force-invalidated; every other visited cell is invalidated and
    /// explored further only if its cache was still valid, so the traversal
    /// stays proportional to the affected subgraph.
    fn invalidate_from(&self, origin: Position) {
        if let Some(cell) = self.slot(origin) {
            cell.invalidate();
        }
        let mut stack: Vec<Position> = self.graph.dependents(origin).collect();
        while let Some(pos) = stack.pop() {
            let Some(cell) = self.slot(pos) else { continue };
            if cell.is_cache_valid() {
                cell.invalidate();
                stack.extend(self.graph.dependents(pos));
            }
        }
    }

    fn extend_printable(&mut self, pos: Position) {
        let rows = pos.row as usize + 1;
        let cols = pos.col as usize + 1;
        if rows > self.printable.rows {
            self.printable.rows = rows;
        }
        if cols > self.printable.cols {
            self.printable.cols = cols;
        }
    }

    /// Tightest box around every cell with non-empty text. Scans each row
    /// from its highest allocated column downward; runs only on
    /// boundary-shrinking clears.
    fn rescan_printable(&self) -> Size {
        let mut size = Size::default();
        for (row, cells) in self.rows.iter().enumerate() {
            for col in (0..cells.len()).rev() {
                if let Some(cell) = cells[col].as_ref() {
                    if !cell.text().is_empty() {
                        size.rows = size.rows.max(row + 1);
                        size.cols = size.cols.max(col + 1);
                        break;
                    }
                }
            }
        }
        size
    }
}

impl CellReader for Sheet {
    fn value_at(&self, pos: Position) -> Value {
        match self.slot(pos) {
            Some(cell) => cell.value(self),
            None => Value::Empty,
        }
    }
}
