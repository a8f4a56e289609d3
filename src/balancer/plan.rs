//! Acceptance and outgoing planning passes.
//!
//! Both passes read only the frozen input grid and write private per-cell,
//! per-direction slots, so cells are independent within a pass. Large grids
//! run chunked in parallel; chunk outputs land in disjoint slices of the
//! table, so results are identical to the serial pass.

use rayon::prelude::*;

use super::average::{settle, Side};
use super::grid::Grid;
use super::topology::{CellIdx, NeighborTable};

/// Cells per parallel work chunk.
pub(crate) const CELL_CHUNK: usize = 256;

/// Per-cell transfer amounts, indexed by `Direction`.
pub(crate) type DirAmounts = [i64; 4];

#[inline]
fn neighbor_workloads(values: &[i64], neighbors: &[Option<CellIdx>; 4]) -> [Option<i64>; 4] {
    let mut out = [None; 4];
    for (slot, neighbor) in out.iter_mut().zip(neighbors) {
        *slot = neighbor.map(|n| values[n.index()]);
    }
    out
}

/// How much this cell will accept from each heavier neighbor.
///
/// The settled-average gap above the cell's own workload is split among the
/// qualifying neighbors proportionally to their workload, truncating. A zero
/// qualifying-workload sum leaves every direction at zero; it cannot occur
/// with a positive gap under nonnegative inputs, but it must not divide.
fn acceptance_for_cell(values: &[i64], idx: usize, neighbors: &[Option<CellIdx>; 4]) -> DirAmounts {
    let own = values[idx];
    let workloads = neighbor_workloads(values, neighbors);
    let (average, qualifies) = settle(own, &workloads, Side::Heavier);
    let amount = average - own;

    let mut qualifying_total = 0i64;
    for (dir, workload) in workloads.iter().enumerate() {
        if qualifies[dir] {
            qualifying_total += workload.unwrap_or(0);
        }
    }

    let mut out = [0i64; 4];
    if amount > 0 && qualifying_total > 0 {
        for (dir, workload) in workloads.iter().enumerate() {
            if qualifies[dir] {
                let share =
                    amount as i128 * workload.unwrap_or(0) as i128 / qualifying_total as i128;
                out[dir] = share as i64;
            }
        }
    }
    out
}

/// How much this cell wants to send toward each lighter neighbor.
///
/// Unlike acceptance there is no split: every qualifying direction gets the
/// full gap between the settled average and that neighbor's workload. When
/// the refinement threshold oscillates on near-uniform small workloads, a
/// qualifying neighbor can sit above the final average; such a gap is not a
/// sendable amount and is clamped to zero.
fn offers_for_cell(values: &[i64], idx: usize, neighbors: &[Option<CellIdx>; 4]) -> DirAmounts {
    let own = values[idx];
    let workloads = neighbor_workloads(values, neighbors);
    let (average, qualifies) = settle(own, &workloads, Side::Lighter);

    let mut out = [0i64; 4];
    for (dir, workload) in workloads.iter().enumerate() {
        if qualifies[dir] {
            out[dir] = (average - workload.unwrap_or(0)).max(0);
        }
    }
    out
}

fn table_serial(
    grid: &Grid,
    neighbors: &NeighborTable,
    per_cell: fn(&[i64], usize, &[Option<CellIdx>; 4]) -> DirAmounts,
) -> Vec<DirAmounts> {
    let values = grid.values();
    let mut out = vec![[0i64; 4]; grid.len()];
    for (idx, slot) in out.iter_mut().enumerate() {
        *slot = per_cell(values, idx, neighbors.get(idx));
    }
    out
}

fn table_parallel(
    grid: &Grid,
    neighbors: &NeighborTable,
    per_cell: fn(&[i64], usize, &[Option<CellIdx>; 4]) -> DirAmounts,
) -> Vec<DirAmounts> {
    let values = grid.values();
    let mut out = vec![[0i64; 4]; grid.len()];
    out.par_chunks_mut(CELL_CHUNK)
        .zip(neighbors.slots().par_chunks(CELL_CHUNK))
        .enumerate()
        .for_each(|(chunk_index, (slots, neighbor_slots))| {
            let base = chunk_index * CELL_CHUNK;
            for (offset, (slot, cell_neighbors)) in
                slots.iter_mut().zip(neighbor_slots).enumerate()
            {
                *slot = per_cell(values, base + offset, cell_neighbors);
            }
        });
    out
}

pub(crate) fn acceptance_pass(
    grid: &Grid,
    neighbors: &NeighborTable,
    parallel: bool,
) -> Vec<DirAmounts> {
    if parallel {
        table_parallel(grid, neighbors, acceptance_for_cell)
    } else {
        table_serial(grid, neighbors, acceptance_for_cell)
    }
}

pub(crate) fn offer_pass(
    grid: &Grid,
    neighbors: &NeighborTable,
    parallel: bool,
) -> Vec<DirAmounts> {
    if parallel {
        table_parallel(grid, neighbors, offers_for_cell)
    } else {
        table_serial(grid, neighbors, offers_for_cell)
    }
}

/// Per-cell acceptance amounts toward each direction, computed serially.
///
/// One `[i64; 4]` per cell, indexed by [`Direction`](super::Direction); entry
/// `d` is how much the cell will accept from the neighbor on side `d`.
pub fn acceptance_table(grid: &Grid) -> Vec<DirAmounts> {
    let neighbors = NeighborTable::build(grid.width(), grid.height());
    table_serial(grid, &neighbors, acceptance_for_cell)
}

/// Per-cell offered outgoing amounts toward each direction, computed serially.
pub fn offer_table(grid: &Grid) -> Vec<DirAmounts> {
    let neighbors = NeighborTable::build(grid.width(), grid.height());
    table_serial(grid, &neighbors, offers_for_cell)
}
