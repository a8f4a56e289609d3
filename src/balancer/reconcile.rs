//! Flow reconciliation: bounding, applying, and reporting transfers.
//!
//! The applied flow on a directed link is the sender's offer capped by the
//! receiver's acceptance in the reverse direction. Applying flows is a
//! scatter-add into neighbor cells, so the parallel path never mutates the
//! balanced grid concurrently: it computes per-cell bound quadruples in
//! parallel, then a single serial reduction applies them in index order.
//! Output is therefore byte-identical to the serial path.

use rayon::prelude::*;

use super::average::trunc_div;
use super::grid::Grid;
use super::plan::{DirAmounts, CELL_CHUNK};
use super::topology::{CellIdx, Direction, NeighborTable};

/// How far an edge segment reaches from the cell center toward the neighbor,
/// as a fraction of one cell.
const EDGE_REACH: f64 = 0.65;

/// A directed segment from a cell toward one of its neighbors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlowEdge {
    pub x_start: f64,
    pub y_start: f64,
    pub x_end: f64,
    pub y_end: f64,
}

impl FlowEdge {
    fn toward(x: usize, y: usize, dir: Direction) -> Self {
        let (dx, dy) = dir.offset();
        Self {
            x_start: x as f64,
            y_start: y as f64,
            x_end: x as f64 + dx as f64 * EDGE_REACH,
            y_end: y as f64 + dy as f64 * EDGE_REACH,
        }
    }
}

/// Everything one balancing pass hands back to the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct BalanceOutcome {
    /// Input grid with every bounded flow applied.
    pub balanced: Grid,
    /// Truncated neighborhood mean of the input grid, as a smoothing
    /// diagnostic independent of the transfers.
    pub convolved: Grid,
    /// Links on which the pointed-at neighbor accepts workload from the
    /// start cell.
    pub incoming_eligible: Vec<FlowEdge>,
    /// Links on which a positive flow was actually applied.
    pub outgoing_applied: Vec<FlowEdge>,
}

/// Applied flow out of `idx` in each direction.
#[inline]
fn bounds_for_cell(
    idx: usize,
    neighbors: &[Option<CellIdx>; 4],
    acceptance: &[DirAmounts],
    offers: &[DirAmounts],
) -> DirAmounts {
    let mut out = [0i64; 4];
    for dir in Direction::ALL {
        if let Some(n) = neighbors[dir.index()] {
            out[dir.index()] = offers[idx][dir.index()]
                .min(acceptance[n.index()][dir.opposite().index()]);
        }
    }
    out
}

/// Truncated mean of a cell and its existing neighbors.
#[inline]
fn convolved_for_cell(values: &[i64], idx: usize, neighbors: &[Option<CellIdx>; 4]) -> i64 {
    let mut sum = values[idx];
    let mut count = 1;
    for neighbor in neighbors.iter().flatten() {
        sum += values[neighbor.index()];
        count += 1;
    }
    trunc_div(sum, count)
}

#[inline]
fn edges_for_cell(
    idx: usize,
    width: usize,
    neighbors: &[Option<CellIdx>; 4],
    acceptance: &[DirAmounts],
    bounds: &DirAmounts,
    incoming: &mut Vec<FlowEdge>,
    outgoing: &mut Vec<FlowEdge>,
) {
    let x = idx % width;
    let y = idx / width;
    for dir in Direction::ALL {
        if let Some(n) = neighbors[dir.index()] {
            if acceptance[n.index()][dir.opposite().index()] > 0 {
                incoming.push(FlowEdge::toward(x, y, dir));
            }
        }
        if bounds[dir.index()] > 0 {
            outgoing.push(FlowEdge::toward(x, y, dir));
        }
    }
}

/// Apply per-cell bounds to a copy of the input values.
///
/// Every unit subtracted from a sender lands in exactly one receiver, so the
/// grid total is preserved exactly.
fn apply_bounds(values: &[i64], neighbors: &NeighborTable, bounds: &[DirAmounts]) -> Vec<i64> {
    let mut balanced = values.to_vec();
    for (idx, cell_bounds) in bounds.iter().enumerate() {
        let mut sent = 0i64;
        for dir in Direction::ALL {
            let amount = cell_bounds[dir.index()];
            if let Some(n) = neighbors.get(idx)[dir.index()] {
                balanced[n.index()] += amount;
            }
            sent += amount;
        }
        balanced[idx] -= sent;
    }
    balanced
}

pub(crate) fn reconcile(
    grid: &Grid,
    neighbors: &NeighborTable,
    acceptance: &[DirAmounts],
    offers: &[DirAmounts],
    parallel: bool,
) -> BalanceOutcome {
    let values = grid.values();
    let width = grid.width();
    let len = grid.len();

    let mut convolved = vec![0i64; len];
    let mut bounds = vec![[0i64; 4]; len];
    let mut incoming = Vec::new();
    let mut outgoing = Vec::new();

    if parallel {
        bounds
            .par_chunks_mut(CELL_CHUNK)
            .zip(convolved.par_chunks_mut(CELL_CHUNK))
            .enumerate()
            .for_each(|(chunk_index, (bound_slots, convolved_slots))| {
                let base = chunk_index * CELL_CHUNK;
                for (offset, (bound, smoothed)) in
                    bound_slots.iter_mut().zip(convolved_slots).enumerate()
                {
                    let idx = base + offset;
                    let cell_neighbors = neighbors.get(idx);
                    *bound = bounds_for_cell(idx, cell_neighbors, acceptance, offers);
                    *smoothed = convolved_for_cell(values, idx, cell_neighbors);
                }
            });

        // Edge lists stay ordered: chunk results are collected in chunk
        // order and merged serially.
        let chunked: Vec<(Vec<FlowEdge>, Vec<FlowEdge>)> = bounds
            .par_chunks(CELL_CHUNK)
            .enumerate()
            .map(|(chunk_index, bound_slots)| {
                let base = chunk_index * CELL_CHUNK;
                let mut incoming = Vec::new();
                let mut outgoing = Vec::new();
                for (offset, cell_bounds) in bound_slots.iter().enumerate() {
                    let idx = base + offset;
                    edges_for_cell(
                        idx,
                        width,
                        neighbors.get(idx),
                        acceptance,
                        cell_bounds,
                        &mut incoming,
                        &mut outgoing,
                    );
                }
                (incoming, outgoing)
            })
            .collect();
        for (chunk_incoming, chunk_outgoing) in chunked {
            incoming.extend(chunk_incoming);
            outgoing.extend(chunk_outgoing);
        }
    } else {
        for idx in 0..len {
            let cell_neighbors = neighbors.get(idx);
            bounds[idx] = bounds_for_cell(idx, cell_neighbors, acceptance, offers);
            convolved[idx] = convolved_for_cell(values, idx, cell_neighbors);
            edges_for_cell(
                idx,
                width,
                cell_neighbors,
                acceptance,
                &bounds[idx],
                &mut incoming,
                &mut outgoing,
            );
        }
    }

    let balanced = apply_bounds(values, neighbors, &bounds);

    BalanceOutcome {
        balanced: Grid::from_validated(width, grid.height(), balanced),
        convolved: Grid::from_validated(width, grid.height(), convolved),
        incoming_eligible: incoming,
        outgoing_applied: outgoing,
    }
}
