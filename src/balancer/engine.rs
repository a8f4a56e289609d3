//! Balancer engine: thread-pool ownership and phase dispatch.

use super::grid::Grid;
use super::plan::{acceptance_pass, offer_pass};
use super::reconcile::{reconcile, BalanceOutcome};
use super::topology::NeighborTable;

/// Default cell count below which every phase runs serially; per-cell work is
/// a handful of integer ops, so small grids lose more to pool dispatch than
/// they gain.
const PARALLEL_CELL_THRESHOLD: usize = 4_096;

#[inline]
fn auto_pool_thread_count_for_physical(physical: usize) -> usize {
    let physical = physical.max(1);
    if physical <= 8 {
        physical
    } else {
        physical.div_ceil(2).max(6)
    }
}

#[inline]
fn auto_pool_thread_count() -> usize {
    auto_pool_thread_count_for_physical(num_cpus::get_physical().max(1))
}

/// Resolve the thread count from a config, falling back to auto-detect.
fn resolve_thread_count(config: &BalancerConfig) -> usize {
    let mut threads = config.thread_count.unwrap_or_else(auto_pool_thread_count);
    if let Some(cap) = config.max_threads {
        threads = threads.min(cap);
    }
    threads.max(1)
}

/// Configuration for a balancer instance.
///
/// Use `BalancerConfig::default()` for auto-tuned defaults, or customise
/// individual knobs via the builder methods.
#[derive(Clone, Debug, Default)]
pub struct BalancerConfig {
    /// Number of threads for the compute pool.
    /// `None` means auto-detect from physical cores.
    pub thread_count: Option<usize>,
    /// Hard upper bound on threads regardless of auto-detection.
    /// `None` means no additional cap beyond `thread_count`.
    pub max_threads: Option<usize>,
    /// Cell count at which the per-cell phases switch to the parallel path.
    /// `None` means the built-in default.
    pub parallel_threshold: Option<usize>,
}

impl BalancerConfig {
    /// Set an explicit thread count for the compute pool.
    pub fn thread_count(mut self, n: usize) -> Self {
        self.thread_count = Some(n.max(1));
        self
    }

    /// Set a hard upper bound on threads.
    pub fn max_threads(mut self, n: usize) -> Self {
        self.max_threads = Some(n.max(1));
        self
    }

    /// Set the cell count at which phases go parallel.
    pub fn parallel_threshold(mut self, cells: usize) -> Self {
        self.parallel_threshold = Some(cells);
        self
    }
}

/// One-shot workload balancer over a dense 2-D grid.
///
/// Construction builds the thread pool; each [`balance`](Balancer::balance)
/// call is an independent pass holding no state from earlier calls.
pub struct Balancer {
    pool: rayon::ThreadPool,
    parallel_threshold: usize,
}

impl Default for Balancer {
    fn default() -> Self {
        Self::new()
    }
}

impl Balancer {
    pub fn new() -> Self {
        Self::with_config(BalancerConfig::default())
    }

    /// Create a balancer with explicit configuration.
    pub fn with_config(config: BalancerConfig) -> Self {
        let threads = resolve_thread_count(&config);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .expect("failed to build balancer rayon thread pool");
        Self {
            pool,
            parallel_threshold: config
                .parallel_threshold
                .unwrap_or(PARALLEL_CELL_THRESHOLD),
        }
    }

    /// Run one balancing pass over `grid`.
    ///
    /// Three phases in order: acceptance planning, outgoing planning, flow
    /// reconciliation. The input is read as an immutable snapshot; all
    /// outputs are freshly allocated. Results do not depend on the thread
    /// count.
    pub fn balance(&self, grid: &Grid) -> BalanceOutcome {
        let neighbors = NeighborTable::build(grid.width(), grid.height());
        let parallel =
            grid.len() >= self.parallel_threshold && self.pool.current_num_threads() > 1;

        if parallel {
            self.pool.install(|| {
                let acceptance = acceptance_pass(grid, &neighbors, true);
                let offers = offer_pass(grid, &neighbors, true);
                reconcile(grid, &neighbors, &acceptance, &offers, true)
            })
        } else {
            let acceptance = acceptance_pass(grid, &neighbors, false);
            let offers = offer_pass(grid, &neighbors, false);
            reconcile(grid, &neighbors, &acceptance, &offers, false)
        }
    }
}
