//! Engine output checked against a plain, self-contained reimplementation of
//! the balancing pass.

use flow_balance::{Balancer, BalancerConfig, FlowEdge, Grid};
use rand::Rng;
use rand::SeedableRng;

const WEST: usize = 0;
const EAST: usize = 1;
const SOUTH: usize = 2;
const NORTH: usize = 3;
const OFFSETS: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const REACH: f64 = 0.65;

struct NaiveOutcome {
    balanced: Vec<i64>,
    convolved: Vec<i64>,
    incoming: Vec<(f64, f64, f64, f64)>,
    outgoing: Vec<(f64, f64, f64, f64)>,
}

fn neighbor(idx: usize, dir: usize, width: usize, height: usize) -> Option<usize> {
    let x = idx % width;
    let y = idx / width;
    match dir {
        WEST if x > 0 => Some(idx - 1),
        EAST if x < width - 1 => Some(idx + 1),
        SOUTH if y > 0 => Some(idx - width),
        NORTH if y < height - 1 => Some(idx + width),
        _ => None,
    }
}

/// Four refinement rounds of the local average; `above` selects whether
/// neighbors above or below the running threshold qualify.
fn settled_average(
    values: &[i64],
    idx: usize,
    width: usize,
    height: usize,
    above: bool,
) -> (i64, [bool; 4]) {
    let own = values[idx];
    let qualifies = |workload: i64, threshold: i64| {
        if above {
            workload > threshold
        } else {
            workload < threshold
        }
    };

    let mut sum = own;
    let mut count = 1;
    for dir in 0..4 {
        if let Some(n) = neighbor(idx, dir, width, height) {
            if qualifies(values[n], own) {
                sum += values[n];
                count += 1;
            }
        }
    }
    let mut average = sum / count;

    let mut flags = [false; 4];
    for _ in 0..4 {
        let threshold = average;
        flags = [false; 4];
        let mut sum = own;
        let mut count = 1;
        for dir in 0..4 {
            if let Some(n) = neighbor(idx, dir, width, height) {
                if qualifies(values[n], threshold) {
                    sum += values[n];
                    count += 1;
                    flags[dir] = true;
                }
            }
        }
        average = sum / count;
    }
    (average, flags)
}

fn naive_balance(width: usize, height: usize, values: &[i64]) -> NaiveOutcome {
    let n = width * height;

    let mut acceptance = vec![[0i64; 4]; n];
    for idx in 0..n {
        let (average, flags) = settled_average(values, idx, width, height, true);
        let amount = average - values[idx];
        let mut qualifying_total = 0i64;
        for dir in 0..4 {
            if flags[dir] {
                qualifying_total += values[neighbor(idx, dir, width, height).unwrap()];
            }
        }
        if amount > 0 && qualifying_total > 0 {
            for dir in 0..4 {
                if flags[dir] {
                    let workload = values[neighbor(idx, dir, width, height).unwrap()];
                    acceptance[idx][dir] = amount * workload / qualifying_total;
                }
            }
        }
    }

    let mut offers = vec![[0i64; 4]; n];
    for idx in 0..n {
        let (average, flags) = settled_average(values, idx, width, height, false);
        for dir in 0..4 {
            if flags[dir] {
                let gap = average - values[neighbor(idx, dir, width, height).unwrap()];
                offers[idx][dir] = gap.max(0);
            }
        }
    }

    let mut balanced = values.to_vec();
    let mut convolved = vec![0i64; n];
    let mut incoming = Vec::new();
    let mut outgoing = Vec::new();
    for idx in 0..n {
        let x = (idx % width) as f64;
        let y = (idx / width) as f64;

        let mut sum = values[idx];
        let mut count = 1;
        for dir in 0..4 {
            if let Some(nb) = neighbor(idx, dir, width, height) {
                sum += values[nb];
                count += 1;
            }
        }
        convolved[idx] = sum / count;

        for dir in 0..4 {
            let (dx, dy) = OFFSETS[dir];
            let tip = (x, y, x + dx as f64 * REACH, y + dy as f64 * REACH);
            let Some(nb) = neighbor(idx, dir, width, height) else {
                continue;
            };
            if acceptance[nb][dir ^ 1] > 0 {
                incoming.push(tip);
            }
            let bound = offers[idx][dir].min(acceptance[nb][dir ^ 1]);
            if bound > 0 {
                outgoing.push(tip);
            }
            balanced[idx] -= bound;
            balanced[nb] += bound;
        }
    }

    NaiveOutcome {
        balanced,
        convolved,
        incoming,
        outgoing,
    }
}

fn edge_tuples(edges: &[FlowEdge]) -> Vec<(f64, f64, f64, f64)> {
    edges
        .iter()
        .map(|e| (e.x_start, e.y_start, e.x_end, e.y_end))
        .collect()
}

fn run_parity_case(width: usize, height: usize, max_workload: i64, seed: u64) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let values: Vec<i64> = (0..width * height)
        .map(|_| rng.random_range(0..=max_workload))
        .collect();
    let grid = Grid::new(width, height, values.clone()).unwrap();

    let outcome = Balancer::new().balance(&grid);
    let naive = naive_balance(width, height, &values);

    assert_eq!(
        outcome.balanced.values(),
        naive.balanced.as_slice(),
        "balanced mismatch for {width}x{height} seed {seed}"
    );
    assert_eq!(
        outcome.convolved.values(),
        naive.convolved.as_slice(),
        "convolved mismatch for {width}x{height} seed {seed}"
    );
    assert_eq!(
        edge_tuples(&outcome.incoming_eligible),
        naive.incoming,
        "incoming edge mismatch for {width}x{height} seed {seed}"
    );
    assert_eq!(
        edge_tuples(&outcome.outgoing_applied),
        naive.outgoing,
        "outgoing edge mismatch for {width}x{height} seed {seed}"
    );
}

#[test]
fn parity_small_and_rectangular_grids() {
    run_parity_case(2, 2, 100, 0xA1);
    run_parity_case(5, 5, 2000, 0xB2);
    run_parity_case(3, 8, 1500, 0xC3);
    run_parity_case(16, 4, 4000, 0xD4);
}

#[test]
fn parity_multiple_seeds() {
    for seed in [11u64, 22, 33, 44] {
        run_parity_case(12, 12, 3000, seed);
    }
}

#[test]
fn parity_on_tiny_workloads() {
    for seed in [0x71u64, 0x72, 0x73] {
        run_parity_case(8, 8, 2, seed);
        run_parity_case(6, 7, 1, seed);
    }
}

#[test]
fn parity_on_known_scenario() {
    #[rustfmt::skip]
    let values = vec![
        1200, 600, 300, 700, 400,
        100, 1800, 1500, 900, 1100,
        500, 300, 1000, 100, 600,
        700, 1300, 200, 1400, 800,
        200, 800, 400, 500, 1600,
    ];
    let grid = Grid::new(5, 5, values.clone()).unwrap();
    let outcome = Balancer::new().balance(&grid);
    let naive = naive_balance(5, 5, &values);

    assert_eq!(outcome.balanced.values(), naive.balanced.as_slice());
    assert_eq!(naive.balanced.iter().sum::<i64>(), 19000);
}

#[test]
fn parity_across_thread_counts_on_parallel_path() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x0DDB_A11);
    let values: Vec<i64> = (0..48 * 48).map(|_| rng.random_range(0..=2500)).collect();
    let grid = Grid::new(48, 48, values.clone()).unwrap();

    let naive = naive_balance(48, 48, &values);
    for threads in [1usize, 2, 4] {
        let balancer = Balancer::with_config(
            BalancerConfig::default()
                .thread_count(threads)
                .parallel_threshold(1),
        );
        let outcome = balancer.balance(&grid);
        assert_eq!(
            outcome.balanced.values(),
            naive.balanced.as_slice(),
            "balanced mismatch with {threads} threads"
        );
        assert_eq!(
            edge_tuples(&outcome.outgoing_applied),
            naive.outgoing,
            "edge mismatch with {threads} threads"
        );
    }
}
