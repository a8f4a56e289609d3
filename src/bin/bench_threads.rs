use flow_balance::{Balancer, BalancerConfig, Grid};
use rand::Rng;
use rand::SeedableRng;
use std::time::Instant;

const SIDE: usize = 512;
const PASSES: u64 = 25;

fn seed_grid() -> Grid {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xD37E_A515);
    let values = (0..SIDE * SIDE)
        .map(|_| rng.random_range(0..=2000i64))
        .collect();
    Grid::new(SIDE, SIDE, values).expect("seeded grid is well-formed")
}

fn bench_threads(threads: usize, grid: &Grid) -> (f64, i64) {
    let balancer = Balancer::with_config(BalancerConfig::default().thread_count(threads));
    let mut current = grid.clone();

    let start = Instant::now();
    for _ in 0..PASSES {
        let outcome = balancer.balance(&current);
        current = outcome.balanced;
    }
    let duration = start.elapsed();

    (duration.as_secs_f64() * 1000.0, current.total())
}

fn main() {
    let grid = seed_grid();
    let baseline_total = grid.total();

    println!(
        "{:<10} {:>12} {:>10} {:>12}",
        "Threads", "Total(ms)", "Avg(ms)", "Conserved"
    );
    println!("{}", "-".repeat(48));

    for &threads in &[1usize, 2, 4, 8] {
        let (total_ms, total) = bench_threads(threads, &grid);
        let avg_ms = total_ms / PASSES as f64;
        println!(
            "{:<10} {:>12.1} {:>10.4} {:>12}",
            threads,
            total_ms,
            avg_ms,
            if total == baseline_total { "yes" } else { "NO" }
        );
    }
}
