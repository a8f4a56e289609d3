use flow_balance::{Balancer, Grid};
use rand::Rng;
use rand::SeedableRng;
use std::time::Instant;

fn seed_grid(side: usize, max_workload: i64) -> Grid {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED_1234_ABCD_EF01);
    let values = (0..side * side)
        .map(|_| rng.random_range(0..=max_workload))
        .collect();
    Grid::new(side, side, values).expect("seeded grid is well-formed")
}

fn bench_balance(side: usize, passes: u64) -> f64 {
    let balancer = Balancer::new();
    let mut grid = seed_grid(side, 2000);

    let start = Instant::now();
    for _ in 0..passes {
        let outcome = balancer.balance(&grid);
        grid = outcome.balanced;
    }
    let duration = start.elapsed();

    std::hint::black_box(grid.total());
    duration.as_secs_f64() * 1000.0
}

fn main() {
    let scales: &[(usize, u64)] = &[
        (64, 400),  // 4096 cells, at the parallel threshold
        (128, 200), // 16384 cells
        (256, 100), // 65536 cells
        (512, 25),  // 262144 cells
        (1024, 8),  // ~1M cells
    ];

    println!(
        "{:<12} {:>10} {:>8} {:>12} {:>10}",
        "Grid", "Cells", "Passes", "Total(ms)", "Avg(ms)"
    );
    println!("{}", "-".repeat(56));

    for &(side, passes) in scales {
        let total_ms = bench_balance(side, passes);
        let avg_ms = total_ms / passes as f64;
        println!(
            "{:<12} {:>10} {:>8} {:>12.1} {:>10.4}",
            format!("{}x{}", side, side),
            side * side,
            passes,
            total_ms,
            avg_ms
        );
    }
}
