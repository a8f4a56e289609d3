#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use flow_balance::{Balancer, BalancerConfig, Grid};
use rand::Rng;
use rand::SeedableRng;
use std::time::Instant;

const DEFAULT_WIDTH: usize = 256;
const DEFAULT_HEIGHT: usize = 256;
const DEFAULT_MAX_WORKLOAD: i64 = 2000;
const DEFAULT_ROUNDS: usize = 8;

struct MainArgs {
    width: usize,
    height: usize,
    max_workload: i64,
    rounds: usize,
    config: BalancerConfig,
}

fn parse_args() -> MainArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut config = BalancerConfig::default();
    let mut width = DEFAULT_WIDTH;
    let mut height = DEFAULT_HEIGHT;
    let mut max_workload = DEFAULT_MAX_WORKLOAD;
    let mut rounds = DEFAULT_ROUNDS;
    let next_arg = |i: usize, flag: &str| -> &str {
        args.get(i)
            .map(String::as_str)
            .unwrap_or_else(|| panic!("{flag} requires a value"))
    };
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--width" => {
                i += 1;
                width = next_arg(i, "--width")
                    .parse()
                    .expect("--width requires a positive integer");
            }
            "--height" => {
                i += 1;
                height = next_arg(i, "--height")
                    .parse()
                    .expect("--height requires a positive integer");
            }
            "--max-workload" => {
                i += 1;
                max_workload = next_arg(i, "--max-workload")
                    .parse()
                    .expect("--max-workload requires a nonnegative integer");
            }
            "--rounds" => {
                i += 1;
                rounds = next_arg(i, "--rounds")
                    .parse()
                    .expect("--rounds requires a positive integer");
            }
            "--threads" => {
                i += 1;
                let n: usize = next_arg(i, "--threads")
                    .parse()
                    .expect("--threads requires a positive integer");
                config = config.thread_count(n);
            }
            "--max-threads" => {
                i += 1;
                let n: usize = next_arg(i, "--max-threads")
                    .parse()
                    .expect("--max-threads requires a positive integer");
                config = config.max_threads(n);
            }
            other => panic!(
                "unknown argument: {other}\nusage: flow-balance [--width N] [--height N] [--max-workload N] [--rounds N] [--threads N] [--max-threads N]"
            ),
        }
        i += 1;
    }
    MainArgs {
        width,
        height,
        max_workload,
        rounds,
        config,
    }
}

fn seed_random_grid(width: usize, height: usize, max_workload: i64) -> Grid {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED_1234_ABCD_EF01);
    let values = (0..width * height)
        .map(|_| rng.random_range(0..=max_workload))
        .collect();
    Grid::new(width, height, values).expect("seeded grid is well-formed")
}

fn spread(grid: &Grid) -> i64 {
    let max = grid.values().iter().copied().max().unwrap_or(0);
    let min = grid.values().iter().copied().min().unwrap_or(0);
    max - min
}

fn mean_abs_deviation(grid: &Grid) -> f64 {
    if grid.is_empty() {
        return 0.0;
    }
    let mean = grid.total() as f64 / grid.len() as f64;
    grid.values()
        .iter()
        .map(|&v| (v as f64 - mean).abs())
        .sum::<f64>()
        / grid.len() as f64
}

fn main() {
    let args = parse_args();
    let balancer = Balancer::with_config(args.config);
    let mut grid = seed_random_grid(args.width, args.height, args.max_workload);
    let expected_total = grid.total();

    println!(
        "Balancing {}x{} grid, total workload {expected_total}",
        args.width, args.height
    );

    let mut total_duration = std::time::Duration::ZERO;
    for round in 1..=args.rounds {
        let spread_before = spread(&grid);
        let deviation_before = mean_abs_deviation(&grid);

        let start = Instant::now();
        let outcome = balancer.balance(&grid);
        total_duration += start.elapsed();

        let conserved = if outcome.balanced.total() == expected_total {
            "MATCH"
        } else {
            "MISMATCH"
        };
        println!(
            "Round {round}: total = {} [{conserved}], spread {spread_before} -> {}, mean dev {deviation_before:.1} -> {:.1}, {} applied flows",
            outcome.balanced.total(),
            spread(&outcome.balanced),
            mean_abs_deviation(&outcome.balanced),
            outcome.outgoing_applied.len()
        );

        grid = outcome.balanced;
    }

    let total_ms = total_duration.as_secs_f64() * 1000.0;
    let avg_ms = total_ms / args.rounds as f64;
    println!("\n--- Summary ({} rounds) ---", args.rounds);
    println!("Total: {total_ms:.3} ms, {avg_ms:.3} ms/round");
}
