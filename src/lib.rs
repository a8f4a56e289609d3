//! Diffusion-style workload balancing over a 2-D grid of compute nodes.

pub mod balancer;

pub use balancer::{
    acceptance_table, offer_table, BalanceOutcome, Balancer, BalancerConfig, CellIdx, Direction,
    FlowEdge, Grid, GridError,
};
