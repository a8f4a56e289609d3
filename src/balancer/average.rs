//! Threshold-refined local averaging shared by both planning passes.
//!
//! The acceptance and outgoing passes run the same refinement with the
//! comparison inverted, so the routine is parametrized on which side of the
//! threshold qualifies a neighbor. The refinement runs a fixed number of
//! rounds equal to the maximum neighbor count; it is not a convergence loop.

/// Refinement rounds after the initial average. Matches the maximum neighbor
/// count, so the qualifying set can settle in the worst case.
pub(crate) const REFINEMENT_ROUNDS: usize = 4;

/// Which neighbors qualify against the running threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    /// Strictly heavier neighbors qualify (acceptance pass).
    Heavier,
    /// Strictly lighter neighbors qualify (outgoing pass).
    Lighter,
}

impl Side {
    #[inline]
    fn qualifies(self, workload: i64, threshold: i64) -> bool {
        match self {
            Side::Heavier => workload > threshold,
            Side::Lighter => workload < threshold,
        }
    }
}

/// Integer division truncating toward zero.
///
/// Operands here are always nonnegative, where truncation and floor agree;
/// kept as an explicit helper so the rounding rule is stated once.
#[inline]
pub(crate) fn trunc_div(sum: i64, count: i64) -> i64 {
    debug_assert!(sum >= 0 && count > 0);
    sum / count
}

/// Settle the local average of a cell against its qualifying neighbors.
///
/// Starts from the average of the cell and every neighbor on the qualifying
/// side of the cell's own workload, then re-averages `REFINEMENT_ROUNDS`
/// times against the previous round's average. Each round recomputes the
/// qualifying set from scratch; qualification is not cumulative. Returns the
/// final average and the final round's qualifying flags, indexed by
/// direction.
pub(crate) fn settle(own: i64, neighbors: &[Option<i64>; 4], side: Side) -> (i64, [bool; 4]) {
    let mut sum = own;
    let mut count = 1;
    for workload in neighbors.iter().flatten() {
        if side.qualifies(*workload, own) {
            sum += workload;
            count += 1;
        }
    }
    let mut average = trunc_div(sum, count);

    let mut qualifies = [false; 4];
    for _ in 0..REFINEMENT_ROUNDS {
        let threshold = average;
        qualifies = [false; 4];
        let mut sum = own;
        let mut count = 1;
        for (dir, workload) in neighbors.iter().enumerate() {
            if let Some(workload) = workload {
                if side.qualifies(*workload, threshold) {
                    sum += workload;
                    count += 1;
                    qualifies[dir] = true;
                }
            }
        }
        average = trunc_div(sum, count);
    }

    (average, qualifies)
}
