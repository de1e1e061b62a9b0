//! Numerically stable link functions shared by the predictors.

/// Logistic sigmoid, evaluated on the side that cannot overflow.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Softmax over the reachable entries of a utility vector.
///
/// `None` marks a structurally unreachable choice: it is excluded from the
/// normalisation and reported as probability 0.0. The max reachable utility
/// is subtracted before exponentiating.
///
/// A `+inf` utility takes all the mass, shared evenly with any other `+inf`.
/// If every reachable utility is `-inf` the mass is spread evenly over them.
pub fn masked_softmax(utilities: &[Option<f64>]) -> Vec<f64> {
    let reachable = utilities.iter().flatten().count();
    if reachable == 0 {
        return vec![0.0; utilities.len()];
    }

    let max = utilities
        .iter()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    if !max.is_finite() {
        let ties = utilities.iter().flatten().filter(|u| **u == max).count();
        let share = if ties > 0 { 1.0 / ties as f64 } else { 1.0 / reachable as f64 };
        return utilities
            .iter()
            .map(|u| match u {
                Some(u) if *u == max || ties == 0 => share,
                _ => 0.0,
            })
            .collect();
    }

    let exps: Vec<f64> = utilities
        .iter()
        .map(|u| u.map_or(0.0, |u| (u - max).exp()))
        .collect();
    let total: f64 = exps.iter().sum();

    exps.into_iter().map(|e| e / total).collect()
}
