//! Group-relative advantage: returns standardized within the group.
//!
//! Replaces a learned value baseline. The advantage of trajectory `i` is
//! `(R_i − mean(R)) / (std(R) + ε)` over the group's returns.

/// Standardizes a group's returns into per-trajectory advantages.
///
/// Uses the population standard deviation. When all returns are equal
/// the `eps` term keeps the division finite and the advantages collapse
/// to ~zero, degrading the update to a quiet no-op rather than an error.
///
/// # Arguments
///
/// * `returns` - One scalar return per group member
/// * `eps` - Small constant added to the standard deviation
pub fn group_advantages(returns: &[f64], eps: f64) -> Vec<f64> {
    assert!(!returns.is_empty(), "group must contain at least one return");

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt() + eps;

    returns.iter().map(|r| (r - mean) / std).collect()
}
