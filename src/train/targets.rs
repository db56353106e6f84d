//! Regression target computation

use tch::Tensor;

/// Soft (entropy-regularized) bootstrapped Q target
///
/// ```text
/// target = reward + gamma * (1 - done) * (Q_next - alpha * log_prob)
/// ```
///
/// Terminal transitions contribute their reward alone: the done flag zeroes
/// the whole bootstrap term, entropy bonus included. All tensors are
/// `[batch]` and broadcast element-wise.
pub fn soft_q_target(
    rewards: &Tensor,
    dones: &Tensor,
    next_q: &Tensor,
    log_probs: &Tensor,
    alpha: f64,
    gamma: f64,
) -> Tensor {
    let continuing = dones.neg() + 1.0;
    rewards + (next_q - log_probs * alpha) * continuing * gamma
}
