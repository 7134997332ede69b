//! Convolutional actor-critic network using tch-rs (PyTorch bindings).

use tch::{nn, nn::Module, Device, Kind, Tensor};

use crate::config::EnvConfig;
use crate::policy::Policy;

/// Shared perception-and-action network for pixel observations.
///
/// Architecture: `conv(stack→16, 8×8 s4) → tanh → conv(16→32, 4×4 s2) →
/// tanh → flatten → linear(→256) → tanh`, followed by a linear actor head
/// (action logits) and a linear critic head (scalar estimate). The critic
/// head is unused by group-relative training but kept so baseline-based
/// trainers can reuse the same network.
pub struct ActorCritic {
    vs: nn::VarStore,
    head: nn::Sequential,
    actor: nn::Linear,
    critic: nn::Linear,
}

impl ActorCritic {
    /// Creates a new network for the given observation geometry and
    /// action set size.
    pub fn new(config: &EnvConfig, num_actions: usize, device: Device) -> Self {
        assert!(
            config.frame_size >= 20,
            "frame size too small for the convolutional head"
        );
        let conv1_out = (config.frame_size - 8) / 4 + 1;
        let conv2_out = (conv1_out - 4) / 2 + 1;
        let flat_dim = 32 * conv2_out * conv2_out;

        let vs = nn::VarStore::new(device);
        let p = &vs.root();
        let head = nn::seq()
            .add(nn::conv2d(
                p / "c1",
                config.frame_stack as i64,
                16,
                8,
                nn::ConvConfig {
                    stride: 4,
                    ..Default::default()
                },
            ))
            .add_fn(|x| x.tanh())
            .add(nn::conv2d(
                p / "c2",
                16,
                32,
                4,
                nn::ConvConfig {
                    stride: 2,
                    ..Default::default()
                },
            ))
            .add_fn(|x| x.tanh())
            .add_fn(|x| x.flatten(1, -1))
            .add(nn::linear(p / "l1", flat_dim as i64, 256, Default::default()))
            .add_fn(|x| x.tanh());
        let actor = nn::linear(p / "actor", 256, num_actions as i64, Default::default());
        let critic = nn::linear(p / "critic", 256, 1, Default::default());

        Self {
            vs,
            head,
            actor,
            critic,
        }
    }

    /// Forward pass: returns `(logits, values)`.
    pub fn forward(&self, obs: &Tensor) -> (Tensor, Tensor) {
        let h = self.head.forward(obs);
        let logits = h.apply(&self.actor);
        let values = h.apply(&self.critic).squeeze_dim(-1);
        (logits, values)
    }

    /// Samples one action per batch row from the categorical distribution.
    ///
    /// Returns `(actions, log_probs)` of the sampled actions.
    pub fn sample_actions(&self, obs: &Tensor) -> (Tensor, Tensor) {
        let (logits, _) = self.forward(obs);
        let log_probs = logits.log_softmax(-1, Kind::Float);
        let actions = log_probs.exp().multinomial(1, true).squeeze_dim(-1);
        let selected = log_probs
            .gather(-1, &actions.unsqueeze(-1), false)
            .squeeze_dim(-1);
        (actions, selected)
    }

    /// Log-probabilities of the given actions under the current policy.
    pub fn log_prob(&self, obs: &Tensor, actions: &Tensor) -> Tensor {
        let (logits, _) = self.forward(obs);
        logits
            .log_softmax(-1, Kind::Float)
            .gather(-1, &actions.unsqueeze(-1), false)
            .squeeze_dim(-1)
    }

    /// Returns a mutable reference to the variable store for optimization.
    pub fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.vs
    }

    /// Returns a reference to the variable store.
    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }
}

impl Policy for ActorCritic {
    fn forward(&self, observations: &Tensor) -> (Tensor, Tensor) {
        ActorCritic::forward(self, observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_net(num_actions: usize) -> ActorCritic {
        ActorCritic::new(&EnvConfig::default(), num_actions, Device::Cpu)
    }

    #[test]
    fn forward_shapes() {
        let net = default_net(6);
        let obs = Tensor::randn([4, 4, 84, 84], (Kind::Float, Device::Cpu));
        let (logits, values) = net.forward(&obs);
        assert_eq!(logits.size(), &[4, 6]);
        assert_eq!(values.size(), &[4]);
    }

    #[test]
    fn forward_handles_small_frames() {
        let config = EnvConfig {
            frame_size: 32,
            ..EnvConfig::default()
        };
        let net = ActorCritic::new(&config, 4, Device::Cpu);
        let obs = Tensor::randn([2, 4, 32, 32], (Kind::Float, Device::Cpu));
        let (logits, values) = net.forward(&obs);
        assert_eq!(logits.size(), &[2, 4]);
        assert_eq!(values.size(), &[2]);
    }

    #[test]
    fn sampled_actions_are_in_range() {
        let net = default_net(6);
        let obs = Tensor::randn([8, 4, 84, 84], (Kind::Float, Device::Cpu));
        let (actions, log_probs) = net.sample_actions(&obs);
        assert_eq!(actions.size(), &[8]);
        assert_eq!(log_probs.size(), &[8]);
        let actions: Vec<i64> = actions.try_into().expect("int64 action tensor");
        for a in actions {
            assert!((0..6).contains(&a));
        }
    }

    #[test]
    fn log_prob_matches_sampling_distribution() {
        let net = default_net(4);
        let obs = Tensor::randn([3, 4, 84, 84], (Kind::Float, Device::Cpu));
        let (actions, sampled_lp) = net.sample_actions(&obs);
        let recomputed = net.log_prob(&obs, &actions);
        let diff: f64 = (sampled_lp - recomputed).abs().max().double_value(&[]);
        assert!(diff < 1e-6);
    }
}
