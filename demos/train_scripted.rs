//! GRPO training demo on scripted emulators.
//!
//! Trains the convolutional policy against a small group of
//! deterministic scripted episodes. No real emulator binding is needed;
//! this exercises the full pool → rollout → update cycle end to end.
//!
//! Run:
//! ```sh
//! cargo run --example train_scripted
//! ```

use tch::Device;

use arcade_grpo::{
    ActorCritic, ConsoleSink, EnvConfig, EnvPool, GrpoTrainer, ScriptedEmulator, TrainingConfig,
};

fn main() -> Result<(), arcade_grpo::EnvError> {
    println!("=== GRPO Training Demo (scripted emulators) ===\n");

    let config = EnvConfig {
        frame_size: 32,
        frame_stack: 4,
        frame_skip: 1,
        max_episode_steps: Some(64),
    };

    // Four scripted environments with different reward schedules.
    let scripts: [&[f64]; 4] = [
        &[1.0, 0.0, 0.0, 1.0, 0.0],
        &[0.0, 2.0, 0.0, 0.0],
        &[0.0, 0.0, -1.0, 0.0, 0.0, 3.0],
        &[1.0, 1.0, 1.0],
    ];
    let mut next = 0;
    let mut pool = EnvPool::new(config.clone(), scripts.len(), || {
        let script = scripts[next].to_vec();
        next += 1;
        Ok(ScriptedEmulator::new(script, 3, next as u64))
    })?;

    println!("Pool:");
    println!("  Environments: {}", pool.len());
    println!("  Actions: {}", pool.num_actions());
    println!(
        "  Observation: {}x{}x{}",
        config.frame_stack, config.frame_size, config.frame_size
    );
    println!();

    let device = Device::Cpu;
    let model = ActorCritic::new(&config, pool.num_actions(), device);
    let train_config = TrainingConfig {
        log_every: 5,
        ..TrainingConfig::default()
    };
    let mut trainer = GrpoTrainer::new(model, train_config, device);

    let curve = trainer.train(&mut pool, 20, &mut ConsoleSink)?;

    println!("\nLearning curve:");
    for (update, mean_return) in &curve {
        if update % 5 == 0 {
            println!("  Update {:3}: mean_return = {:.3}", update, mean_return);
        }
    }

    Ok(())
}
