use std::error::Error;

use flappy_q::{
    algo::tabular::{QTableAgent, QTableAgentConfig},
    decay,
    discretize::Discretizer,
    gym::{FlappyBird, FlappyBirdConfig},
    record::{self, EpisodeLog},
};

const NUM_EPISODES: u32 = 20_000;
const EVAL_EPISODES: u32 = 3;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let discretizer = Discretizer::flappy();
    let shape = discretizer.shape();
    let mut env = FlappyBird::new(FlappyBirdConfig::default(), discretizer);

    let config = QTableAgentConfig::with_exploration(decay::Linear::new(0.10, 0.02, NUM_EPISODES));
    let mut agent = QTableAgent::new(shape, config);

    let run_dir = record::create_run_dir("results")?;
    let mut scores = EpisodeLog::create(run_dir.join(record::SCORES_FILE))?;

    for i in 0..NUM_EPISODES {
        let stats = agent.go(&mut env);
        scores.record(&stats)?;
        if (i + 1) % 1000 == 0 {
            log::info!("episode {} frames={} pipes={}", i + 1, stats.frames, stats.pipes);
        }
    }
    scores.flush()?;
    record::save_table(agent.table(), &run_dir)?;

    let table = record::load_table(&run_dir, shape, false)?;
    let greedy = QTableAgent::<decay::Linear>::from_table(table, QTableAgentConfig::default());
    for ep in 1..=EVAL_EPISODES {
        let stats = greedy.evaluate(&mut env);
        println!("[Agent] Episode {ep}: pipes={} frames={}", stats.pipes, stats.frames);
    }

    println!("Run saved to {}", run_dir.display());
    Ok(())
}
