use std::collections::VecDeque;

use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::{
    discretize::{DiscreteState, Discretizer},
    env::{Action, Environment},
};

/// Physics and reward settings for [`FlappyBird`]
///
/// Distances are in pixels with `y` growing downwards, velocities in pixels per tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlappyBirdConfig {
    pub width: f64,
    /// Top of the ground strip; touching it ends the episode
    pub ground: f64,
    pub bird_x: f64,
    pub bird_size: f64,
    pub gravity: f64,
    pub flap_velocity: f64,
    pub max_fall_speed: f64,
    pub pipe_width: f64,
    pub pipe_gap: f64,
    pub pipe_speed: f64,
    /// Horizontal distance between consecutive pipes
    pub pipe_spacing: f64,
    /// Minimum distance between a gap and the top of the screen or the ground
    pub gap_margin: f64,
    /// Reward for each tick survived
    ///
    /// **Default**: `15.0`
    pub survive_reward: f32,
    /// Reward for crashing
    ///
    /// **Default**: `-1000.0`
    pub crash_reward: f32,
    /// Truncate episodes after this many ticks. The last tick is not terminal and still earns the
    /// survival reward.
    pub max_frames: Option<u32>,
    pub seed: Option<u64>,
}

impl Default for FlappyBirdConfig {
    fn default() -> Self {
        Self {
            width: 288.0,
            ground: 405.0,
            bird_x: 57.0,
            bird_size: 24.0,
            gravity: 1.0,
            flap_velocity: -9.0,
            max_fall_speed: 10.0,
            pipe_width: 52.0,
            pipe_gap: 100.0,
            pipe_speed: 4.0,
            pipe_spacing: 180.0,
            gap_margin: 25.0,
            survive_reward: 15.0,
            crash_reward: -1000.0,
            max_frames: Some(10_000),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Pipe {
    x: f64,
    gap_top: f64,
    passed: bool,
}

/// A headless side-scrolling pipe game
///
/// The bird falls under gravity and can flap to jump. Pipes scroll towards it from the right and
/// colliding with one, the ground, or the top of the screen ends the episode. Observations are the
/// distance to the far edge of the next pipe, the offset from the bird to the top of that pipe's
/// gap, and the bird's vertical velocity.
pub struct FlappyBird {
    config: FlappyBirdConfig,
    discretizer: Discretizer,
    gap_tops: Uniform<f64>,
    rng: StdRng,
    bird_y: f64,
    velocity: f64,
    pipes: VecDeque<Pipe>,
    frames: u32,
    score: u32,
    passed: bool,
    truncated: bool,
}

impl FlappyBird {
    /// **Panics** if the gap does not fit between the top of the screen and the ground
    pub fn new(config: FlappyBirdConfig, discretizer: Discretizer) -> Self {
        let lowest_gap_top = config.ground - config.pipe_gap - config.gap_margin;
        assert!(
            lowest_gap_top > config.gap_margin,
            "Pipe gap of {} does not fit above the ground at {}",
            config.pipe_gap,
            config.ground
        );
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut env = Self {
            gap_tops: Uniform::new(config.gap_margin, lowest_gap_top),
            config,
            discretizer,
            rng,
            bird_y: 0.0,
            velocity: 0.0,
            pipes: VecDeque::new(),
            frames: 0,
            score: 0,
            passed: false,
            truncated: false,
        };
        env.restart();
        env
    }

    pub fn discretizer(&self) -> &Discretizer {
        &self.discretizer
    }

    /// Pipes passed in the current episode
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Raw `(distance, gap offset, velocity)` observation
    pub fn observation(&self) -> (f64, f64, f64) {
        let cfg = &self.config;
        let pipe = self.next_pipe();
        (
            pipe.x + cfg.pipe_width - cfg.bird_x,
            pipe.gap_top - self.bird_y,
            self.velocity,
        )
    }

    fn state(&self) -> DiscreteState {
        let (x, y, v) = self.observation();
        self.discretizer.discretize(x, y, v)
    }

    fn next_pipe(&self) -> Pipe {
        *self
            .pipes
            .iter()
            .find(|p| !p.passed)
            .expect("pipes are spawned ahead of the bird")
    }

    fn spawn_pipe(&mut self, x: f64) {
        let gap_top = self.gap_tops.sample(&mut self.rng);
        self.pipes.push_back(Pipe {
            x,
            gap_top,
            passed: false,
        });
    }

    fn restart(&mut self) {
        self.bird_y = (self.config.ground - self.config.bird_size) / 2.0;
        self.velocity = 0.0;
        self.frames = 0;
        self.score = 0;
        self.passed = false;
        self.truncated = false;
        self.pipes.clear();
        self.spawn_pipe(self.config.width);
        self.spawn_pipe(self.config.width + self.config.pipe_spacing);
    }

    fn crashed(&self) -> bool {
        let cfg = &self.config;
        let (top, bottom) = (self.bird_y, self.bird_y + cfg.bird_size);
        if top < 0.0 || bottom >= cfg.ground {
            return true;
        }
        let (left, right) = (cfg.bird_x, cfg.bird_x + cfg.bird_size);
        self.pipes.iter().any(|p| {
            let overlaps = right > p.x && left < p.x + cfg.pipe_width;
            overlaps && (top < p.gap_top || bottom > p.gap_top + cfg.pipe_gap)
        })
    }
}

impl Environment for FlappyBird {
    fn reset(&mut self) -> DiscreteState {
        self.restart();
        self.state()
    }

    fn step(&mut self, action: Action) -> (DiscreteState, f32, bool) {
        let cfg = self.config.clone();
        self.passed = false;
        self.frames += 1;

        self.velocity = match action {
            Action::Flap => cfg.flap_velocity,
            Action::Idle => (self.velocity + cfg.gravity).min(cfg.max_fall_speed),
        };
        self.bird_y += self.velocity;

        for pipe in self.pipes.iter_mut() {
            pipe.x -= cfg.pipe_speed;
            if !pipe.passed && pipe.x + cfg.pipe_width < cfg.bird_x {
                pipe.passed = true;
                self.passed = true;
                self.score += 1;
            }
        }
        while self
            .pipes
            .front()
            .is_some_and(|p| p.x + cfg.pipe_width < 0.0)
        {
            self.pipes.pop_front();
        }
        if let Some(last) = self.pipes.back().map(|p| p.x) {
            if last <= cfg.width {
                self.spawn_pipe(last + cfg.pipe_spacing);
            }
        }

        let crashed = self.crashed();
        self.truncated = !crashed && cfg.max_frames.is_some_and(|max| self.frames >= max);
        let reward = if crashed {
            cfg.crash_reward
        } else {
            cfg.survive_reward
        };
        (self.state(), reward, crashed)
    }

    fn passed_obstacle(&self) -> bool {
        self.passed
    }

    fn truncated(&self) -> bool {
        self.truncated
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        algo::tabular::{QTableAgent, QTableAgentConfig},
        decay::Constant,
    };

    use super::*;

    fn env(seed: u64) -> FlappyBird {
        FlappyBird::new(
            FlappyBirdConfig {
                seed: Some(seed),
                ..Default::default()
            },
            Discretizer::flappy(),
        )
    }

    /// Flap whenever the bird is falling into the bottom of the next gap
    fn heuristic(env: &FlappyBird) -> Action {
        let (_, offset, velocity) = env.observation();
        let near_bottom = -offset + env.config.bird_size > env.config.pipe_gap - 20.0;
        if near_bottom && velocity >= 0.0 {
            Action::Flap
        } else {
            Action::Idle
        }
    }

    #[test]
    fn idling_falls_to_the_ground() {
        let mut env = env(0);
        let shape = env.discretizer().shape();
        let state = env.reset();
        assert!(state.xi < shape.x && state.yi < shape.y && state.zi < shape.z);

        let mut steps = 0;
        loop {
            steps += 1;
            let (_, reward, done) = env.step(Action::Idle);
            if done {
                assert_eq!(reward, -1000.0, "Crash is penalized");
                break;
            }
            assert_eq!(reward, 15.0, "Survival is rewarded");
            assert!(steps < 100, "Bird must hit the ground");
        }
        assert_eq!(env.score(), 0);
    }

    #[test]
    fn flapping_hits_the_ceiling() {
        let mut env = env(1);
        env.reset();
        let (_, reward, done) = (0..100)
            .map(|_| env.step(Action::Flap))
            .find(|(_, _, done)| *done)
            .expect("Bird must leave the screen");
        assert!(done);
        assert_eq!(reward, -1000.0);
    }

    #[test]
    fn heuristic_passes_pipes() {
        let mut env = FlappyBird::new(
            FlappyBirdConfig {
                pipe_gap: 140.0,
                seed: Some(2),
                ..Default::default()
            },
            Discretizer::flappy(),
        );
        env.reset();
        let mut pipes = 0;
        for _ in 0..2_000 {
            let (_, _, done) = env.step(heuristic(&env));
            if env.passed_obstacle() {
                pipes += 1;
            }
            if done {
                break;
            }
        }
        assert!(pipes >= 1, "Heuristic controller passed {pipes} pipes");
        assert_eq!(pipes, env.score());
    }

    #[test]
    fn same_seed_same_episode() {
        let run = |seed| {
            let mut env = env(seed);
            env.reset();
            (0..40)
                .map(|i| {
                    let action = if i % 7 == 0 { Action::Flap } else { Action::Idle };
                    env.step(action)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(11), run(11));
    }

    #[test]
    fn frame_cap_truncates_with_survival_reward() {
        let mut env = FlappyBird::new(
            FlappyBirdConfig {
                max_frames: Some(5),
                seed: Some(3),
                ..Default::default()
            },
            Discretizer::flappy(),
        );
        env.reset();
        for _ in 0..4 {
            assert!(!env.step(Action::Idle).2);
            assert!(!env.truncated());
        }
        let (_, reward, done) = env.step(Action::Idle);
        assert!(!done, "Hitting the cap is not a terminal state");
        assert!(env.truncated());
        assert_eq!(reward, 15.0);

        env.reset();
        assert!(!env.truncated(), "Reset clears truncation");
    }

    #[test]
    fn capped_episode_counts_every_survived_frame() {
        let mut env = FlappyBird::new(
            FlappyBirdConfig {
                max_frames: Some(5),
                seed: Some(3),
                ..Default::default()
            },
            Discretizer::flappy(),
        );
        let mut agent = QTableAgent::new(
            env.discretizer().shape(),
            QTableAgentConfig {
                seed: Some(0),
                ..QTableAgentConfig::with_exploration(Constant::new(0.0))
            },
        );

        let stats = agent.go(&mut env);

        assert_eq!(stats.frames, 5, "All five capped ticks were survived");
        assert_eq!(agent.table().visits().iter().sum::<u64>(), 5);
        assert!(
            agent.table().values().iter().all(|&q| q >= 0.0),
            "No crash penalty was learned"
        );
    }
}
