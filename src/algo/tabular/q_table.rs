use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    assert_interval, assert_positive,
    decay::{self, Decay},
    discretize::DiscreteState,
    env::{Action, Environment},
    exp::Exp,
    exploration::{self, Choice, EpsilonGreedy},
    record::EpisodeStats,
    table::{TableShape, ValueTable},
};

/// Configuration for the [`QTableAgent`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QTableAgentConfig<D: Decay = decay::Linear> {
    /// Exploration schedule used by [`QTableAgent::go`]
    ///
    /// **Default**: linear from `0.10` to `0.02` over 20 000 episodes
    pub exploration: EpsilonGreedy<D>,
    /// Discount factor
    ///
    /// **Default**: `1.0`, episodes are finite and the reward is dense
    pub gamma: f32,
    /// Bound on the magnitude of any action value
    ///
    /// **Default**: `10_000.0`
    pub q_cap: f32,
    /// Seed for the exploration random source, `None` seeds from system entropy
    ///
    /// **Default**: `None`
    pub seed: Option<u64>,
}

impl<D: Decay> QTableAgentConfig<D> {
    /// Default settings with a custom exploration schedule
    pub fn with_exploration(decay: D) -> Self {
        Self {
            exploration: EpsilonGreedy::new(decay),
            gamma: 1.0,
            q_cap: 10_000.0,
            seed: None,
        }
    }
}

impl Default for QTableAgentConfig<decay::Linear> {
    fn default() -> Self {
        Self::with_exploration(decay::Linear::default())
    }
}

/// A Q-learning agent over a dense [`ValueTable`]
///
/// The step size of each update is derived from how often the state-action pair has been visited:
///
/// Q(s,a) ← Q(s,a) + α(n)(r + γ max<sub>a'</sub> Q(s',a') - Q(s,a)),  α(n) = 1 / (1 + n)
///
/// where n is the visit count of (s,a) including the current update. Frequently visited pairs settle
/// while rarely visited ones stay adaptable. Values are clipped to `[-q_cap, q_cap]` after each update.
pub struct QTableAgent<D: Decay = decay::Linear> {
    table: ValueTable,
    exploration: EpsilonGreedy<D>,
    gamma: f32,
    q_cap: f32,
    rng: StdRng,
    episode: u32,
}

impl<D: Decay> QTableAgent<D> {
    /// Initialize an agent with a zeroed table of the given shape
    ///
    /// **Panics** if `gamma` is not in the interval `[0,1]` or `q_cap` is not positive
    pub fn new(shape: TableShape, config: QTableAgentConfig<D>) -> Self {
        Self::from_table(ValueTable::new(shape), config)
    }

    /// Initialize an agent around an existing table, e.g. one restored from a previous run
    ///
    /// **Panics** under the same conditions as [`QTableAgent::new`]
    pub fn from_table(table: ValueTable, config: QTableAgentConfig<D>) -> Self {
        assert_interval!(config.gamma, 0.0, 1.0);
        assert_positive!(config.q_cap);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            table,
            exploration: config.exploration,
            gamma: config.gamma,
            q_cap: config.q_cap,
            rng,
            episode: 0,
        }
    }

    pub fn table(&self) -> &ValueTable {
        &self.table
    }

    pub fn into_table(self) -> ValueTable {
        self.table
    }

    /// Number of episodes completed through [`go`](QTableAgent::go)
    pub fn episode(&self) -> u32 {
        self.episode
    }

    /// Continue the exploration schedule from `episode`, e.g. when resuming a run
    pub fn set_episode(&mut self, episode: u32) {
        self.episode = episode;
    }

    /// Replace the exploration random source with a freshly seeded one
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Choose an action: uniformly at random with probability `epsilon`, otherwise greedily
    ///
    /// **Panics** if `epsilon` is not in the interval `[0,1]`
    pub fn act(&mut self, state: DiscreteState, epsilon: f64) -> Action {
        match exploration::choose(epsilon, &mut self.rng) {
            Choice::Explore => Action::random(&mut self.rng),
            Choice::Exploit => self.table.greedy_action(state),
        }
    }

    /// Apply one temporal-difference update for the given transition
    ///
    /// Touches exactly one cell of the value table and its visit count.
    pub fn learn(&mut self, experience: Exp) {
        let Exp {
            state,
            action,
            reward,
            next_state,
            done,
        } = experience;

        let target = if done {
            reward
        } else {
            reward + self.gamma * self.table.max_value(next_state)
        };

        let q_cap = self.q_cap;
        let (q, n) = self.table.cell_mut(state, action);
        *n += 1;
        let alpha = 1.0 / (1 + *n) as f32;
        *q = (*q + alpha * (target - *q)).clamp(-q_cap, q_cap);
    }

    /// Run one learning episode in `env` with the exploration rate scheduled for the current episode
    pub fn go<E: Environment>(&mut self, env: &mut E) -> EpisodeStats {
        let epsilon = self.exploration.epsilon(self.episode);
        let mut stats = EpisodeStats::new(self.episode);

        let mut state = env.reset();
        loop {
            let action = self.act(state, epsilon);
            let (next_state, reward, done) = env.step(action);
            stats.track(done, env.passed_obstacle());

            self.learn(Exp {
                state,
                action,
                reward,
                next_state,
                done,
            });

            if done || env.truncated() {
                break;
            }
            state = next_state;
        }

        log::debug!(
            "episode {} epsilon={:.4} frames={} pipes={}",
            stats.episode,
            epsilon,
            stats.frames,
            stats.pipes
        );
        self.episode += 1;
        stats
    }

    /// Run one greedy episode in `env` without learning
    pub fn evaluate<E: Environment>(&self, env: &mut E) -> EpisodeStats {
        let mut stats = EpisodeStats::new(self.episode);
        let mut state = env.reset();
        loop {
            let (next_state, _, done) = env.step(self.table.greedy_action(state));
            stats.track(done, env.passed_obstacle());
            if done || env.truncated() {
                return stats;
            }
            state = next_state;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::Rng;
    use statrs::distribution::{Binomial, DiscreteCDF};

    use crate::{decay::Constant, env::tests::MockEnv};

    use super::*;

    const SHAPE: TableShape = TableShape { x: 4, y: 3, z: 2 };

    fn seeded() -> QTableAgentConfig {
        QTableAgentConfig {
            seed: Some(17),
            ..Default::default()
        }
    }

    fn s(xi: usize, yi: usize, zi: usize) -> DiscreteState {
        DiscreteState::new(xi, yi, zi)
    }

    fn exp(state: DiscreteState, action: Action, reward: f32, next_state: DiscreteState, done: bool) -> Exp {
        Exp {
            state,
            action,
            reward,
            next_state,
            done,
        }
    }

    fn agent_with(cells: &[(DiscreteState, Action, f32)]) -> QTableAgent {
        let mut table = ValueTable::new(SHAPE);
        for &(state, action, value) in cells {
            *table.cell_mut(state, action).0 = value;
        }
        QTableAgent::from_table(table, seeded())
    }

    #[test]
    fn update_arithmetic() {
        let s2 = s(1, 1, 1);
        let mut agent = agent_with(&[(s2, Action::Idle, 2.0), (s2, Action::Flap, 1.0)]);
        let s1 = s(0, 0, 0);

        agent.learn(exp(s1, Action::Flap, 15.0, s2, false));

        assert_eq!(agent.table().visit_count(s1, Action::Flap), 1);
        assert_eq!(agent.table().value(s1, Action::Flap), 8.5, "0 + 0.5 * (17 - 0)");
        assert_eq!(agent.table().value(s1, Action::Idle), 0.0, "Other action untouched");
        assert_eq!(agent.table().value(s2, Action::Idle), 2.0, "Next state untouched");
    }

    #[test]
    fn step_size_shrinks_with_visits() {
        let mut agent = agent_with(&[]);
        let s1 = s(2, 0, 1);
        // alpha = 1/2 then 1/3: 0 -> 3 -> 3 + (6 - 3) / 3
        agent.learn(exp(s1, Action::Idle, 6.0, s1, true));
        assert_eq!(agent.table().value(s1, Action::Idle), 3.0);
        agent.learn(exp(s1, Action::Idle, 6.0, s1, true));
        assert_eq!(agent.table().value(s1, Action::Idle), 4.0);
        assert_eq!(agent.table().visit_count(s1, Action::Idle), 2);
    }

    #[test]
    fn terminal_update_ignores_next_state() {
        let s2 = s(3, 2, 1);
        let mut agent = agent_with(&[(s2, Action::Idle, 9_000.0), (s2, Action::Flap, 9_000.0)]);
        let s1 = s(0, 1, 0);

        agent.learn(exp(s1, Action::Idle, -1000.0, s2, true));

        assert_eq!(
            agent.table().value(s1, Action::Idle),
            -500.0,
            "Target is exactly the reward, moved by alpha = 0.5"
        );
    }

    #[test]
    fn values_stay_within_cap() {
        let mut agent = agent_with(&[]);
        let s1 = s(1, 2, 0);
        for _ in 0..500 {
            agent.learn(exp(s1, Action::Flap, 1e6, s1, false));
            agent.learn(exp(s1, Action::Idle, -1e6, s1, true));
        }
        let values = agent.table().action_values(s1);
        assert_eq!(values[Action::Flap.index()], 10_000.0, "Positive values saturate");
        assert_eq!(values[Action::Idle.index()], -10_000.0, "Negative values saturate");
        assert!(agent
            .table()
            .values()
            .iter()
            .all(|q| (-10_000.0..=10_000.0).contains(q)));
    }

    #[test]
    fn self_loop_bootstrap_is_bounded() {
        let mut agent = agent_with(&[]);
        let s1 = s(0, 0, 1);
        for _ in 0..10_000 {
            agent.learn(exp(s1, Action::Idle, 15.0, s1, false));
        }
        let q = agent.table().value(s1, Action::Idle);
        assert!(q > 0.0 && q <= 10_000.0, "Undiscounted self loop is capped, got {q}");
    }

    #[test]
    fn visits_increase_by_one_per_update() {
        let mut agent = agent_with(&[]);
        let mut rng = StdRng::seed_from_u64(3);
        let mut expected: HashMap<(DiscreteState, Action), u64> = HashMap::new();

        for _ in 0..2_000 {
            let state = s(rng.gen_range(0..4), rng.gen_range(0..3), rng.gen_range(0..2));
            let next = s(rng.gen_range(0..4), rng.gen_range(0..3), rng.gen_range(0..2));
            let action = Action::random(&mut rng);
            let before = agent.table().visit_count(state, action);

            agent.learn(exp(state, action, rng.gen_range(-10.0..10.0), next, rng.gen_bool(0.1)));

            assert_eq!(agent.table().visit_count(state, action), before + 1);
            *expected.entry((state, action)).or_default() += 1;
        }

        let total: u64 = agent.table().visits().iter().sum();
        assert_eq!(total, 2_000, "No cell other than the updated one is counted");
        for ((state, action), count) in expected {
            assert_eq!(agent.table().visit_count(state, action), count);
        }
    }

    #[test]
    fn greedy_tie_breaks_to_first_action() {
        let s1 = s(2, 2, 0);
        let mut agent = agent_with(&[(s1, Action::Idle, 5.0), (s1, Action::Flap, 5.0)]);
        for _ in 0..100 {
            assert_eq!(agent.act(s1, 0.0), Action::Idle);
        }
    }

    #[test]
    fn full_exploration_is_uniform() {
        const CALLS: u64 = 10_000;
        let s1 = s(0, 0, 0);
        let mut agent = agent_with(&[(s1, Action::Flap, 100.0)]);

        let flaps = (0..CALLS)
            .filter(|_| agent.act(s1, 1.0) == Action::Flap)
            .count() as u64;

        let dist = Binomial::new(0.5, CALLS).unwrap();
        let lower = dist.cdf(flaps);
        let upper = 1.0 - dist.cdf(flaps.saturating_sub(1));
        let p_value = (2.0 * lower.min(upper)).min(1.0);
        assert!(
            p_value > 1e-6,
            "Flap frequency {} is not consistent with 0.5 (p = {p_value})",
            flaps as f64 / CALLS as f64
        );
    }

    #[test]
    fn same_seed_same_actions() {
        let s1 = s(1, 1, 1);
        let mut a = agent_with(&[]);
        let mut b = agent_with(&[]);
        let run = |agent: &mut QTableAgent| (0..200).map(|_| agent.act(s1, 0.5)).collect::<Vec<_>>();
        assert_eq!(run(&mut a), run(&mut b));
    }

    #[test]
    fn go_counts_frames_and_pipes() {
        let start = s(3, 1, 0);
        let mut env = MockEnv::new(
            start,
            [
                (s(2, 1, 0), 15.0, false, false),
                (s(1, 1, 1), 15.0, false, true),
                (s(0, 2, 1), 15.0, false, false),
                (s(0, 0, 1), -1000.0, true, false),
            ],
        );
        let mut agent = QTableAgent::new(
            SHAPE,
            QTableAgentConfig {
                seed: Some(1),
                ..QTableAgentConfig::with_exploration(Constant::new(0.0))
            },
        );

        let stats = agent.go(&mut env);

        assert_eq!(stats.episode, 0);
        assert_eq!(stats.frames, 3, "Terminal tick is not a survived frame");
        assert_eq!(stats.pipes, 1);
        assert_eq!(agent.episode(), 1);
        let total: u64 = agent.table().visits().iter().sum();
        assert_eq!(total, 4, "One update per step");
        assert_eq!(
            agent.table().value(s(1, 1, 1), Action::Idle),
            7.5,
            "Greedy with an all-zero table always idles"
        );
        assert_eq!(agent.table().value(s(0, 2, 1), Action::Idle), -500.0);
    }

    #[test]
    fn truncated_episode_still_bootstraps() {
        let start = s(0, 0, 0);
        let last = s(3, 2, 1);
        let mut env = MockEnv::new(
            start,
            [
                (s(1, 0, 0), 15.0, false, false),
                (last, 15.0, false, false),
                (s(0, 0, 1), 15.0, false, false),
            ],
        );
        env.truncate_at = Some(1);
        let mut agent = QTableAgent::from_table(
            {
                let mut table = ValueTable::new(SHAPE);
                *table.cell_mut(last, Action::Idle).0 = 40.0;
                table
            },
            QTableAgentConfig {
                seed: Some(1),
                ..QTableAgentConfig::with_exploration(Constant::new(0.0))
            },
        );

        let stats = agent.go(&mut env);

        assert_eq!(stats.frames, 2, "Truncated final tick counts as survived");
        assert_eq!(env.script.len(), 1, "Episode stops on truncation");
        assert_eq!(
            agent.table().value(s(1, 0, 0), Action::Idle),
            27.5,
            "Target on the cut-off tick is 15 + max Q[s2] = 55"
        );
    }

    #[test]
    fn evaluate_leaves_table_untouched() {
        let start = s(0, 0, 0);
        let mut env = MockEnv::new(
            start,
            [
                (s(1, 0, 0), 15.0, false, true),
                (s(2, 0, 0), -1000.0, true, false),
            ],
        );
        let agent = agent_with(&[(start, Action::Flap, 1.0)]);
        let before = agent.table().clone();

        let stats = agent.evaluate(&mut env);

        assert_eq!((stats.frames, stats.pipes), (1, 1));
        assert_eq!(agent.table(), &before);
        assert_eq!(agent.episode(), 0, "Evaluation does not advance the schedule");
    }

    #[test]
    #[should_panic(expected = "Invalid value for `config.gamma`")]
    fn rejects_bad_gamma() {
        QTableAgent::new(
            SHAPE,
            QTableAgentConfig {
                gamma: 1.5,
                ..seeded()
            },
        );
    }
}
