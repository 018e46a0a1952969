use serde::{Deserialize, Serialize};

use crate::assert_interval;

/// A hyperparameter that varies with training progress
pub trait Decay {
    /// Value at episode `t`
    fn evaluate(&self, t: f64) -> f64;
}

/// Linear interpolation from `start` at episode 0 to `end` at `max_episodes`, held at `end` afterwards
///
/// This is a pure function of progress, so the exploration rate of any episode can be re-derived
/// when resuming a run.
pub fn epsilon_for_episode(episode: u32, max_episodes: u32, start: f64, end: f64) -> f64 {
    Linear::new(start, end, max_episodes).evaluate(episode as f64)
}

/// A constant value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    value: f64,
}

impl Constant {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Decay for Constant {
    fn evaluate(&self, _t: f64) -> f64 {
        self.value
    }
}

/// v(t) = v<sub>i</sub> + (t / T)(v<sub>f</sub> - v<sub>i</sub>) for t < T, otherwise v<sub>f</sub>
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Linear {
    vi: f64,
    vf: f64,
    horizon: u32,
}

impl Linear {
    /// Interpolate from `vi` to `vf` over `horizon` episodes
    pub fn new(vi: f64, vf: f64, horizon: u32) -> Self {
        Self { vi, vf, horizon }
    }
}

impl Default for Linear {
    fn default() -> Self {
        Self::new(0.10, 0.02, 20_000)
    }
}

impl Decay for Linear {
    fn evaluate(&self, t: f64) -> f64 {
        let &Self { vi, vf, horizon } = self;
        if t >= horizon as f64 {
            return vf;
        }
        let frac = t / horizon as f64;
        vi + frac * (vf - vi)
    }
}

/// v(t) = v<sub>f</sub> + (v<sub>i</sub> - v<sub>f</sub>) * e<sup>-rt</sup>
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Exponential {
    rate: f64,
    vi: f64,
    vf: f64,
}

impl Exponential {
    /// **Panics** if `rate` is negative
    pub fn new(rate: f64, vi: f64, vf: f64) -> Self {
        assert_interval!(rate, 0.0, f64::INFINITY);
        Self { rate, vi, vf }
    }
}

impl Decay for Exponential {
    fn evaluate(&self, t: f64) -> f64 {
        let &Self { rate, vi, vf } = self;
        vf + (vi - vf) * (-rate * t).exp()
    }
}
