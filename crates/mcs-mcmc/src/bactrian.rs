use mcs_core::errors::ErrorInfo;
use mcs_core::{McsError, RngHandle};
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

/// Sampling strategy that turns a scale into a random perturbation.
///
/// Implementations must be symmetric about zero so that moves built on them
/// carry no Hastings correction.
pub trait KernelDistribution {
    /// Draws a perturbation for dimension `dim` currently holding `value`.
    fn random_delta(&mut self, dim: usize, value: f64, scale: f64, rng: &mut RngHandle) -> f64;
}

/// Shape of the two mixture components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BactrianMode {
    /// Gaussian components `N(±m, 1 - m²)`.
    #[default]
    Normal,
    /// Uniform components with the same mean and variance as the Gaussians.
    Uniform,
}

/// Bimodal mixture `½·N(-m, 1-m²) + ½·N(+m, 1-m²)`, unit variance before scaling.
///
/// Keeping mass away from zero avoids wasting proposals on tiny steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bactrian {
    m: f64,
    mode: BactrianMode,
}

/// Mixture offset used when none is configured.
pub const DEFAULT_BACTRIAN_OFFSET: f64 = 0.95;

impl Bactrian {
    /// Creates a kernel with mixture offset `m`, which must lie strictly in `(0, 1)`.
    pub fn new(m: f64, mode: BactrianMode) -> Result<Self, McsError> {
        if !(m > 0.0 && m < 1.0) {
            return Err(McsError::Config(
                ErrorInfo::new("bactrian-offset", "mixture offset must lie in (0, 1)")
                    .with_context("m", m.to_string()),
            ));
        }
        Ok(Self { m, mode })
    }

    /// Mixture offset.
    pub fn offset(&self) -> f64 {
        self.m
    }

    /// Component shape.
    pub fn mode(&self) -> BactrianMode {
        self.mode
    }

    fn unit_draw(&self, rng: &mut RngHandle) -> f64 {
        let spread = (1.0 - self.m * self.m).sqrt();
        let z = match self.mode {
            BactrianMode::Normal => {
                let noise: f64 = StandardNormal.sample(rng);
                self.m + noise * spread
            }
            BactrianMode::Uniform => {
                let half_width = 3f64.sqrt() * spread;
                self.m + (2.0 * rng.uniform() - 1.0) * half_width
            }
        };
        if rng.coin() {
            -z
        } else {
            z
        }
    }
}

impl Default for Bactrian {
    fn default() -> Self {
        Self {
            m: DEFAULT_BACTRIAN_OFFSET,
            mode: BactrianMode::Normal,
        }
    }
}

impl KernelDistribution for Bactrian {
    fn random_delta(&mut self, _dim: usize, _value: f64, scale: f64, rng: &mut RngHandle) -> f64 {
        self.unit_draw(rng) * scale
    }
}

/// YAML-configurable kernel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Component shape.
    #[serde(default)]
    pub mode: BactrianMode,
    /// Mixture offset.
    #[serde(default = "default_offset")]
    pub m: f64,
}

fn default_offset() -> f64 {
    DEFAULT_BACTRIAN_OFFSET
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            mode: BactrianMode::default(),
            m: default_offset(),
        }
    }
}

impl KernelConfig {
    /// Builds the configured kernel.
    pub fn build(&self) -> Result<Bactrian, McsError> {
        Bactrian::new(self.m, self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_outside_open_interval_are_rejected() {
        for m in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let err = Bactrian::new(m, BactrianMode::Normal).unwrap_err();
            assert!(err.is_config());
        }
        assert!(Bactrian::new(0.5, BactrianMode::Uniform).is_ok());
    }

    #[test]
    fn uniform_draws_stay_inside_component_support() {
        let mut kernel = Bactrian::new(0.8, BactrianMode::Uniform).unwrap();
        let mut rng = RngHandle::from_seed(5);
        let half_width = 3f64.sqrt() * 0.6;
        for _ in 0..10_000 {
            let delta = kernel.random_delta(0, 0.0, 1.0, &mut rng).abs();
            assert!(delta >= 0.8 - half_width - 1e-12);
            assert!(delta <= 0.8 + half_width + 1e-12);
        }
    }
}
