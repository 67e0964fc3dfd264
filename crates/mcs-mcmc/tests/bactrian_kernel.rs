use mcs_core::RngHandle;
use mcs_mcmc::{Bactrian, BactrianMode, KernelConfig, KernelDistribution};

fn moments(kernel: &mut Bactrian, scale: f64, draws: usize, seed: u64) -> (f64, f64, f64) {
    let mut rng = RngHandle::from_seed(seed);
    let samples: Vec<f64> = (0..draws)
        .map(|_| kernel.random_delta(0, 3.0, scale, &mut rng))
        .collect();
    let mean = samples.iter().sum::<f64>() / draws as f64;
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / draws as f64;
    let near_zero = samples.iter().filter(|x| x.abs() < 0.1 * scale).count() as f64 / draws as f64;
    (mean, variance, near_zero)
}

#[test]
fn normal_mixture_is_centred_with_scaled_unit_variance() {
    let mut kernel = Bactrian::default();
    assert_eq!(kernel.offset(), 0.95);
    let (mean, variance, near_zero) = moments(&mut kernel, 2.0, 200_000, 11);
    assert!(mean.abs() < 0.02, "mean {mean}");
    assert!((variance - 4.0).abs() < 0.08, "variance {variance}");
    // both humps sit far from zero
    assert!(near_zero < 0.01, "mass near zero {near_zero}");
}

#[test]
fn uniform_mixture_matches_normal_moments() {
    let mut kernel = Bactrian::new(0.9, BactrianMode::Uniform).unwrap();
    let (mean, variance, _) = moments(&mut kernel, 0.5, 200_000, 12);
    assert!(mean.abs() < 0.01, "mean {mean}");
    assert!((variance - 0.25).abs() < 0.01, "variance {variance}");
}

#[test]
fn same_seed_gives_same_draws() {
    let mut a = Bactrian::default();
    let mut b = Bactrian::default();
    let mut rng_a = RngHandle::from_seed(99);
    let mut rng_b = RngHandle::from_seed(99);
    for _ in 0..100 {
        assert_eq!(
            a.random_delta(0, 0.0, 1.0, &mut rng_a),
            b.random_delta(0, 0.0, 1.0, &mut rng_b)
        );
    }
}

#[test]
fn kernel_config_parses_mode_and_offset() {
    let config: KernelConfig = serde_yaml::from_str("mode: uniform\nm: 0.8\n").unwrap();
    let kernel = config.build().unwrap();
    assert_eq!(kernel.mode(), BactrianMode::Uniform);
    assert_eq!(kernel.offset(), 0.8);

    let config: KernelConfig = serde_yaml::from_str("m: 1.0\n").unwrap();
    let err = config.build().unwrap_err();
    assert_eq!(err.info().code, "bactrian-offset");
}
