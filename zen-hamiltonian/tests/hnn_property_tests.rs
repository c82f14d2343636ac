//! Property tests for padding, sampling, optimizer updates and agreement ratios

use ndarray::{s, Array1, Array2};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use zen_hamiltonian::hnn_api::*;

fn matrix(rows: usize, values: Vec<f64>) -> Array2<f64> {
  let cols = values.len() / rows;
  Array2::from_shape_vec((rows, cols), values[..rows * cols].to_vec()).unwrap()
}

fn small_config(seed: u64) -> NetworkConfig {
  NetworkConfig::builder()
    .input_dim(2)
    .hidden_dim(3)
    .num_layers(2)
    .chunk(4)
    .seed(seed)
    .build()
    .unwrap()
}

proptest! {
  #[test]
  fn prop_embed_input_pads_and_is_idempotent(
    d0 in 1usize..5,
    extra in 0usize..4,
    values in prop::collection::vec(-10.0f64..10.0, 5..40),
  ) {
    let input = matrix(d0, values);
    let d = d0 + extra;
    let embedded = embed_input(input.view(), d).unwrap();

    prop_assert_eq!(embedded.dim(), (d, input.ncols()));
    prop_assert_eq!(embedded.slice(s![..d0, ..]), input.view());
    prop_assert!(embedded.slice(s![d0.., ..]).iter().all(|&v| v == 0.0));
    prop_assert_eq!(embed_input(embedded.view(), d).unwrap(), embedded);
  }

  #[test]
  fn prop_epoch_draws_every_index_once(
    total in 1usize..60,
    chunk in 1usize..20,
    seed in any::<u64>(),
  ) {
    let input = Array2::from_shape_fn((1, total), |(_, c)| c as f64);
    let target = input.clone();
    let mut sampler = BatchSampler::new(total, chunk, Some(seed)).unwrap();

    let mut seen = HashSet::new();
    for draw in 0..sampler.draws_per_epoch() {
      let batch = sampler.next_batch(input.view(), target.view(), 1).unwrap();
      let expected = if draw + 1 < sampler.draws_per_epoch() || total % chunk == 0 {
        chunk.min(total)
      } else {
        total % chunk
      };
      prop_assert_eq!(batch.width(), expected);
      for idx in batch.indices {
        prop_assert!(seen.insert(idx));
      }
    }
    prop_assert_eq!(seen, (0..total).collect::<HashSet<_>>());
    prop_assert_eq!(sampler.epochs_completed(), 1);
  }

  #[test]
  fn prop_vanilla_update_is_exact(
    seed in any::<u64>(),
    tau in 1e-4f64..1.0,
  ) {
    let config = small_config(seed);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let theta = Parameters::initialize(&config, &mut rng).unwrap();
    let gradient = Parameters::initialize(&config, &mut rng).unwrap();

    let mut container = ParameterContainer::new(theta.clone(), AdamConfig::default());
    container.update_parameters(&gradient, OptimizerMethod::Vanilla, tau, 1).unwrap();

    for (k, w) in container.theta().weights.iter().enumerate() {
      prop_assert_eq!(w, &(&theta.weights[k] - &(&gradient.weights[k] * tau)));
    }
    prop_assert_eq!(
      &container.theta().output_bias,
      &(&theta.output_bias - &(&gradient.output_bias * tau))
    );
  }

  #[test]
  fn prop_adam_first_step_moves_by_tau(
    seed in any::<u64>(),
    tau in 1e-3f64..0.5,
  ) {
    let config = small_config(seed);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let theta = Parameters::initialize(&config, &mut rng).unwrap();
    let gradient = Parameters::initialize(&config, &mut rng).unwrap();

    let mut container = ParameterContainer::new(theta.clone(), AdamConfig::default());
    container.update_parameters(&gradient, OptimizerMethod::Adam, tau, 1).unwrap();

    // m̂ = g and v̂ = g² on the first step, so each entry moves by tau·g/(|g| + ε)
    for (k, w) in container.theta().weights.iter().enumerate() {
      for ((&new, &old), &g) in w.iter().zip(theta.weights[k].iter()).zip(gradient.weights[k].iter()) {
        let expected = old - tau * g / (g.abs() + 1e-8);
        prop_assert!((new - expected).abs() <= 1e-12 * (1.0 + expected.abs()));
      }
    }
    prop_assert_eq!(container.adam_step(), Some(1));
  }

  #[test]
  fn prop_find_ratio_is_one_on_equality(
    seed in any::<u64>(),
    tol in 1e-12f64..1.0,
    values in prop::collection::vec(-1.0f64..1.0, 8),
  ) {
    let mut z0 = Array2::zeros((3, 4));
    z0.slice_mut(s![..2, ..]).assign(&matrix(2, values));

    let mut net = HamiltonianNetwork::new(small_config(seed), z0.clone(), Array2::zeros((1, 4))).unwrap();
    let prediction = net.calculate_output(z0.view()).unwrap();
    net.set_batch(z0, prediction).unwrap();
    net.forward_function();

    prop_assert_eq!(find_ratio(&net, tol).unwrap(), 1.0);
  }

  #[test]
  fn prop_first_trajectory_point_is_initial_condition(
    q0 in -5.0f64..5.0,
    p0 in -5.0f64..5.0,
    steps in 1usize..50,
  ) {
    let energy = QuadraticEnergy::new(2.0, 1);
    let times = Array1::linspace(0.0, 0.01 * steps as f64, steps + 1);
    let trajectory = StormerVerlet::new(&energy, &energy)
      .integrate(Array1::from(vec![q0]).view(), Array1::from(vec![p0]).view(), times.view())
      .unwrap();

    prop_assert_eq!(trajectory.len(), steps + 1);
    prop_assert_eq!(trajectory.points()[0].q[0], q0);
    prop_assert_eq!(trajectory.points()[0].p[0], p0);
  }
}
