//! Tests of the convergence diagnostics on synthetic chain collections with known behavior:
//! agreeing chains, one displaced chain, and degenerate inputs.

#[cfg(test)]
mod tests {
    use ndarray::{concatenate, s, Array3, Axis};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::StandardNormal;
    use regression_diagnostics::chains::ChainCollection;
    use regression_diagnostics::stats::{
        effective_independence_check, gelman_rubin, max_rhat, split_gelman_rubin,
    };
    use regression_diagnostics::summary::{summarize, Scope, TailProbs};
    use regression_diagnostics::DiagnosticsError;

    // Shared constants.
    const N_CHAINS: usize = 4;
    const N_DRAWS: usize = 50;
    const SEED: u64 = 42;

    /// `N_CHAINS` chains of `N_DRAWS` standard normal draws of one parameter `theta`, with
    /// the last chain shifted by `offset`.
    fn chains_with_offset(offset: f64, seed: u64) -> ChainCollection {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut data = Array3::from_shape_simple_fn((N_CHAINS, N_DRAWS, 1), || {
            rng.sample::<f64, _>(StandardNormal)
        });
        data.slice_mut(s![N_CHAINS - 1, .., 0])
            .mapv_inplace(|v| v + offset);
        ChainCollection::new(vec!["theta".to_string()], data).unwrap()
    }

    /// Three N(0, 1) chains and one N(5, 1) chain must not look converged.
    #[test]
    fn test_displaced_chain_is_flagged() {
        let records = gelman_rubin(&chains_with_offset(5.0, SEED)).unwrap();
        assert_eq!(records.len(), 1);
        assert!(
            records[0].rhat > 1.1,
            "R-hat of a displaced chain unexpectedly small: {}",
            records[0].rhat
        );
        assert!(records[0].between > records[0].within);
    }

    /// Four chains drawn from the same distribution should give R-hat close to 1.
    #[test]
    fn test_agreeing_chains_look_converged() {
        for seed in 0..5 {
            let records = gelman_rubin(&chains_with_offset(0.0, seed)).unwrap();
            assert!(
                records[0].rhat < 1.1,
                "seed {seed}: R-hat = {}",
                records[0].rhat
            );
        }
    }

    /// Copies of one chain have no between-chain variance, leaving R-hat at
    /// `sqrt((T - 1) / T)`.
    #[test]
    fn test_identical_chains() {
        for n_draws in [N_DRAWS, 2_000] {
            let mut rng = SmallRng::seed_from_u64(SEED);
            let one = Array3::from_shape_simple_fn((1, n_draws, 2), || {
                rng.sample::<f64, _>(StandardNormal)
            });
            let data = concatenate(Axis(0), &[one.view(), one.view(), one.view(), one.view()])
                .unwrap();
            let chains =
                ChainCollection::new(vec!["a".to_string(), "b".to_string()], data).unwrap();
            let t = n_draws as f64;
            for record in gelman_rubin(&chains).unwrap() {
                assert!(record.between.abs() < 1e-9);
                assert!(
                    (record.rhat - ((t - 1.0) / t).sqrt()).abs() < 1e-9,
                    "T = {n_draws}: {record:?}"
                );
                assert!(record.rhat <= 1.0 + 1e-9);
            }
        }
    }

    #[test]
    fn test_single_chain_is_rejected() {
        let data = Array3::<f64>::zeros((1, 100, 1));
        let chains = ChainCollection::new(vec!["theta".to_string()], data).unwrap();
        assert_eq!(
            gelman_rubin(&chains),
            Err(DiagnosticsError::InsufficientChains {
                required: 2,
                found: 1
            })
        );
        // Split R-hat still works on a single chain.
        assert!(split_gelman_rubin(&chains).is_ok());
    }

    /// The ordering of records follows the parameter columns, whatever the thread schedule.
    #[test]
    fn test_records_follow_parameter_order() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let n_params = 16;
        let data = Array3::from_shape_simple_fn((N_CHAINS, N_DRAWS, n_params), || {
            rng.sample::<f64, _>(StandardNormal)
        });
        let names: Vec<String> = (0..n_params).map(|i| format!("beta[{i}]")).collect();
        let chains = ChainCollection::new(names.clone(), data).unwrap();

        let first = gelman_rubin(&chains).unwrap();
        let second = gelman_rubin(&chains).unwrap();
        assert_eq!(first, second);
        let got: Vec<&str> = first.iter().map(|r| r.parameter.as_str()).collect();
        let want: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(got, want);
        assert!(max_rhat(&first).unwrap() < 1.3);
    }

    /// A chain that wanders slowly shows a high lag-1 autocorrelation, white noise does not.
    #[test]
    fn test_mixing_check_separates_sticky_chains() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut data = Array3::<f64>::zeros((2, 2_000, 1));
        let mut prev = 0.0;
        for v in data.slice_mut(s![0, .., 0]).iter_mut() {
            prev = 0.9 * prev + rng.sample::<f64, _>(StandardNormal);
            *v = prev;
        }
        for v in data.slice_mut(s![1, .., 0]).iter_mut() {
            *v = rng.sample::<f64, _>(StandardNormal);
        }
        let chains = ChainCollection::new(vec!["theta".to_string()], data).unwrap();
        let records = effective_independence_check(&chains).unwrap();
        assert!((records[0].lag1 - 0.9).abs() < 0.05, "{:?}", records[0]);
        assert!(records[1].lag1.abs() < 0.1, "{:?}", records[1]);
    }

    /// Per-chain means expose the displaced chain that the pooled summary averages away.
    #[test]
    fn test_per_chain_summary_shows_displacement() {
        let chains = chains_with_offset(5.0, SEED);
        let per_chain = summarize(&chains, Scope::PerChain, TailProbs::default()).unwrap();
        assert_eq!(per_chain.len(), N_CHAINS);
        for record in &per_chain[..N_CHAINS - 1] {
            assert!(record.mean.abs() < 1.0, "{record:?}");
        }
        assert!(per_chain[N_CHAINS - 1].mean > 4.0);

        let pooled = summarize(&chains, Scope::Pooled, TailProbs::default()).unwrap();
        assert_eq!(pooled.len(), 1);
        assert_eq!(pooled[0].n_draws, N_CHAINS * N_DRAWS);
        let mean_of_means = per_chain.iter().map(|r| r.mean).sum::<f64>() / N_CHAINS as f64;
        assert!((pooled[0].mean - mean_of_means).abs() < 1e-12);
    }
}
