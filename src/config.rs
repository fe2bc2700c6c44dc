use crate::triangle::Triangle;

/// Run-level bootstrap parameters. The projection mode is fixed on the
/// engine at construction; everything here scopes one `run_bootstrap` call.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub iterations: u64,
    pub base_seed: u64,
    /// Abort with `ExcessiveFailures` when more than this fraction of
    /// attempted iterations fail projection. The distribution over the
    /// survivors would not be trustworthy past this point.
    pub max_failure_rate: f64,
    /// Propagate the first projection failure instead of skipping it.
    pub fail_fast: bool,
}

impl BootstrapConfig {
    pub fn canonical() -> Self {
        BootstrapConfig {
            iterations: 1_000,
            base_seed: 42,
            max_failure_rate: 0.5,
            fail_fast: false,
        }
    }
}

/// The classic Taylor–Ashe paid-loss triangle (10 accident years,
/// cumulative). Demo dataset for the CLI, the trace binary, and the benches.
pub fn canonical_triangle() -> Triangle {
    Triangle::from_rows(&[
        vec![
            357_848.0, 1_124_788.0, 1_735_330.0, 2_218_270.0, 2_745_596.0, 3_319_994.0,
            3_466_336.0, 3_606_286.0, 3_833_515.0, 3_901_463.0,
        ],
        vec![
            352_118.0, 1_236_139.0, 2_170_033.0, 3_353_322.0, 3_799_067.0, 4_120_063.0,
            4_647_867.0, 4_914_039.0, 5_339_085.0,
        ],
        vec![
            290_507.0, 1_292_306.0, 2_218_525.0, 3_235_179.0, 3_985_995.0, 4_132_918.0,
            4_628_910.0, 4_909_315.0,
        ],
        vec![
            310_608.0, 1_418_858.0, 2_195_047.0, 3_757_447.0, 4_029_929.0, 4_381_982.0,
            4_588_268.0,
        ],
        vec![443_160.0, 1_136_350.0, 2_128_333.0, 2_897_821.0, 3_402_672.0, 3_873_311.0],
        vec![396_132.0, 1_333_217.0, 2_180_715.0, 2_985_752.0, 3_691_712.0],
        vec![440_832.0, 1_288_463.0, 2_419_861.0, 3_483_130.0],
        vec![359_480.0, 1_421_128.0, 2_864_498.0],
        vec![376_686.0, 1_363_294.0],
        vec![344_014.0],
    ])
    .expect("canonical triangle is well-formed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_triangle_is_ten_by_ten() {
        let tri = canonical_triangle();
        assert_eq!(tri.n(), 10);
        assert_eq!(tri.get(0, 0), 357_848.0);
        assert_eq!(tri.get(9, 0), 344_014.0);
        assert_eq!(tri.get(0, 9), 3_901_463.0);
    }

    #[test]
    fn canonical_triangle_rows_are_increasing() {
        let tri = canonical_triangle();
        for i in 0..tri.n() {
            for j in 1..=tri.last_observed_dev(i) {
                assert!(
                    tri.get(i, j) > tri.get(i, j - 1),
                    "cumulative paid must grow at ({i}, {j})"
                );
            }
        }
    }

    #[test]
    fn canonical_config_defaults() {
        let config = BootstrapConfig::canonical();
        assert!(config.iterations > 0);
        assert!(config.max_failure_rate > 0.0 && config.max_failure_rate <= 1.0);
        assert!(!config.fail_fast);
    }
}
