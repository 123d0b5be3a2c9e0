use rowdraw::{RelationName, SampleOptions, Sampler};
use rowdraw_test_utils::{
    chi_square_critical_001, chi_square_uniform, column_i64, column_strings, gapped_catalog,
    text_catalog,
};
use rustc_hash::FxHashMap;

const TRIALS: u64 = 2_000;

fn rel(name: &str) -> RelationName {
    RelationName::parse(name).unwrap()
}

#[test]
fn test_keyed_draws_are_uniform_over_gapped_keys() {
    let keys: Vec<i64> = (0..20).map(|i| i * i).collect();
    let sampler = Sampler::new(gapped_catalog(&keys));
    let mut counts: FxHashMap<i64, u64> = keys.iter().map(|k| (*k, 0)).collect();

    for seed in 0..TRIALS {
        let options = SampleOptions::new(5).with_key_column("id").with_seed(seed);
        let outcome = sampler.sample(&rel("items"), &options).unwrap();
        for key in column_i64(&outcome.table, "id") {
            *counts.get_mut(&key).unwrap() += 1;
        }
    }

    let observed: Vec<u64> = keys.iter().map(|k| counts[k]).collect();
    assert_eq!(observed.iter().sum::<u64>(), TRIALS * 5);
    let statistic = chi_square_uniform(&observed);
    let critical = chi_square_critical_001(observed.len() - 1);
    assert!(
        statistic < critical,
        "chi-square {} exceeds {} for counts {:?}",
        statistic,
        critical,
        observed
    );
}

#[test]
fn test_keyless_draws_are_uniform_over_positions() {
    let sampler = Sampler::new(text_catalog(10));
    let mut counts: FxHashMap<String, u64> = FxHashMap::default();

    for seed in 0..TRIALS {
        let options = SampleOptions::new(3).with_seed(seed);
        let outcome = sampler.sample(&rel("notes"), &options).unwrap();
        for title in column_strings(&outcome.table, "title") {
            *counts.entry(title).or_default() += 1;
        }
    }

    assert_eq!(counts.len(), 10);
    let observed: Vec<u64> = counts.values().copied().collect();
    let statistic = chi_square_uniform(&observed);
    let critical = chi_square_critical_001(observed.len() - 1);
    assert!(
        statistic < critical,
        "chi-square {} exceeds {} for counts {:?}",
        statistic,
        critical,
        observed
    );
}

#[test]
fn test_reduction_does_not_favour_store_order() {
    // Every call enumerates and over-collects, so only the reduction step picks rows.
    let keys: Vec<i64> = (1..=12).collect();
    let sampler = Sampler::new(gapped_catalog(&keys));
    let mut counts = vec![0u64; keys.len()];

    for seed in 0..TRIALS {
        let options = SampleOptions::new(4)
            .with_key_column("id")
            .with_gaps(20.0)
            .with_seed(seed);
        let outcome = sampler.sample(&rel("items"), &options).unwrap();
        assert!(outcome.stats.enumerated);
        for key in column_i64(&outcome.table, "id") {
            counts[(key - 1) as usize] += 1;
        }
    }

    let statistic = chi_square_uniform(&counts);
    assert!(statistic < chi_square_critical_001(counts.len() - 1), "{:?}", counts);
}
