use std::collections::BTreeSet;
use swave_dataset::{split, split_random, split_stratified, Split, SplitConfig, SplitStrategy};

fn assert_partition(split: &Split, n: usize) {
    let train: BTreeSet<_> = split.train.iter().copied().collect();
    let test: BTreeSet<_> = split.test.iter().copied().collect();
    assert_eq!(train.len(), split.train.len(), "train has duplicates");
    assert_eq!(test.len(), split.test.len(), "test has duplicates");
    assert!(train.is_disjoint(&test));
    let union: Vec<_> = train.union(&test).copied().collect();
    assert_eq!(union, (0..n).collect::<Vec<_>>());
}

fn labels_with_positive_ratio(n: usize, every: usize) -> Vec<i64> {
    (0..n).map(|i| i64::from(i % every == 0)).collect()
}

#[test]
fn stratified_split_is_a_partition_and_keeps_proportions() {
    for (n, every, fraction) in [(690, 3, 0.2), (46, 4, 0.2), (46, 2, 0.3), (17, 5, 0.5), (9, 9, 0.25)] {
        let labels = labels_with_positive_ratio(n, every);
        let split = split_stratified(&labels, fraction, 42).unwrap();
        assert_partition(&split, n);

        let test_len = split.test.len();
        let expected_train = ((1.0 - fraction) * n as f64).round() as usize;
        assert_eq!(split.train.len(), expected_train);
        if test_len == 0 {
            continue;
        }
        let full_pos = labels.iter().filter(|l| **l == 1).count() as f64 / n as f64;
        let test_pos =
            split.test.iter().filter(|i| labels[**i] == 1).count() as f64 / test_len as f64;
        // Whole-sample counts can only track the full proportion to within one test
        // sample, so the bound is 1/test_len rather than 1/n.
        assert!(
            (test_pos - full_pos).abs() < 1.0 / test_len as f64,
            "n={n} test_pos={test_pos} full_pos={full_pos}"
        );
    }
}

#[test]
fn stratified_split_on_case_labels_matches_expected_counts() {
    // 46 cases, 15 positive.
    let labels: Vec<i64> = (0..46).map(|i| i64::from(i < 15)).collect();
    let split = split_stratified(&labels, 0.2, 7).unwrap();
    assert_eq!(split.test.len(), 9);
    let test_pos = split.test.iter().filter(|i| labels[**i] == 1).count();
    // 9 * 15 / 46 = 2.93
    assert_eq!(test_pos, 3);
}

#[test]
fn random_split_sizes_follow_rounding_rule() {
    let split = split_random(46, 0.2, 42).unwrap();
    assert_partition(&split, 46);
    assert_eq!(split.train.len(), 37);
    assert_eq!(split.test.len(), 9);

    let split = split_random(5, 0.5, 1).unwrap();
    assert_eq!((split.train.len(), split.test.len()), (3, 2));
}

#[test]
fn fixed_seed_reproduces_the_same_partition() {
    let labels = labels_with_positive_ratio(690, 3);
    for strategy in [SplitStrategy::Stratified, SplitStrategy::Random] {
        let cfg = SplitConfig {
            strategy,
            test_fraction: 0.2,
            seed: 1234,
            ..Default::default()
        };
        let a = split(&labels, &cfg).unwrap();
        let b = split(&labels, &cfg).unwrap();
        assert_eq!(a, b);

        let other = split(&labels, &SplitConfig { seed: 99, ..cfg }).unwrap();
        assert_ne!(a, other, "{strategy:?} ignored the seed");
    }
}

#[test]
fn extreme_fractions_put_everything_on_one_side() {
    let labels = labels_with_positive_ratio(10, 2);
    let all_train = split_stratified(&labels, 0.0, 0).unwrap();
    assert_eq!(all_train.train.len(), 10);
    assert!(all_train.test.is_empty());

    let all_test = split_random(10, 1.0, 0).unwrap();
    assert!(all_test.train.is_empty());
    assert_eq!(all_test.test.len(), 10);
}

#[test]
fn invalid_inputs_are_rejected() {
    assert!(split_stratified(&[], 0.2, 0).is_err());
    assert!(split_random(10, -0.1, 0).is_err());
    assert!(split_random(10, f64::NAN, 0).is_err());
}

#[test]
fn case_split_keeps_planes_together() {
    use swave_dataset::expand_cases;
    let labels: Vec<i64> = (0..46).map(|i| i64::from(i % 3 == 0)).collect();
    let cases = split_stratified(&labels, 0.2, 5).unwrap();
    let samples = expand_cases(&cases, 15);
    assert_partition(&samples, 690);
    assert_eq!(samples.test.len(), cases.test.len() * 15);
    for case in &cases.test {
        for plane in 0..15 {
            assert!(samples.test.contains(&(case * 15 + plane)));
        }
    }
}
