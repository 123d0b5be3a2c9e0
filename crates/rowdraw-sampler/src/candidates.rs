use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::estimate::KeyDomain;

/// Source of uniform candidates. Seeded generators replay the same draws.
#[derive(Debug, Clone)]
pub struct CandidateGenerator {
    rng: StdRng,
}

impl CandidateGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// `batch_size` independent uniform draws from `[domain.min, domain.max]`.
    pub fn generate(&mut self, domain: &KeyDomain, batch_size: usize) -> Vec<i64> {
        let dist = Uniform::new_inclusive(domain.min, domain.max);
        dist.sample_iter(&mut self.rng).take(batch_size).collect()
    }

    /// Uniformly chosen `amount` distinct indices out of `0..length`, in random order.
    pub fn choose_indices(&mut self, length: usize, amount: usize) -> Vec<usize> {
        rand::seq::index::sample(&mut self.rng, length, amount.min(length)).into_vec()
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}

/// Every integer of the domain in ascending chunks of at most `chunk` values.
pub fn enumerate_domain(domain: KeyDomain, chunk: usize) -> impl Iterator<Item = Vec<i64>> {
    let chunk = chunk.max(1) as i128;
    let max = domain.max as i128;
    let mut next = domain.min as i128;
    std::iter::from_fn(move || {
        if next > max {
            return None;
        }
        let end = (next + chunk - 1).min(max);
        let batch = (next..=end).map(|v| v as i64).collect();
        next = end + 1;
        Some(batch)
    })
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashSet;

    use super::*;

    #[test]
    fn test_generate_stays_in_domain() {
        let domain = KeyDomain::new(-5, 5, 11).unwrap();
        let mut generator = CandidateGenerator::new(Some(1));
        let draws = generator.generate(&domain, 1_000);
        assert_eq!(draws.len(), 1_000);
        assert!(draws.iter().all(|v| (-5..=5).contains(v)));
        let distinct: FxHashSet<i64> = draws.into_iter().collect();
        assert_eq!(distinct.len(), 11);
    }

    #[test]
    fn test_seeded_generators_replay() {
        let domain = KeyDomain::new(1, 1_000_000, 10).unwrap();
        let a = CandidateGenerator::new(Some(42)).generate(&domain, 50);
        let b = CandidateGenerator::new(Some(42)).generate(&domain, 50);
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_value_domain() {
        let domain = KeyDomain::new(7, 7, 1).unwrap();
        let draws = CandidateGenerator::new(None).generate(&domain, 3);
        assert_eq!(draws, vec![7, 7, 7]);
    }

    #[test]
    fn test_choose_indices_distinct() {
        let mut generator = CandidateGenerator::new(Some(3));
        let picked = generator.choose_indices(10, 4);
        assert_eq!(picked.len(), 4);
        let distinct: FxHashSet<usize> = picked.iter().copied().collect();
        assert_eq!(distinct.len(), 4);
        assert!(picked.iter().all(|i| *i < 10));
        assert_eq!(generator.choose_indices(3, 10).len(), 3);
    }

    #[test]
    fn test_enumerate_domain_chunks() {
        let domain = KeyDomain::new(1, 7, 7).unwrap();
        let chunks: Vec<Vec<i64>> = enumerate_domain(domain, 3).collect();
        assert_eq!(chunks, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);

        let edge = KeyDomain::new(i64::MAX - 1, i64::MAX, 2).unwrap();
        let chunks: Vec<Vec<i64>> = enumerate_domain(edge, 10).collect();
        assert_eq!(chunks, vec![vec![i64::MAX - 1, i64::MAX]]);
    }
}
