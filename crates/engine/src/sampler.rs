//! Token sampling with temperature, top-K and nucleus (top-P) filtering.

use crate::DecodingConfig;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seeded sampler over next-token logits.
///
/// Create one per generation call: the RNG starts from `config.seed`, so two
/// calls with the same prompt draw the same tokens.
#[derive(Debug, Clone)]
pub struct Sampler {
    top_k: usize,
    top_p: f32,
    temperature: f32,
    rng: ChaCha8Rng,
}

impl Sampler {
    pub fn new(config: &DecodingConfig) -> Self {
        Self {
            top_k: config.top_k,
            top_p: config.top_p,
            temperature: config.temperature,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
        }
    }

    /// Pick the next token id. `None` when no logit is finite.
    pub fn sample(&mut self, logits: &[f32]) -> Option<u32> {
        let mut candidates: Vec<(u32, f32)> = logits
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_finite())
            .map(|(i, l)| (i as u32, *l))
            .collect();
        if candidates.is_empty() {
            return None;
        }

        // Highest logit first; ties keep the lower id.
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        if self.temperature <= 0.0 || self.top_k == 1 {
            return Some(candidates[0].0);
        }
        if self.top_k > 0 {
            candidates.truncate(self.top_k);
        }

        let max = candidates[0].1 / self.temperature;
        let mut probs: Vec<f32> = candidates
            .iter()
            .map(|(_, l)| (l / self.temperature - max).exp())
            .collect();
        let sum: f32 = probs.iter().sum();
        for p in probs.iter_mut() {
            *p /= sum;
        }

        let mut keep = probs.len();
        if self.top_p > 0.0 && self.top_p < 1.0 {
            let mut cumulative = 0.0;
            for (i, p) in probs.iter().enumerate() {
                cumulative += p;
                if cumulative >= self.top_p {
                    keep = i + 1;
                    break;
                }
            }
        }

        let kept = &probs[..keep];
        let total: f32 = kept.iter().sum();
        let mut target = self.rng.gen::<f32>() * total;
        for (i, p) in kept.iter().enumerate() {
            if target < *p {
                return Some(candidates[i].0);
            }
            target -= p;
        }
        Some(candidates[keep - 1].0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(top_k: usize, top_p: f32, temperature: f32, seed: u64) -> DecodingConfig {
        DecodingConfig {
            max_tokens: 16,
            top_k,
            top_p,
            temperature,
            seed,
        }
    }

    fn logits() -> Vec<f32> {
        vec![0.5, 2.0, 1.9, -1.0, 1.8, 0.0, 1.7, 0.2]
    }

    #[test]
    fn test_zero_temperature_is_greedy() {
        let mut sampler = Sampler::new(&config(40, 0.9, 0.0, 0));
        for _ in 0..20 {
            assert_eq!(sampler.sample(&logits()), Some(1));
        }
    }

    #[test]
    fn test_top_k_one_is_greedy() {
        let mut sampler = Sampler::new(&config(1, 1.0, 1.0, 9));
        assert_eq!(sampler.sample(&logits()), Some(1));
    }

    #[test]
    fn test_same_seed_draws_same_sequence() {
        let cfg = DecodingConfig::default();
        let mut a = Sampler::new(&cfg);
        let mut b = Sampler::new(&cfg);
        let draws_a: Vec<_> = (0..64).map(|_| a.sample(&logits())).collect();
        let draws_b: Vec<_> = (0..64).map(|_| b.sample(&logits())).collect();
        assert_eq!(draws_a, draws_b);
    }

    #[test]
    fn test_draws_stay_inside_top_k() {
        let mut sampler = Sampler::new(&config(3, 1.0, 5.0, 42));
        for _ in 0..200 {
            let id = sampler.sample(&logits()).unwrap();
            assert!([1, 2, 4].contains(&id), "drew {id}");
        }
    }

    #[test]
    fn test_small_top_p_keeps_only_best() {
        let mut sampler = Sampler::new(&config(40, 0.01, 0.7, 3));
        for _ in 0..50 {
            assert_eq!(sampler.sample(&logits()), Some(1));
        }
    }

    #[test]
    fn test_masked_logits_are_never_drawn() {
        let mut sampler = Sampler::new(&config(40, 1.0, 1.0, 11));
        let masked = vec![f32::NEG_INFINITY, 1.0, f32::NAN, 1.0];
        for _ in 0..100 {
            let id = sampler.sample(&masked).unwrap();
            assert!(id == 1 || id == 3);
        }
    }

    #[test]
    fn test_no_finite_logits() {
        let mut sampler = Sampler::new(&DecodingConfig::default());
        assert_eq!(sampler.sample(&[]), None);
        assert_eq!(sampler.sample(&[f32::NEG_INFINITY]), None);
    }
}
