// core/src/sampling.rs
//
// Weighted choice of one substitute from a scored candidate list.

use rand::Rng;

/// Pick one item with probability proportional to `10^logp`.
///
/// Single pass over the list (weighted reservoir sampling): the i-th item
/// replaces the current pick with probability `p_i / (p_1 + .. + p_i)`.
/// Returns None for an empty list.
pub fn pick_weighted<'a, T, R: Rng + ?Sized>(items: &'a [(T, f64)], rng: &mut R) -> Option<&'a T> {
    let mut sum = 0.0f64;
    let mut picked = None;
    for (item, logp) in items {
        let p = 10f64.powf(*logp);
        sum += p;
        if sum * rng.random::<f64>() <= p {
            picked = Some(item);
        }
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn empty_and_single() {
        let mut rng = StdRng::seed_from_u64(1);
        let none: [(&str, f64); 0] = [];
        assert_eq!(pick_weighted(&none, &mut rng), None);
        for _ in 0..20 {
            assert_eq!(pick_weighted(&[("cat", -3.0)], &mut rng), Some(&"cat"));
        }
    }

    #[test]
    fn frequencies_follow_probabilities() {
        let mut rng = StdRng::seed_from_u64(42);
        let items = [("dog", 0.75f64.log10()), ("cat", 0.25f64.log10())];
        let draws = 20_000;
        let dogs = (0..draws)
            .filter(|_| pick_weighted(&items, &mut rng) == Some(&"dog"))
            .count();
        let share = dogs as f64 / draws as f64;
        assert!((share - 0.75).abs() < 0.02, "dog share {}", share);
    }

    #[test]
    fn vanishing_weight_is_not_picked() {
        let mut rng = StdRng::seed_from_u64(7);
        let items = [("dog", -0.1), ("never", -400.0)];
        for _ in 0..1000 {
            assert_eq!(pick_weighted(&items, &mut rng), Some(&"dog"));
        }
    }

    #[test]
    fn same_seed_same_choices() {
        let items = [("a", -0.5), ("b", -0.6), ("c", -0.7), ("d", -0.8)];
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..50)
                .map(|_| *pick_weighted(&items, &mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(9), run(9));
    }
}
