use anyhow::{Context, Result, bail};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

const SWEEP_PREFIX: &str = "sweep:";
const MAX_SWEEP: usize = 10_000;

/// Resolve CLI seed tokens into concrete seeds.
///
/// Accepts literal integers and `sweep:<base>:<count>`, which expands to
/// `count` seeds drawn from a `ChaCha20` stream keyed by `base`. Duplicates
/// are dropped while preserving first-seen order.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds: Vec<u64> = Vec::new();
    for token in tokens {
        if let Some(rest) = token.strip_prefix(SWEEP_PREFIX) {
            seeds.extend(expand_sweep(rest)?);
        } else {
            let seed = token
                .parse::<u64>()
                .with_context(|| format!("invalid seed '{token}'"))?;
            seeds.push(seed);
        }
    }

    let mut seen = std::collections::HashSet::new();
    seeds.retain(|seed| seen.insert(*seed));
    if seeds.is_empty() {
        bail!("no seeds supplied");
    }
    Ok(seeds)
}

fn expand_sweep(sweep: &str) -> Result<Vec<u64>> {
    let (base, count) = sweep
        .split_once(':')
        .with_context(|| format!("sweep must look like sweep:<base>:<count>, got '{sweep}'"))?;
    let base = base
        .parse::<u64>()
        .with_context(|| format!("invalid sweep base '{base}'"))?;
    let count = count
        .parse::<usize>()
        .with_context(|| format!("invalid sweep count '{count}'"))?;
    if count == 0 || count > MAX_SWEEP {
        bail!("sweep count must be between 1 and {MAX_SWEEP}");
    }
    let mut rng = ChaCha20Rng::seed_from_u64(base);
    Ok((0..count).map(|_| rng.r#gen::<u64>()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn literal_seeds_keep_order_and_drop_duplicates() {
        let seeds = resolve_seed_inputs(&tokens(&["7", "3", "7"])).unwrap();
        assert_eq!(seeds, vec![7, 3]);
    }

    #[test]
    fn sweep_is_reproducible() {
        let first = resolve_seed_inputs(&tokens(&["sweep:42:5"])).unwrap();
        let second = resolve_seed_inputs(&tokens(&["sweep:42:5"])).unwrap();
        assert_eq!(first.len(), 5);
        assert_eq!(first, second);
        assert_ne!(first, resolve_seed_inputs(&tokens(&["sweep:43:5"])).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(resolve_seed_inputs(&tokens(&["abc"])).is_err());
        assert!(resolve_seed_inputs(&tokens(&["sweep:1"])).is_err());
        assert!(resolve_seed_inputs(&tokens(&["sweep:1:0"])).is_err());
        assert!(resolve_seed_inputs(&[]).is_err());
    }
}
