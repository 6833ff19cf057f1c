//! Deterministic RNG streams segregated by progression domain.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::cell::{RefCell, RefMut};

/// Bundle of independent streams derived from a single user seed.
///
/// Keeping streams apart means an extra narrative draw never shifts the
/// outcome of a later tribulation roll.
#[derive(Debug, Clone)]
pub struct RngBundle {
    seed: u64,
    accrual: RefCell<CountingRng<SmallRng>>,
    tribulation: RefCell<CountingRng<SmallRng>>,
    narrative: RefCell<CountingRng<SmallRng>>,
    schedule: RefCell<CountingRng<SmallRng>>,
}

/// Draw counters per stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngDraws {
    pub accrual: u64,
    pub tribulation: u64,
    pub narrative: u64,
    pub schedule: u64,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            seed,
            accrual: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"accrual"))),
            tribulation: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"tribulation"))),
            narrative: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"narrative"))),
            schedule: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"schedule"))),
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Deviation rolls during accrual.
    #[must_use]
    pub fn accrual(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.accrual.borrow_mut()
    }

    /// Breakthrough tribulation rolls.
    #[must_use]
    pub fn tribulation(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.tribulation.borrow_mut()
    }

    /// Flavor text selection and notice rolls.
    #[must_use]
    pub fn narrative(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.narrative.borrow_mut()
    }

    /// Tick interval jitter.
    #[must_use]
    pub fn schedule(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.schedule.borrow_mut()
    }

    #[must_use]
    pub fn draws(&self) -> RngDraws {
        RngDraws {
            accrual: self.accrual.borrow().draws(),
            tribulation: self.tribulation.borrow().draws(),
            narrative: self.narrative.borrow().draws(),
            schedule: self.schedule.borrow().draws(),
        }
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    // HMAC accepts keys of any length, so the fallback is unreachable in practice.
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
