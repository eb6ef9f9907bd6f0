use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The random number generator driving a population's
/// evolution.
///
/// Wraps a [`ChaCha8Rng`] so that it can be checkpointed
/// in any serde format: the state is stored as the seed,
/// stream, and position within the stream, with the 128-bit
/// position split into two words.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PopulationRng(ChaCha8Rng);

#[derive(Serialize, Deserialize)]
struct RngState {
    seed: [u8; 32],
    stream: u64,
    word_pos: [u64; 2],
}

impl PopulationRng {
    /// Creates a generator from a 64-bit seed.
    ///
    /// # Examples
    /// ```
    /// use neatgen::PopulationRng;
    /// use rand::Rng;
    ///
    /// let mut a = PopulationRng::seed_from_u64(7);
    /// let mut b = PopulationRng::seed_from_u64(7);
    /// assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    /// ```
    pub fn seed_from_u64(seed: u64) -> PopulationRng {
        PopulationRng(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl RngCore for PopulationRng {
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.0.try_fill_bytes(dest)
    }
}

impl Serialize for PopulationRng {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let word_pos = self.0.get_word_pos();
        RngState {
            seed: self.0.get_seed(),
            stream: self.0.get_stream(),
            word_pos: [(word_pos >> 64) as u64, word_pos as u64],
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PopulationRng {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<PopulationRng, D::Error> {
        let state = RngState::deserialize(deserializer)?;
        let mut rng = ChaCha8Rng::from_seed(state.seed);
        rng.set_stream(state.stream);
        rng.set_word_pos(((state.word_pos[0] as u128) << 64) | state.word_pos[1] as u128);
        Ok(PopulationRng(rng))
    }
}
