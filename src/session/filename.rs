//! Upload filename synthesis.

use uuid::Uuid;

/// Upper bound (exclusive) of the number embedded in upload filenames.
pub const FILENAME_NUMBER_BOUND: u32 = 1_000_000;

/// Source of pseudo-random integers.
pub trait RandomSource {
    /// Returns an integer uniformly distributed in `[0, bound)`.
    /// A `bound` of zero yields zero.
    fn next_below(&mut self, bound: u32) -> u32;
}

/// Random source backed by v4 UUIDs.
///
/// The 122 random bits make the modulo bias over `u32` bounds negligible.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRandom;

impl RandomSource for UuidRandom {
    fn next_below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        (Uuid::new_v4().as_u128() % u128::from(bound)) as u32
    }
}

/// Builds an upload filename of the form `recording_<n>.mp3`.
pub fn recording_filename<R: RandomSource + ?Sized>(random: &mut R) -> String {
    let number = random.next_below(FILENAME_NUMBER_BOUND);
    format!("recording_{number}.mp3")
}
