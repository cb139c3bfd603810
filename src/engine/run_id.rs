// src/engine/run_id.rs

//! Run identifier generation.

use rand::Rng;

use crate::engine::RunId;

/// Generate a 12-digit run id with a non-zero leading digit.
///
/// Uniform random; ids are advisory and not guaranteed collision-free.
pub fn generate_run_id() -> RunId {
    let mut rng = rand::thread_rng();
    let mut id = String::with_capacity(12);
    id.push(char::from(b'0' + rng.gen_range(1..=9u8)));
    for _ in 0..11 {
        id.push(char::from(b'0' + rng.gen_range(0..=9u8)));
    }
    id
}
