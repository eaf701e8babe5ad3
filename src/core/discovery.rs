/// Chance-based fragment discovery.
///
/// Kept apart from choice resolution so that resolution stays deterministic:
/// callers roll discoveries explicitly, with a seed they choose and record.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;

use crate::schema::ids::FragmentId;
use crate::schema::player::PlayerProgress;
use crate::schema::story::{Choice, DiscoveryEntry};

/// Roll each entry of a story's discovery table once.
///
/// The chance for an entry is `find_chance * (1 + truth_reveal_factor)`,
/// clamped to `[0, 1]`. Fragments the player already owns are skipped and
/// do not consume a roll, nor do entries whose chance is zero. A fragment
/// listed more than once is rolled for its first entry only.
///
/// Returns the fragments found, in table order, without duplicates. The
/// player is not modified.
pub fn roll_discoveries(
    table: &[DiscoveryEntry],
    choice: &Choice,
    player: &PlayerProgress,
    rng: &mut StdRng,
) -> Vec<FragmentId> {
    let factor = 1.0 + choice.truth_reveal_factor as f64;
    let mut rolled = FxHashSet::default();
    table
        .iter()
        .filter(|entry| rolled.insert(entry.fragment.clone()))
        .filter(|entry| !player.owns_fragment(&entry.fragment))
        .filter(|entry| {
            let chance = (entry.find_chance as f64 * factor).clamp(0.0, 1.0);
            // NaN fails the comparison and is treated as "never".
            chance > 0.0 && rng.gen_bool(chance)
        })
        .map(|entry| entry.fragment.clone())
        .collect()
}

/// [`roll_discoveries`] with a fresh generator seeded from `seed`.
pub fn roll_discoveries_seeded(
    table: &[DiscoveryEntry],
    choice: &Choice,
    player: &PlayerProgress,
    seed: u64,
) -> Vec<FragmentId> {
    let mut rng = StdRng::seed_from_u64(seed);
    roll_discoveries(table, choice, player, &mut rng)
}
