//! Hierarchy repair: pull up entries that sit more than one level above
//! the entry after them.
//!
//! A sequence is well-formed when every entry is at most one level deeper
//! than its predecessor. Per-line classification has no context, so a stray
//! `1.2.3.4` in body text can open a level-4 entry under a level-1 one.
//!
//! The pass looks at each adjacent pair of the *original* levels once: where
//! `next - cur > 1`, `cur` takes `next`'s level. Decreases are always kept.
//! It runs exactly once; a chain of deep jumps such as `[1, 3, 5]` becomes
//! `[3, 5, 5]` and is still not well-formed. Callers check with
//! [`is_well_formed`] afterwards.

use crate::entry::TocEntry;
use tracing::debug;

/// Repaired level sequence, computed from the input levels only.
pub fn repair_level_sequence(levels: &[u32]) -> Vec<u32> {
    levels
        .iter()
        .enumerate()
        .map(|(i, &cur)| match levels.get(i + 1) {
            Some(&next) if next > cur.saturating_add(1) => next,
            _ => cur,
        })
        .collect()
}

/// Apply [`repair_level_sequence`] to entries, returning a new sequence.
///
/// ```rust
/// use pdf_toolbox::entry::TocEntry;
/// use pdf_toolbox::pipeline::repair::repair_levels;
///
/// let entries = [1, 3, 4, 2]
///     .iter()
///     .map(|&l| TocEntry::new(l, "t", 1))
///     .collect();
/// let levels: Vec<u32> = repair_levels(entries).iter().map(|e| e.level).collect();
/// assert_eq!(levels, vec![3, 3, 4, 2]);
/// ```
pub fn repair_levels(entries: Vec<TocEntry>) -> Vec<TocEntry> {
    let levels: Vec<u32> = entries.iter().map(|e| e.level).collect();
    let repaired = repair_level_sequence(&levels);

    entries
        .into_iter()
        .zip(repaired)
        .enumerate()
        .map(|(i, (mut entry, level))| {
            if entry.level != level {
                debug!(
                    "Repaired level of entry {} {:?}: {} → {}",
                    i, entry.title, entry.level, level
                );
                entry.level = level;
            }
            entry
        })
        .collect()
}

/// Index of the first entry deeper than its predecessor allows.
pub fn first_violation(levels: &[u32]) -> Option<usize> {
    levels
        .windows(2)
        .position(|w| w[1] > w[0].saturating_add(1))
        .map(|i| i + 1)
}

pub fn is_well_formed(entries: &[TocEntry]) -> bool {
    let levels: Vec<u32> = entries.iter().map(|e| e.level).collect();
    first_violation(&levels).is_none()
}
