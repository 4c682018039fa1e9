//! Chain tracker: main-chain bookkeeping, alternative chains, switching.
//!
//! The wallet keeps a light view of the chain: per-height timestamps,
//! cumulative difficulties, weights and hashes, plus a store of alternative
//! blocks keyed by hash. When an alternative chain accumulates more work
//! than the main suffix it replaces it, emitting a [`ReorgEvent`] the
//! session turns into a storage rollback.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use salvium_common::consts::{
    BLOCKCHAIN_TIMESTAMP_CHECK_WINDOW, BLOCK_FUTURE_TIME_LIMIT, DIFFICULTY_CUT,
    DIFFICULTY_TARGET_V2, DIFFICULTY_WINDOW, MEMPOOL_TX_FROM_ALT_BLOCK_LIVETIME,
};

use crate::node::BlockHeader;

/// Outcome of offering one block to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAdmission {
    AddedToMain,
    AddedToAlt,
    AlreadyExists,
    Orphaned,
}

/// Emitted when an alternative chain replaces the main suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorgEvent {
    /// Height of the last common block.
    pub split_height: u64,
    pub old_height: u64,
    pub new_height: u64,
    pub blocks_disconnected: u64,
    pub blocks_connected: u64,
}

/// One main-chain slot.
#[derive(Debug, Clone)]
struct MainEntry {
    timestamp: u64,
    cumulative_difficulty: u128,
    weight: u64,
    hash: String,
}

/// One stored alternative block.
#[derive(Debug, Clone)]
struct AltRecord {
    header: BlockHeader,
    cumulative_difficulty: u128,
}

/// Classic CryptoNote v2 difficulty: sorted-timestamp window with outlier
/// cut, work over time span, rounded up.
pub fn next_difficulty_v2(
    timestamps: &[u64],
    cumulative_difficulties: &[u128],
    target_seconds: u64,
) -> u128 {
    debug_assert_eq!(timestamps.len(), cumulative_difficulties.len());
    let len = timestamps.len().min(DIFFICULTY_WINDOW);
    if len <= 1 {
        return 1;
    }
    let timestamps = &timestamps[timestamps.len() - len..];
    let difficulties = &cumulative_difficulties[cumulative_difficulties.len() - len..];

    let mut sorted: Vec<u64> = timestamps.to_vec();
    sorted.sort_unstable();

    let kept = DIFFICULTY_WINDOW - 2 * DIFFICULTY_CUT;
    let (begin, end) = if len <= kept {
        (0usize, len)
    } else {
        let begin = (len - kept).div_ceil(2);
        (begin, begin + kept)
    };

    let time_span = (sorted[end - 1] - sorted[begin]).max(1);
    let total_work = difficulties[end - 1] - difficulties[begin];
    if total_work == 0 {
        return 1;
    }
    (total_work * u128::from(target_seconds) + u128::from(time_span) - 1) / u128::from(time_span)
}

/// The chain tracker.
pub struct ChainTracker {
    /// Height of `entries[0]`.
    start_height: u64,
    entries: Vec<MainEntry>,
    alt: HashMap<String, AltRecord>,
    invalid: HashSet<String>,
}

impl ChainTracker {
    /// Start tracking from a trusted block (typically the wallet's birthday
    /// or the genesis).
    pub fn new(start_height: u64, start_hash: &str, start_timestamp: u64) -> Self {
        ChainTracker {
            start_height,
            entries: vec![MainEntry {
                timestamp: start_timestamp,
                cumulative_difficulty: 1,
                weight: 0,
                hash: start_hash.to_string(),
            }],
            alt: HashMap::new(),
            invalid: HashSet::new(),
        }
    }

    /// Current tip `(height, hash)`.
    pub fn tip(&self) -> (u64, &str) {
        let last = self.entries.last().expect("tracker is never empty");
        (self.start_height + self.entries.len() as u64 - 1, &last.hash)
    }

    /// Cumulative difficulty of the tip.
    pub fn tip_cumulative_difficulty(&self) -> u128 {
        self.entries
            .last()
            .expect("tracker is never empty")
            .cumulative_difficulty
    }

    /// Main-chain hash at a height, if tracked.
    pub fn hash_at(&self, height: u64) -> Option<&str> {
        if height < self.start_height {
            return None;
        }
        self.entries
            .get((height - self.start_height) as usize)
            .map(|e| e.hash.as_str())
    }

    fn main_height_of(&self, hash: &str) -> Option<u64> {
        self.entries
            .iter()
            .position(|e| e.hash == hash)
            .map(|i| self.start_height + i as u64)
    }

    /// Offer a block to the tracker.
    ///
    /// `local_time` bounds how far in the future a timestamp may lie.
    pub fn handle_block(
        &mut self,
        header: &BlockHeader,
        local_time: u64,
    ) -> (BlockAdmission, Option<ReorgEvent>) {
        if self.main_height_of(&header.hash).is_some() || self.alt.contains_key(&header.hash) {
            return (BlockAdmission::AlreadyExists, None);
        }
        if self.invalid.contains(&header.hash) || self.invalid.contains(&header.prev_hash) {
            self.invalid.insert(header.hash.clone());
            return (BlockAdmission::Orphaned, None);
        }

        let (tip_height, tip_hash) = self.tip();
        if header.prev_hash == tip_hash {
            if header.height != tip_height + 1 {
                warn!(height = header.height, expected = tip_height + 1, "height gap at tip");
                self.invalid.insert(header.hash.clone());
                return (BlockAdmission::Orphaned, None);
            }
            if !self.timestamp_acceptable(header.timestamp, local_time) {
                warn!(height = header.height, hash = %header.hash, "timestamp rejected");
                self.invalid.insert(header.hash.clone());
                return (BlockAdmission::Orphaned, None);
            }
            self.append_main(header);
            return (BlockAdmission::AddedToMain, None);
        }

        // Not on the tip: parent somewhere in main or alt?
        let parent_known = self.main_height_of(&header.prev_hash).is_some()
            || self.alt.contains_key(&header.prev_hash);
        if !parent_known {
            return (BlockAdmission::Orphaned, None);
        }

        let Some(cumulative_difficulty) = self.alt_cumulative_difficulty(header) else {
            self.invalid.insert(header.hash.clone());
            return (BlockAdmission::Orphaned, None);
        };
        debug!(
            height = header.height,
            hash = %header.hash,
            cumulative_difficulty,
            "stored alternative block"
        );
        self.alt.insert(
            header.hash.clone(),
            AltRecord {
                header: header.clone(),
                cumulative_difficulty,
            },
        );

        if cumulative_difficulty > self.tip_cumulative_difficulty() {
            if let Some(event) = self.try_switch(&header.hash, local_time) {
                return (BlockAdmission::AddedToMain, Some(event));
            }
        }
        (BlockAdmission::AddedToAlt, None)
    }

    /// Drop alternative blocks too far behind the tip to ever reorg.
    pub fn prune_alt(&mut self) {
        let (tip_height, _) = self.tip();
        let horizon = MEMPOOL_TX_FROM_ALT_BLOCK_LIVETIME / DIFFICULTY_TARGET_V2;
        let before = self.alt.len();
        self.alt
            .retain(|_, rec| rec.header.height + horizon >= tip_height);
        if self.alt.len() != before {
            debug!(pruned = before - self.alt.len(), "pruned alt blocks");
        }
    }

    fn append_main(&mut self, header: &BlockHeader) {
        let difficulty = {
            let (timestamps, cumulative): (Vec<u64>, Vec<u128>) = self
                .entries
                .iter()
                .map(|e| (e.timestamp, e.cumulative_difficulty))
                .unzip();
            next_difficulty_v2(&timestamps, &cumulative, DIFFICULTY_TARGET_V2)
        };
        let cumulative_difficulty = self.tip_cumulative_difficulty() + difficulty;
        self.entries.push(MainEntry {
            timestamp: header.timestamp,
            cumulative_difficulty,
            weight: header.weight,
            hash: header.hash.clone(),
        });
    }

    fn timestamp_acceptable(&self, timestamp: u64, local_time: u64) -> bool {
        if timestamp > local_time + BLOCK_FUTURE_TIME_LIMIT {
            return false;
        }
        let window = self
            .entries
            .iter()
            .rev()
            .take(BLOCKCHAIN_TIMESTAMP_CHECK_WINDOW)
            .map(|e| e.timestamp)
            .collect::<Vec<u64>>();
        if window.len() < 2 {
            return true;
        }
        timestamp > median(&window)
    }

    /// Cumulative difficulty for an alt block from the combined
    /// main-up-to-split plus alt-ancestry window.
    fn alt_cumulative_difficulty(&self, header: &BlockHeader) -> Option<u128> {
        let mut ancestry: Vec<&AltRecord> = Vec::new();
        let mut cursor = header.prev_hash.clone();
        while let Some(rec) = self.alt.get(&cursor) {
            ancestry.push(rec);
            cursor = rec.header.prev_hash.clone();
        }
        let split_height = self.main_height_of(&cursor)?;
        ancestry.reverse();

        let parent_cumulative = ancestry
            .last()
            .map(|rec| rec.cumulative_difficulty)
            .unwrap_or_else(|| {
                self.entries[(split_height - self.start_height) as usize].cumulative_difficulty
            });

        let mut timestamps = Vec::new();
        let mut cumulative = Vec::new();
        for entry in &self.entries[..=(split_height - self.start_height) as usize] {
            timestamps.push(entry.timestamp);
            cumulative.push(entry.cumulative_difficulty);
        }
        for rec in &ancestry {
            timestamps.push(rec.header.timestamp);
            cumulative.push(rec.cumulative_difficulty);
        }

        let difficulty = next_difficulty_v2(&timestamps, &cumulative, DIFFICULTY_TARGET_V2);
        Some(parent_cumulative + difficulty)
    }

    /// Attempt to make the alt chain ending in `alt_tip` the main chain.
    fn try_switch(&mut self, alt_tip: &str, local_time: u64) -> Option<ReorgEvent> {
        // Collect the alt chain back to the split point.
        let mut chain: Vec<AltRecord> = Vec::new();
        let mut cursor = alt_tip.to_string();
        while let Some(rec) = self.alt.get(&cursor) {
            chain.push(rec.clone());
            cursor = rec.header.prev_hash.clone();
        }
        let split_height = self.main_height_of(&cursor)?;
        chain.reverse();

        let (old_height, _) = self.tip();

        // 1. Save and pop the main suffix, newest first.
        let keep = (split_height - self.start_height + 1) as usize;
        let saved: Vec<MainEntry> = self.entries.split_off(keep);

        // 2. Apply the alt records in order through the validator.
        for (i, rec) in chain.iter().enumerate() {
            let (tip_height, tip_hash) = self.tip();
            let links = rec.header.prev_hash == tip_hash
                && rec.header.height == tip_height + 1
                && self.timestamp_acceptable(rec.header.timestamp, local_time);
            if !links {
                warn!(
                    hash = %rec.header.hash,
                    height = rec.header.height,
                    "alt chain failed validation, rolling back switch"
                );
                // Rollback: restore the saved main blocks in original order.
                self.entries.truncate(keep);
                self.entries.extend(saved);
                self.invalid.insert(rec.header.hash.clone());
                for rejected in &chain[i..] {
                    self.alt.remove(&rejected.header.hash);
                    self.invalid.insert(rejected.header.hash.clone());
                }
                return None;
            }
            self.append_main(&rec.header);
        }

        // 3. The popped main blocks become the minority fork; cumulative
        // difficulty travels with them so a switch-back restores it
        // verbatim.
        for (i, entry) in saved.iter().enumerate() {
            let height = split_height + 1 + i as u64;
            let prev_hash = if i == 0 {
                cursor.clone()
            } else {
                saved[i - 1].hash.clone()
            };
            self.alt.insert(
                entry.hash.clone(),
                AltRecord {
                    header: BlockHeader {
                        height,
                        hash: entry.hash.clone(),
                        prev_hash,
                        timestamp: entry.timestamp,
                        reward: 0,
                        major_version: 0,
                        minor_version: 0,
                        weight: entry.weight,
                    },
                    cumulative_difficulty: entry.cumulative_difficulty,
                },
            );
        }
        for rec in &chain {
            self.alt.remove(&rec.header.hash);
        }

        let (new_height, _) = self.tip();
        let event = ReorgEvent {
            split_height,
            old_height,
            new_height,
            blocks_disconnected: old_height - split_height,
            blocks_connected: new_height - split_height,
        };
        info!(
            split = split_height,
            old = old_height,
            new = new_height,
            "chain switched to heavier alternative"
        );
        Some(event)
    }
}

fn median(values: &[u64]) -> u64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_700_000_000;

    fn header(height: u64, hash: &str, prev: &str, timestamp: u64) -> BlockHeader {
        BlockHeader {
            height,
            hash: hash.into(),
            prev_hash: prev.into(),
            timestamp,
            reward: 0,
            major_version: 1,
            minor_version: 0,
            weight: 10_000,
        }
    }

    fn tracker_with_main(blocks: u64) -> ChainTracker {
        let mut tracker = ChainTracker::new(0, "g", T0);
        for h in 1..=blocks {
            let prev = if h == 1 { "g".into() } else { format!("m{}", h - 1) };
            let (admission, _) = tracker.handle_block(
                &header(h, &format!("m{h}"), &prev, T0 + h * 120),
                T0 + blocks * 120 + 1_000,
            );
            assert_eq!(admission, BlockAdmission::AddedToMain);
        }
        tracker
    }

    #[test]
    fn test_main_growth_has_increasing_difficulty() {
        let tracker = tracker_with_main(10);
        assert_eq!(tracker.tip(), (10, "m10"));
        let mut prev = 0u128;
        for h in 0..=10 {
            let entry_cd = tracker.entries[h as usize].cumulative_difficulty;
            assert!(entry_cd > prev || h == 0);
            prev = entry_cd;
        }
    }

    #[test]
    fn test_duplicate_is_already_exists() {
        let mut tracker = tracker_with_main(5);
        let (admission, _) = tracker.handle_block(
            &header(5, "m5", "m4", T0 + 5 * 120),
            T0 + 10_000,
        );
        assert_eq!(admission, BlockAdmission::AlreadyExists);
    }

    #[test]
    fn test_unknown_parent_is_orphaned() {
        let mut tracker = tracker_with_main(5);
        let (admission, _) = tracker.handle_block(
            &header(9, "x9", "nowhere", T0 + 9 * 120),
            T0 + 10_000,
        );
        assert_eq!(admission, BlockAdmission::Orphaned);
    }

    #[test]
    fn test_child_of_invalid_is_orphaned() {
        let mut tracker = tracker_with_main(5);
        // Timestamp far in the future gets m6 marked invalid.
        let (admission, _) = tracker.handle_block(
            &header(6, "bad6", "m5", T0 + 10_000_000),
            T0 + 1_000,
        );
        assert_eq!(admission, BlockAdmission::Orphaned);
        let (admission, _) = tracker.handle_block(
            &header(7, "bad7", "bad6", T0 + 7 * 120),
            T0 + 10_000,
        );
        assert_eq!(admission, BlockAdmission::Orphaned);
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let mut tracker = tracker_with_main(80);
        // At or below the median of the last 60: rejected.
        let (admission, _) = tracker.handle_block(
            &header(81, "late", "m80", T0 + 30 * 120),
            T0 + 100_000,
        );
        assert_eq!(admission, BlockAdmission::Orphaned);
    }

    #[test]
    fn test_alt_then_switch() {
        let mut tracker = tracker_with_main(10);
        let local = T0 + 1_000_000;

        // A fork off m7: first two blocks are lighter than main.
        let (a, _) = tracker.handle_block(&header(8, "a8", "m7", T0 + 8 * 120 + 30), local);
        assert_eq!(a, BlockAdmission::AddedToAlt);
        let (a, _) = tracker.handle_block(&header(9, "a9", "a8", T0 + 9 * 120 + 30), local);
        assert_eq!(a, BlockAdmission::AddedToAlt);
        let (a, _) = tracker.handle_block(&header(10, "a10", "a9", T0 + 10 * 120 + 30), local);
        assert_eq!(a, BlockAdmission::AddedToAlt);

        // One more block outweighs the main suffix and triggers the switch.
        let (a, event) = tracker.handle_block(&header(11, "a11", "a10", T0 + 11 * 120), local);
        assert_eq!(a, BlockAdmission::AddedToMain);
        let event = event.expect("switch must emit a reorg event");
        assert_eq!(event.split_height, 7);
        assert_eq!(event.old_height, 10);
        assert_eq!(event.new_height, 11);
        assert_eq!(event.blocks_disconnected, 3);
        assert_eq!(event.blocks_connected, 4);

        assert_eq!(tracker.tip(), (11, "a11"));
        assert_eq!(tracker.hash_at(8), Some("a8"));
        // The old main blocks are now the minority fork.
        assert!(tracker.alt.contains_key("m8"));
        assert!(tracker.alt.contains_key("m10"));
        assert!(!tracker.alt.contains_key("a8"));
    }

    #[test]
    fn test_prune_drops_alt_blocks_behind_horizon() {
        // Horizon is livetime / target = 5040 blocks.
        let horizon = MEMPOOL_TX_FROM_ALT_BLOCK_LIVETIME / DIFFICULTY_TARGET_V2;
        let tip = horizon + 60;
        let mut tracker = tracker_with_main(tip);
        let local = T0 + tip * 120 + 1_000_000;

        // A shallow fork near the tip survives pruning.
        let near = tip - 3;
        tracker.handle_block(
            &header(near, "near_alt", &format!("m{}", near - 1), T0 + near * 120 + 30),
            local,
        );
        // A fork buried below the horizon does not.
        tracker.handle_block(&header(8, "deep_alt", "m7", T0 + 8 * 120 + 30), local);
        assert_eq!(tracker.alt.len(), 2);

        tracker.prune_alt();
        assert!(tracker.alt.contains_key("near_alt"));
        assert!(!tracker.alt.contains_key("deep_alt"));
    }

    #[test]
    fn test_difficulty_window_math() {
        // Two blocks 120s apart at difficulty 1 each keep difficulty 1.
        let d = next_difficulty_v2(&[T0, T0 + 120], &[1, 2], 120);
        assert_eq!(d, 1);
        // Blocks coming twice as fast double the difficulty.
        let d = next_difficulty_v2(&[T0, T0 + 60], &[10, 20], 120);
        assert_eq!(d, 20);
    }
}
