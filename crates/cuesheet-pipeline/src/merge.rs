use crate::record::{TimedBlock, Timing};
use std::collections::HashMap;

enum BlockState {
    NoOpenBlock,
    OpenBlock(TimedBlock),
}

/// Folds untimed continuation rows into the block opened by the last fully timed row.
pub fn merge_blocks(blocks: Vec<TimedBlock>) -> Vec<TimedBlock> {
    let mut merged = Vec::with_capacity(blocks.len());
    let mut state = BlockState::NoOpenBlock;
    for block in blocks {
        state = match (state, block.timing.is_timed()) {
            (BlockState::NoOpenBlock, _) => BlockState::OpenBlock(block),
            (BlockState::OpenBlock(current), true) => {
                merged.push(current);
                BlockState::OpenBlock(block)
            }
            (BlockState::OpenBlock(mut current), false) => {
                current.texts.append_lines(&block.texts);
                BlockState::OpenBlock(current)
            }
        };
    }
    if let BlockState::OpenBlock(current) = state {
        merged.push(current);
    }
    merged
}

/// Joins an entry into the previous one when both share a line number and the
/// entry is either untimed or timed identically.
pub fn merge_lines(blocks: Vec<TimedBlock>) -> Vec<TimedBlock> {
    let mut merged: Vec<TimedBlock> = Vec::with_capacity(blocks.len());
    for block in blocks {
        if let Some(last) = merged.last_mut() {
            let continues =
                block.timing.is_untimed() || last.timing.bits() == block.timing.bits();
            if last.line == block.line && continues {
                last.texts.append_lines(&block.texts);
                continue;
            }
        }
        merged.push(block);
    }
    merged
}

/// Collapses entries sharing `(line, start, end)` anywhere in the list, keeping
/// first-seen order and adding only texts not already present.
pub fn dedup_blocks(blocks: Vec<TimedBlock>) -> Vec<TimedBlock> {
    let mut unique: Vec<TimedBlock> = Vec::with_capacity(blocks.len());
    let mut positions: HashMap<(i64, Option<u64>, Option<u64>), usize> = HashMap::new();
    for block in blocks {
        let (start, end) = block.timing.bits();
        let key = (block.line, start, end);
        match positions.get(&key) {
            Some(&pos) => unique[pos].texts.append_distinct(&block.texts),
            None => {
                positions.insert(key, unique.len());
                unique.push(block);
            }
        }
    }
    unique
}

/// Groups claims by exact timing (partially timed rows share the untimed group)
/// and renumbers the joined entries from 1.
pub fn join_by_timing(blocks: Vec<TimedBlock>) -> Vec<TimedBlock> {
    let mut joined: Vec<TimedBlock> = Vec::new();
    let mut positions: HashMap<Option<(u64, u64)>, usize> = HashMap::new();
    for block in blocks {
        let key = block.timing.timed_key();
        match positions.get(&key) {
            Some(&pos) => joined[pos].texts.append_lines(&block.texts),
            None => {
                positions.insert(key, joined.len());
                let timing = if key.is_some() {
                    block.timing
                } else {
                    Timing::default()
                };
                joined.push(TimedBlock {
                    line: 0,
                    timing,
                    texts: block.texts,
                });
            }
        }
    }
    for (idx, block) in joined.iter_mut().enumerate() {
        block.line = idx as i64 + 1;
    }
    joined
}
