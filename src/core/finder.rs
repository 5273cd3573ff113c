//! Hash-chain match finder.
//!
//! The finder works over a *working buffer*: the format's pre-buffer
//! concatenated with the (possibly unit-reversed) input. Every unit position
//! is indexed by the k-gram starting there, where `k` is the smallest
//! `min_length` over the installed limitations, clamped to `[1, 3]` units.
//! Querying a position walks the chain of earlier occurrences of its k-gram,
//! pruned at the largest `max_displacement`, and extends each occurrence to
//! its maximal run. Per-limitation filtering happens at parse time, since a
//! single candidate run can serve several limitations with different length
//! windows.

// Tables and arenas here are sized by construction; positions are proven
// in range before indexing.
#![allow(clippy::indexing_slicing)]

use crate::core::error::{CodecError, ErrorKind, Res};
use crate::core::{FindLimitations, LzConfig};

const HASH_BITS: u32 = 15;
const NO_POS: i32 = -1;

/// A copy source for some position: `run` is the maximal legal extension in
/// units. The parser derives concrete match lengths from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCandidate {
    pub displacement: usize,
    pub run: usize,
}

pub struct MatchFinder<'a> {
    data: &'a [u8],
    unit: usize,
    n_units: usize,
    gram: usize,
    min_run: usize,
    max_run: usize,
    max_displacement: usize,
    min_displacement: usize,
    /// The largest `min_displacement` over all limitations. A candidate at or
    /// past this displacement is displacement-admissible to every limitation
    /// that admits any farther candidate, so it can dominate them.
    dominant_min_displacement: usize,
    head: Vec<i32>,
    prev: Vec<i32>,
    next_insert: usize,
}

impl<'a> MatchFinder<'a> {
    /// `working` is pre-buffer ++ input; positions handed to [`matches_at`]
    /// are working-buffer unit indices.
    pub fn new(working: &'a [u8], config: &LzConfig) -> Res<MatchFinder<'a>> {
        let unit = config.options.unit_size;
        if unit != 1 && unit != 2 {
            return Err(CodecError::new(ErrorKind::InvalidRange, format!("unsupported unit size {}", unit)));
        }
        if working.len() % unit != 0 {
            return Err(CodecError::new(ErrorKind::InvalidRange, "working buffer not unit aligned"));
        }
        let lims = &config.limitations;
        if lims.is_empty() {
            return Err(CodecError::new(ErrorKind::InvalidRange, "no find limitations installed"));
        }
        let min_run = lims.iter().map(|l| l.min_length).min().unwrap_or(1).max(1);
        let max_run = lims.iter().map(|l| l.max_length).max().unwrap_or(FindLimitations::UNBOUNDED);
        let max_displacement =
            lims.iter().map(|l| l.max_displacement).max().unwrap_or(FindLimitations::UNBOUNDED);
        let min_displacement = lims.iter().map(|l| l.min_displacement).min().unwrap_or(1).max(1);
        let dominant_min_displacement =
            lims.iter().map(|l| l.min_displacement).max().unwrap_or(1).max(1);
        let n_units = working.len() / unit;
        Ok(MatchFinder {
            data: working,
            unit,
            n_units,
            gram: min_run.min(3),
            min_run,
            max_run,
            max_displacement,
            min_displacement,
            dominant_min_displacement,
            head: vec![NO_POS; 1 << HASH_BITS],
            prev: vec![NO_POS; n_units],
            next_insert: 0,
        })
    }

    fn unit_at(&self, pos: usize) -> &[u8] {
        &self.data[pos * self.unit..(pos + 1) * self.unit]
    }

    fn hash(&self, pos: usize) -> usize {
        let mut h = 0x811c_9dc5u32;
        for &b in &self.data[pos * self.unit..(pos + self.gram) * self.unit] {
            h = (h ^ u32::from(b)).wrapping_mul(0x0100_0193);
        }
        (h >> (32 - HASH_BITS)) as usize
    }

    fn insert_up_to(&mut self, pos: usize) {
        while self.next_insert < pos {
            let p = self.next_insert;
            if p + self.gram <= self.n_units {
                let h = self.hash(p);
                self.prev[p] = self.head[h];
                self.head[h] = p as i32;
            }
            self.next_insert += 1;
        }
    }

    /// All copy sources for the k-gram at `pos`, nearest first. Candidates
    /// are already extended to their maximal run, capped at the widest
    /// `max_length`; they still need per-limitation filtering.
    ///
    /// Candidates dominated by a nearer one — equal-or-shorter run, and the
    /// nearer candidate displacement-admissible to every limitation — are
    /// dropped. That prune keeps the parse optimal for every price function
    /// that is non-decreasing in displacement, which holds for all formats
    /// here, and it bounds the walk on highly repetitive data: once a
    /// universally admissible candidate reaches the run cap, nothing farther
    /// can beat it.
    pub fn matches_at(&mut self, pos: usize, out: &mut Vec<MatchCandidate>) {
        out.clear();
        self.insert_up_to(pos);
        if pos + self.gram > self.n_units {
            return;
        }
        let cap = self.max_run.min(self.n_units - pos);
        let mut best_dominating_run = 0;
        let mut cursor = self.head[self.hash(pos)];
        while cursor != NO_POS {
            let source = cursor as usize;
            let displacement = pos - source;
            if displacement > self.max_displacement {
                break;
            }
            cursor = self.prev[source];
            if displacement < self.min_displacement {
                continue;
            }
            let run = self.run_length(source, pos);
            if run < self.min_run || run <= best_dominating_run {
                continue;
            }
            out.push(MatchCandidate { displacement, run });
            if displacement >= self.dominant_min_displacement {
                best_dominating_run = run;
                if run == cap {
                    break;
                }
            }
        }
        log::trace!("{} candidates at unit {}", out.len(), pos);
    }

    /// Longest common run of `source` and `target`, capped at the widest
    /// `max_length`. A run may extend past `target`'s own start (overlapping
    /// copies), which decoders resolve by copying unit-at-a-time.
    fn run_length(&self, source: usize, target: usize) -> usize {
        let cap = self.max_run.min(self.n_units - target);
        let mut run = 0;
        while run < cap && self.unit_at(source + run) == self.unit_at(target + run) {
            run += 1;
        }
        run
    }
}
