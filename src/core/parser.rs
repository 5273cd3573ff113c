//! Price-optimal tokenization.
//!
//! The parse is a shortest-path problem on a DAG of `N+1` unit positions.
//! Every position has a literal edge to its successor; every legal match adds
//! an edge spanning its length. Edge weights come from the format's
//! [`PriceCalculator`], so the single-pass relaxation below yields a globally
//! minimum-price token sequence whenever prices are non-negative — which bit
//! counts always are.
//!
//! Formats that force literals after each match (`skip_units_after_match`)
//! get those literals folded into the match edge: the edge spans
//! `length + skip` units and carries the literal prices of the skipped units,
//! truncated at the end of input. The reconstruction then reports the skipped
//! units as ordinary literal tokens following the match.
//!
//! Backward formats are parsed as the unit-reversed input; the returned
//! tokens live in the reversed coordinate space and the adapter reverses its
//! serialized byte stream as a whole.

// Tables and arenas here are sized by construction; positions are proven
// in range before indexing.
#![allow(clippy::indexing_slicing)]

use crate::core::error::{CodecError, ErrorKind, Res};
use crate::core::finder::{MatchCandidate, MatchFinder};
use crate::core::{Direction, LzConfig, Match, PriceCalculator, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    None,
    Literal,
    Match { displacement: usize, length: usize, skip: usize },
}

impl Edge {
    /// Tie-break between equal-cost arrivals: prefer a match over a literal,
    /// then longer matches, then smaller displacements.
    fn beats(&self, other: &Edge) -> bool {
        match (self, other) {
            (_, Edge::None) => true,
            (Edge::Match { .. }, Edge::Literal) => true,
            (
                Edge::Match { displacement: d_new, length: l_new, .. },
                Edge::Match { displacement: d_old, length: l_old, .. },
            ) => l_new > l_old || (l_new == l_old && d_new < d_old),
            _ => false,
        }
    }
}

/// Tokenize `input` at minimum total price under `config`.
///
/// Returned positions, displacements and lengths are in units. For
/// [`Direction::Backward`] they refer to the unit-reversed input.
pub fn parse(input: &[u8], config: &LzConfig, prices: &dyn PriceCalculator) -> Res<Vec<Token>> {
    let unit = config.options.unit_size;
    if unit != 1 && unit != 2 {
        return Err(CodecError::new(ErrorKind::InvalidRange, format!("unsupported unit size {}", unit)));
    }
    if input.len() % unit != 0 {
        return Err(CodecError::new(
            ErrorKind::InvalidRange,
            format!("input of {} bytes is not aligned to {}-byte units", input.len(), unit),
        ));
    }
    if config.options.pre_buffer.len() % unit != 0 {
        return Err(CodecError::new(ErrorKind::InvalidRange, "pre-buffer not unit aligned"));
    }

    let mut working = config.options.pre_buffer.clone();
    match config.options.direction {
        Direction::Forward => working.extend_from_slice(input),
        Direction::Backward => {
            for chunk in input.chunks_exact(unit).rev() {
                working.extend_from_slice(chunk);
            }
        }
    }

    let pre_units = config.options.pre_buffer.len() / unit;
    let n = input.len() / unit;
    let skip = config.options.skip_units_after_match;

    let mut finder = MatchFinder::new(&working, config)?;
    let mut cost = vec![u64::MAX; n + 1];
    let mut pred = vec![Edge::None; n + 1];
    cost[0] = 0;

    let unit_bytes = |p: usize| &working[(pre_units + p) * unit..(pre_units + p + 1) * unit];

    let mut candidates = Vec::new();
    for p in 0..n {
        let here = cost[p];
        debug_assert_ne!(here, u64::MAX, "literal edges keep every node reachable");

        let relax = |cost: &mut Vec<u64>, pred: &mut Vec<Edge>, q: usize, w: u64, edge: Edge| {
            let total = here + w;
            if total < cost[q] || (total == cost[q] && edge.beats(&pred[q])) {
                cost[q] = total;
                pred[q] = edge;
            }
        };

        relax(
            &mut cost,
            &mut pred,
            p + 1,
            u64::from(prices.literal_price(p, unit_bytes(p))),
            Edge::Literal,
        );

        finder.matches_at(pre_units + p, &mut candidates);
        for candidate in &candidates {
            let MatchCandidate { displacement, run } = *candidate;
            for lim in &config.limitations {
                if displacement < lim.min_displacement || displacement > lim.max_displacement {
                    continue;
                }
                let longest = run.min(lim.max_length);
                if longest < lim.min_length {
                    continue;
                }
                for length in lim.min_length..=longest {
                    let taken_skip = skip.min(n - (p + length));
                    let q = p + length + taken_skip;
                    let m = Match { position: p, displacement, length };
                    let mut w = u64::from(prices.match_price(&m));
                    for s in 0..taken_skip {
                        w += u64::from(prices.literal_price(p + length + s, unit_bytes(p + length + s)));
                    }
                    relax(&mut cost, &mut pred, q, w, Edge::Match { displacement, length, skip: taken_skip });
                }
            }
        }
    }

    let mut tokens = Vec::new();
    let mut q = n;
    while q > 0 {
        match pred[q] {
            Edge::Literal => {
                q -= 1;
                tokens.push(Token::Literal { position: q });
            }
            Edge::Match { displacement, length, skip } => {
                for s in 0..skip {
                    tokens.push(Token::Literal { position: q - 1 - s });
                }
                q -= length + skip;
                tokens.push(Token::Match(Match { position: q, displacement, length }));
            }
            Edge::None => {
                return Err(CodecError::new(ErrorKind::InvalidRange, format!("no edge into node {}", q)));
            }
        }
    }
    tokens.reverse();

    log::debug!("parsed {} units into {} tokens, total price {} bits", n, tokens.len(), cost[n]);
    Ok(tokens)
}
