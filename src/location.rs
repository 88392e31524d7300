// SPDX-License-Identifier: Apache-2.0

//! Canonical rendering of the source locations a basic block maps to.
//!
//! Raw block indices are run-local, so blocks are matched across runs by the
//! string produced here. Rendering is a pure function of the *set* of
//! locations: line numbers are sorted and deduplicated, files are sorted, so
//! two runs that observed the same locations in a different order still agree
//! byte for byte.

use std::collections::{BTreeMap, BTreeSet};

/// A single `(symbol, file, line)` observation of a basic block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Observation {
    pub symbol: String,
    pub file: String,
    pub line: u32,
}

impl Observation {
    pub fn new(symbol: &str, file: &str, line: u32) -> Self {
        Observation {
            symbol: symbol.to_string(),
            file: file.to_string(),
            line,
        }
    }
}

/// Collapses line numbers into maximal runs of consecutive integers, e.g.
/// `[3, 4, 5, 9, 11, 12]` becomes `"3-5,9,11-12"`.
pub fn compress_lines<I>(lines: I) -> String
where
    I: IntoIterator<Item = u32>,
{
    let sorted: BTreeSet<u32> = lines.into_iter().collect();
    let mut pieces: Vec<String> = Vec::new();
    let mut iter = sorted.into_iter().peekable();
    while let Some(begin) = iter.next() {
        let mut end = begin;
        while let Some(&next) = iter.peek() {
            if Some(next) == end.checked_add(1) {
                end = next;
                iter.next();
            } else {
                break;
            }
        }
        if begin == end {
            pieces.push(begin.to_string());
        } else {
            pieces.push(format!("{}-{}", begin, end));
        }
    }
    pieces.join(",")
}

/// Renders `(file, line)` pairs as `file(ranges)` for each distinct file.
pub fn compress_file_lines<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, u32)>,
{
    let mut by_file: BTreeMap<&'a str, Vec<u32>> = BTreeMap::new();
    for (file, line) in pairs {
        by_file.entry(file).or_default().push(line);
    }
    let mut result = String::new();
    for (file, lines) in by_file {
        result.push_str(file);
        result.push('(');
        result.push_str(&compress_lines(lines));
        result.push(')');
    }
    result
}

/// Location string ignoring symbols; this is the second half of a canonical
/// key.
pub fn compress_locations(observations: &[Observation]) -> String {
    compress_file_lines(observations.iter().map(|o| (o.file.as_str(), o.line)))
}

/// Human-oriented rendering that keeps symbols: `sym[file(ranges)]` per
/// symbol, symbols in first-seen order, joined by `" | "`.
pub fn compress_marks(observations: &[Observation]) -> String {
    let mut symbols: Vec<&str> = Vec::new();
    for o in observations {
        if !symbols.contains(&o.symbol.as_str()) {
            symbols.push(&o.symbol);
        }
    }
    symbols
        .iter()
        .map(|sym| {
            let located = compress_file_lines(
                observations
                    .iter()
                    .filter(|o| o.symbol == *sym)
                    .map(|o| (o.file.as_str(), o.line)),
            );
            format!("{}[{}]", sym, located)
        })
        .collect::<Vec<_>>()
        .join(" | ")
}
