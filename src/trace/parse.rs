//! Block parsing: turns the normalized lines of one sample block into a
//! tag map plus an ordered trace.
//!
//! Frame lines start with a decimal digit, tag lines with `#`; anything
//! else contributes nothing. A malformed frame line or a non-dense index
//! set fails the block, never the stream.

use thiserror::Error;

use super::{Frame, Tags, Trace, MEMORY_TAG, TIMESTAMP_TAG};

/// Errors that can fail one sample block.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid frame line shape (expected `index point location`): {line}")]
    FrameShape { line: String },

    #[error("invalid frame index `{index}`: {line}")]
    FrameIndex { index: String, line: String },

    #[error("invalid backtrace ordering")]
    BacktraceOrdering,
}

/// Parses one sample block into `(Tags, Trace)`.
pub fn parse_block(lines: &[String]) -> Result<(Tags, Trace), ParseError> {
    let tags = extract_tags(lines);
    let trace = prepare_trace(lines)?;
    Ok((tags, trace))
}

/// Collects frame lines and orders them by index, leaf first.
///
/// The observed indices must form the dense set `{0..n-1}`; duplicates or
/// gaps mean the profiler emitted a torn backtrace and the block is dropped.
fn prepare_trace(lines: &[String]) -> Result<Trace, ParseError> {
    let mut indexed: Vec<(usize, Frame)> = Vec::with_capacity(lines.len());

    for line in lines {
        if !line.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }

        let tokens: Vec<&str> = line.split(' ').collect();
        let [index, point, location] = tokens[..] else {
            return Err(ParseError::FrameShape { line: line.clone() });
        };

        let index: usize = index.parse().map_err(|_| ParseError::FrameIndex {
            index: index.to_string(),
            line: line.clone(),
        })?;

        indexed.push((
            index,
            Frame {
                point: point.to_string(),
                location: location.to_string(),
            },
        ));
    }

    indexed.sort_by_key(|(index, _)| *index);

    if indexed.iter().enumerate().any(|(slot, (index, _))| slot != *index) {
        return Err(ParseError::BacktraceOrdering);
    }

    Ok(indexed.into_iter().map(|(_, frame)| frame).collect())
}

/// Collects tag lines into a canonical tag map.
///
/// A tag line has exactly 4 space-separated tokens; any other arity is
/// profiler commentary and is skipped silently. The generic shape is
/// `(marker, name, "=", value)`. The reserved memory tag instead carries
/// its magnitude in the third token, with the trailing peak-usage column
/// discarded. The reserved timestamp tag never enters the map.
fn extract_tags(lines: &[String]) -> Tags {
    let mut tags = Tags::new();

    for line in lines {
        if !line.starts_with('#') {
            continue;
        }

        let tokens: Vec<&str> = line.split(' ').collect();
        let [_marker, name, third, fourth] = tokens[..] else {
            continue;
        };

        if name == TIMESTAMP_TAG {
            continue;
        }

        let value = if name == MEMORY_TAG { third } else { fourth };
        tags.insert(name.to_string(), value.to_string());
    }

    tags
}
