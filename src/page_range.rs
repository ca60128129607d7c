//! Page exclusion ranges
//!
//! Ranges are separated by `;`. A range is a single page `n` or a span written
//! `m-n` or `m,n`. Negative numbers count from the end, so `-1` is the last
//! page and `-3--1` the last three.

use std::collections::BTreeSet;

use thiserror::Error;

/// Exclusion parsing errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PageRangeError {
    #[error("Invalid page number: '{0}'")]
    InvalidNumber(String),

    #[error("Page 0 is invalid (pages start at 1)")]
    ZeroPage,

    #[error("Page {page} exceeds document page count ({page_count})")]
    PageOutOfRange { page: i64, page_count: usize },

    #[error("Reversed page range {start}-{end}")]
    ReversedRange { start: usize, end: usize },
}

pub type Result<T> = std::result::Result<T, PageRangeError>;

/// Parse an exclusion string into 1-indexed page numbers
pub fn parse_exclusions(input: &str, page_count: usize) -> Result<BTreeSet<usize>> {
    let mut pages = BTreeSet::new();

    for part in input.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        match split_range(part) {
            Some((start, end)) => {
                let start = resolve_page(start, page_count)?;
                let end = resolve_page(end, page_count)?;
                if start > end {
                    return Err(PageRangeError::ReversedRange { start, end });
                }
                pages.extend(start..=end);
            }
            None => {
                pages.insert(resolve_page(part, page_count)?);
            }
        }
    }

    Ok(pages)
}

/// Format pages back into the compact `;`-separated form
pub fn format_exclusions(pages: &BTreeSet<usize>) -> String {
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for &page in pages {
        match ranges.last_mut() {
            Some((_, end)) if *end + 1 == page => *end = page,
            _ => ranges.push((page, page)),
        }
    }
    ranges
        .iter()
        .map(|&(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{}-{}", start, end)
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Split `m-n` or `m,n`; a leading `-` belongs to the first number
fn split_range(part: &str) -> Option<(&str, &str)> {
    if let Some((start, end)) = part.split_once(',') {
        return Some((start, end));
    }
    let offset = usize::from(part.starts_with('-'));
    part[offset..]
        .find('-')
        .map(|i| (&part[..offset + i], &part[offset + i + 1..]))
}

fn resolve_page(token: &str, page_count: usize) -> Result<usize> {
    let token = token.trim();
    let value: i64 = token
        .parse()
        .map_err(|_| PageRangeError::InvalidNumber(token.to_string()))?;

    let out_of_range = || PageRangeError::PageOutOfRange {
        page: value,
        page_count,
    };

    match value {
        0 => Err(PageRangeError::ZeroPage),
        v if v > 0 => {
            let page = v as usize;
            if page > page_count {
                Err(out_of_range())
            } else {
                Ok(page)
            }
        }
        v => {
            let back = v.unsigned_abs() as usize;
            if back > page_count {
                Err(out_of_range())
            } else {
                Ok(page_count + 1 - back)
            }
        }
    }
}
