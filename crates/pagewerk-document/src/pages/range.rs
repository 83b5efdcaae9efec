// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page range expressions — "1,3-5,7" style selections, 1-based on the wire,
// resolved to ascending, de-duplicated, 0-based page indices.

use std::collections::BTreeSet;

use pagewerk_core::error::{PagewerkError, Result};
use tracing::warn;

/// Largest 1-based page number accepted in an expression.
///
/// Keeps "1-999999999" from allocating a set the size of the address space.
pub const MAX_PAGE_NUMBER: usize = 1_000_000;

/// Literal selecting every page of a document, bypassing the parser.
pub const ALL_PAGES: &str = "all";

/// Canonical result of parsing a range expression.
///
/// Members are 0-based and not yet checked against any document; use
/// [`ResolvedPageSet::resolve`] to split them into in-range and dropped
/// indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPageSet {
    indices: BTreeSet<usize>,
}

/// A page index that fell outside `[0, page_count)` and was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DroppedPage {
    /// The 0-based index as supplied (negative for organize lists).
    pub index: i64,
    /// Page count of the document it was resolved against.
    pub page_count: usize,
}

/// Outcome of resolving a page set against a concrete page count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// In-range indices, ascending.
    pub kept: Vec<usize>,
    /// Out-of-range indices, ascending.
    pub dropped: Vec<DroppedPage>,
}

impl ResolvedPageSet {
    /// Parse a comma-separated expression of 1-based pages and inclusive
    /// `start-end` ranges.
    pub fn parse(expression: &str) -> Result<Self> {
        if expression.trim().is_empty() {
            return Err(PagewerkError::malformed_range(expression, "empty expression"));
        }

        let mut indices = BTreeSet::new();
        for token in expression.split(',') {
            let token = token.trim();
            match token.split_once('-') {
                Some((start, end)) => {
                    let start = parse_page_number(expression, start)?;
                    let end = parse_page_number(expression, end)?;
                    if start > end {
                        return Err(PagewerkError::malformed_range(
                            expression,
                            format!("range `{token}` runs backwards"),
                        ));
                    }
                    indices.extend((start..=end).map(|page| page - 1));
                }
                None => {
                    indices.insert(parse_page_number(expression, token)? - 1);
                }
            }
        }

        Ok(Self { indices })
    }

    /// Build a set directly from 0-based indices.
    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            indices: indices.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    /// Ascending 0-based indices.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    /// Split the set into indices valid for a `page_count`-page document and
    /// the ones that are not. Dropped indices are logged, never raised.
    pub fn resolve(&self, page_count: usize) -> Resolution {
        let (kept, dropped): (Vec<usize>, Vec<usize>) =
            self.iter().partition(|&index| index < page_count);

        let dropped: Vec<DroppedPage> = dropped
            .into_iter()
            .map(|index| DroppedPage {
                index: index as i64,
                page_count,
            })
            .collect();
        if !dropped.is_empty() {
            warn!(
                page_count,
                dropped = dropped.len(),
                "ignoring pages beyond the end of the document"
            );
        }

        Resolution { kept, dropped }
    }

    /// Render the canonical 1-based expression, collapsing consecutive runs
    /// into ranges. Parsing the result yields an equal set.
    pub fn to_expression(&self) -> String {
        let mut parts = Vec::new();
        let mut iter = self.iter().peekable();
        while let Some(start) = iter.next() {
            let mut end = start;
            while iter.peek() == Some(&(end + 1)) {
                end += 1;
                iter.next();
            }
            if start == end {
                parts.push(format!("{}", start + 1));
            } else {
                parts.push(format!("{}-{}", start + 1, end + 1));
            }
        }
        parts.join(",")
    }
}

/// Pages a per-page transform applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTarget {
    All,
    Pages(ResolvedPageSet),
}

impl PageTarget {
    /// `"all"` (any case) selects every page; anything else goes through the
    /// range parser.
    pub fn parse(expression: &str) -> Result<Self> {
        if expression.trim().eq_ignore_ascii_case(ALL_PAGES) {
            Ok(Self::All)
        } else {
            ResolvedPageSet::parse(expression).map(Self::Pages)
        }
    }

    /// Parse an optional expression, defaulting to every page.
    pub fn parse_or_all(expression: Option<&str>) -> Result<Self> {
        expression.map_or(Ok(Self::All), Self::parse)
    }

    pub fn includes(&self, index: usize) -> bool {
        match self {
            Self::All => true,
            Self::Pages(set) => set.contains(index),
        }
    }
}

/// Parse one side of a token as a 1-based page number.
fn parse_page_number(expression: &str, raw: &str) -> Result<usize> {
    let raw = raw.trim();
    let page: usize = raw.parse().map_err(|_| {
        let reason = if raw.is_empty() {
            "missing page number".to_string()
        } else {
            format!("`{raw}` is not a page number")
        };
        PagewerkError::malformed_range(expression, reason)
    })?;

    if page == 0 {
        return Err(PagewerkError::malformed_range(
            expression,
            "page numbers start at 1",
        ));
    }
    if page > MAX_PAGE_NUMBER {
        return Err(PagewerkError::malformed_range(
            expression,
            format!("page {page} exceeds the limit of {MAX_PAGE_NUMBER}"),
        ));
    }
    Ok(page)
}
