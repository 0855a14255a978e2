// # Line-Oriented Feed Bodies
//
// Shared by every text feed format: one IP or CIDR per line, blank lines
// and comments ignored, anything unparseable dropped without failing the
// feed. Only a body with zero usable lines is an error.

use threat_sync_core::{Error, NetworkEntry, Result};
use tracing::debug;

/// Which line prefixes mark a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `#` only (FireHOL netset)
    Hash,
    /// `#`, `;` or `//`
    HashSemicolonSlash,
}

impl CommentStyle {
    /// True if a trimmed line is a comment under this style
    pub fn is_comment(self, line: &str) -> bool {
        match self {
            CommentStyle::Hash => line.starts_with('#'),
            CommentStyle::HashSemicolonSlash => {
                line.starts_with('#') || line.starts_with(';') || line.starts_with("//")
            }
        }
    }
}

/// Entries recovered from a body plus the number of lines thrown away
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineParseOutcome {
    pub entries: Vec<NetworkEntry>,
    /// Non-blank, non-comment lines that did not parse as an IP or CIDR
    pub discarded: usize,
}

/// Parse a feed body line by line
pub fn parse_lines(body: &str, style: CommentStyle) -> LineParseOutcome {
    let mut outcome = LineParseOutcome::default();

    for line in body.lines().map(str::trim) {
        if line.is_empty() || style.is_comment(line) {
            continue;
        }

        match NetworkEntry::parse(line) {
            Ok(entry) => outcome.entries.push(entry),
            Err(_) => outcome.discarded += 1,
        }
    }

    outcome
}

/// Parse a feed body, failing with `NoValidEntries` when nothing survives
pub fn parse_body(feed: &str, body: &str, style: CommentStyle) -> Result<Vec<NetworkEntry>> {
    let outcome = parse_lines(body, style);

    if outcome.discarded > 0 {
        debug!(feed = %feed, discarded = outcome.discarded, "Discarded unparseable lines");
    }

    if outcome.entries.is_empty() {
        return Err(Error::no_valid_entries(feed));
    }

    Ok(outcome.entries)
}
