// src/report.rs
// =============================================================================
// Builds the broken link report from a finished crawl and renders it.
//
// The text format is a small YAML-like document:
//
//   ---
//   title: Broken Link Report
//   checked: 12
//   number of email links: 1
//   emails: a@b.com
//   broken: 1
//   ---
//
//   - code:    404
//     url:     https://example.com/page2
//     parent:  https://example.com
//     error:   Not Found
//
// Broken entries are sorted by status code, highest first. Entries with the
// same code keep the order in which the crawler found them.
// =============================================================================

use crate::checker::BrokenEntry;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

pub const REPORT_TITLE: &str = "Broken Link Report";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub title: String,
    /// Number of distinct URLs fetched
    pub checked: usize,
    pub mailto_count: usize,
    /// Deduplicated, sorted email addresses
    pub mailto_addresses: Vec<String>,
    pub broken_count: usize,
    pub broken: Vec<BrokenEntry>,
}

// Assembles the report
//
// Parameters:
//   checked: size of the visited set
//   mailto: addresses collected from mailto: links
//   broken: broken entries in discovery order
//   ok_codes: status codes that must never show up as broken
pub fn build(
    checked: usize,
    mailto: &BTreeSet<String>,
    broken: &[BrokenEntry],
    ok_codes: &BTreeSet<u16>,
) -> Report {
    let mut broken: Vec<BrokenEntry> = broken
        .iter()
        .filter(|entry| !ok_codes.contains(&entry.status_code))
        .cloned()
        .collect();

    // sort_by is stable, so equal codes stay in discovery order
    broken.sort_by(|a, b| b.status_code.cmp(&a.status_code));

    let mailto_addresses: Vec<String> = mailto.iter().cloned().collect();

    Report {
        title: REPORT_TITLE.to_string(),
        checked,
        mailto_count: mailto_addresses.len(),
        mailto_addresses,
        broken_count: broken.len(),
        broken,
    }
}

impl Report {
    pub fn has_broken(&self) -> bool {
        self.broken_count > 0
    }

    pub fn emails(&self) -> String {
        self.mailto_addresses.join(", ")
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "---")?;
        writeln!(f, "title: {}", self.title)?;
        writeln!(f, "checked: {}", self.checked)?;
        writeln!(f, "number of email links: {}", self.mailto_count)?;
        writeln!(f, "emails: {}", self.emails())?;
        writeln!(f, "broken: {}", self.broken_count)?;
        writeln!(f, "---")?;

        for entry in &self.broken {
            writeln!(f)?;
            writeln!(f, "- code:    {}", entry.status_code)?;
            writeln!(f, "  url:     {}", entry.url)?;
            writeln!(f, "  parent:  {}", entry.parent)?;
            writeln!(f, "  error:   {}", entry.reason)?;
        }

        Ok(())
    }
}
