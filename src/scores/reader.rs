use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::element::Element;
use crate::scores::table::{PairScoreTable, SameLanguagePolicy};

/// Matches one element line of a record: language, form, gloss separated by
/// tabs. The whole line must match so stray feature lines are not mistaken
/// for elements.
static WORD_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([^\t\n]+)\t([^\t\n]+)\t([^\t\n]+)$").unwrap());

/// Matches the classifier's decision value line.
static VALUE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Value: ([^\n]+)").unwrap());

/// Reads a classified-pairs file into a [`PairScoreTable`].
///
/// The format is what the external pairwise classifier emits: records
/// separated by blank lines, each record containing the two compared element
/// lines (`language<TAB>form<TAB>gloss`) plus a `Value: <score>` line. Any
/// feature lines in between are ignored. Records without a value line are
/// skipped with a warning; records whose value does not parse are a hard
/// error, since a truncated file should fail before clustering starts.
pub fn read_classified_pairs(
    path: impl AsRef<Path>,
    policy: SameLanguagePolicy,
) -> Result<PairScoreTable> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read classified pairs file {}", path.display()))?;
    let table = parse_classified_pairs(&text, policy)
        .with_context(|| format!("malformed classified pairs file {}", path.display()))?;
    debug!(
        "read {} scored pairs from {}",
        table.len(),
        path.display()
    );
    Ok(table)
}

/// Parses classified-pairs text. Split out from the file wrapper so the
/// format can be tested without touching the filesystem.
pub fn parse_classified_pairs(text: &str, policy: SameLanguagePolicy) -> Result<PairScoreTable> {
    let mut table = PairScoreTable::new();

    for record in text.split("\n\n") {
        if record.trim().is_empty() {
            continue;
        }

        let value_match = match VALUE_LINE.captures(record) {
            Some(captures) => captures,
            None => {
                warn!("skipping record without a Value line: {:?}", first_line(record));
                continue;
            }
        };
        let raw_value = value_match[1].trim();
        let score: f64 = raw_value
            .parse()
            .with_context(|| format!("unparseable classifier value {:?}", raw_value))?;

        let mut words = WORD_LINE.captures_iter(record);
        let (first, second) = match (words.next(), words.next()) {
            (Some(first), Some(second)) => (first, second),
            _ => bail!(
                "record is missing its two element lines: {:?}",
                first_line(record)
            ),
        };

        let e1 = Element::new(&first[1], &first[2], &first[3]);
        let e2 = Element::new(&second[1], &second[2], &second[3]);

        if e1.language == e2.language {
            match policy {
                SameLanguagePolicy::Exclude => continue,
                SameLanguagePolicy::Zero => table.insert(e1, e2, 0.0),
            }
        } else {
            table.insert(e1, e2, score);
        }
    }

    Ok(table)
}

fn first_line(record: &str) -> &str {
    record.lines().next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIRS: &str = "\
C\takohp\tblanket\n\
1:1 2:0 3:1\n\
M\tahkop\tblanket\n\
Value: 1.25\n\
\n\
C\takohp\tblanket\n\
F\tahkopiwin\tcovering\n\
Value: -0.5\n\
\n\
C\takohp\tblanket\n\
C\takwanahon\tblanket\n\
Value: 0.9\n";

    fn el(language: &str, form: &str, gloss: &str) -> Element {
        Element::new(language, form, gloss)
    }

    #[test]
    fn parses_scores_and_skips_feature_lines() {
        let table = parse_classified_pairs(PAIRS, SameLanguagePolicy::Zero).unwrap();
        assert_eq!(
            table.lookup(
                &el("C", "akohp", "blanket"),
                &el("M", "ahkop", "blanket")
            ),
            Some(1.25)
        );
        assert_eq!(
            table.lookup(
                &el("C", "akohp", "blanket"),
                &el("F", "ahkopiwin", "covering")
            ),
            Some(-0.5)
        );
    }

    #[test]
    fn same_language_pair_scores_zero_by_default() {
        let table = parse_classified_pairs(PAIRS, SameLanguagePolicy::Zero).unwrap();
        assert_eq!(
            table.lookup(
                &el("C", "akohp", "blanket"),
                &el("C", "akwanahon", "blanket")
            ),
            Some(0.0)
        );
    }

    #[test]
    fn same_language_pair_can_be_excluded() {
        let table = parse_classified_pairs(PAIRS, SameLanguagePolicy::Exclude).unwrap();
        assert_eq!(
            table.lookup(
                &el("C", "akohp", "blanket"),
                &el("C", "akwanahon", "blanket")
            ),
            None
        );
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn record_without_value_line_is_skipped() {
        let text = "C\ta\tx\nM\tb\ty\n\n\nC\ta\tx\nF\tc\tz\nValue: 0.5\n";
        let table = parse_classified_pairs(text, SameLanguagePolicy::Zero).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn unparseable_value_is_an_error() {
        let text = "C\ta\tx\nM\tb\ty\nValue: not-a-number\n";
        assert!(parse_classified_pairs(text, SameLanguagePolicy::Zero).is_err());
    }

    #[test]
    fn missing_element_lines_is_an_error() {
        let text = "C\ta\tx\nValue: 1.0\n";
        assert!(parse_classified_pairs(text, SameLanguagePolicy::Zero).is_err());
    }
}
