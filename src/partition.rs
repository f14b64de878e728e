use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::element::Element;

/// Reads a definition-sets file into an initial partition: one group per
/// blank-line-separated block.
///
/// The first line of each block is the shared definition (kept only as a
/// provenance label by the writer that produced the file; the engine ignores
/// it), and every following line is an element as `language<TAB>form<TAB>gloss`.
pub fn read_definition_sets(path: impl AsRef<Path>) -> Result<Vec<Vec<Element>>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read definition sets file {}", path.display()))?;
    let groups = parse_definition_sets(&text)
        .with_context(|| format!("malformed definition sets file {}", path.display()))?;
    debug!("read {} definition sets from {}", groups.len(), path.display());
    Ok(groups)
}

pub fn parse_definition_sets(text: &str) -> Result<Vec<Vec<Element>>> {
    let mut groups = Vec::new();

    for block in text.split("\n\n") {
        if block.trim().is_empty() {
            continue;
        }

        let mut lines = block.lines();
        let definition = lines.next().unwrap_or("");

        let mut group = Vec::new();
        for line in lines {
            let mut fields = line.split('\t');
            match (fields.next(), fields.next(), fields.next(), fields.next()) {
                (Some(language), Some(form), Some(gloss), None) => {
                    group.push(Element::new(language, form, gloss));
                }
                _ => bail!(
                    "expected language<TAB>form<TAB>gloss in set {:?}, got {:?}",
                    definition,
                    line
                ),
            }
        }

        if group.is_empty() {
            bail!("definition set {:?} has no elements", definition);
        }
        groups.push(group);
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_groups_with_definition_headers() {
        let text = "blanket\nC\takohp\tblanket\nM\tahkop\tblanket\n\nstar\nF\talakws\tstar\n";
        let groups = parse_definition_sets(text).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0][1], Element::new("M", "ahkop", "blanket"));
        assert_eq!(groups[1], vec![Element::new("F", "alakws", "star")]);
    }

    #[test]
    fn rejects_malformed_element_lines() {
        let text = "blanket\nC\takohp\n";
        assert!(parse_definition_sets(text).is_err());
    }

    #[test]
    fn rejects_header_only_sets() {
        let text = "blanket\n\nstar\nF\talakws\tstar\n";
        assert!(parse_definition_sets(text).is_err());
    }
}
