use anyhow::Result;
use std::io::Write;

use crate::clustering::similarity::SimilarityIndex;
use crate::clustering::store::ClusterStore;
use crate::clustering::types::Cluster;

/// Live clusters in report order: decreasing average similarity, ascending
/// id between equals. Clusters that never merged sort as average 0.
pub fn sorted_for_report(store: &ClusterStore) -> Vec<&Cluster> {
    let mut clusters: Vec<&Cluster> = store.iter().collect();
    clusters.sort_by(|a, b| {
        let avg_a = a.avg_sim.unwrap_or(0.0);
        let avg_b = b.avg_sim.unwrap_or(0.0);
        avg_b.total_cmp(&avg_a).then(a.id.cmp(&b.id))
    });
    clusters
}

/// Writes the primary cluster report: each non-singleton cluster with its
/// average similarity and sorted member lines, optionally followed by the
/// merge trail with per-step averages. Cluster numbers come from the sorted
/// enumeration, so singletons consume a number even though they are omitted.
pub fn write_report(out: &mut impl Write, store: &ClusterStore, show_order: bool) -> Result<()> {
    for (i, cluster) in sorted_for_report(store).iter().enumerate() {
        if cluster.is_singleton() {
            continue;
        }

        writeln!(
            out,
            "Cluster {}: Average Similarity = {:.3}",
            i,
            cluster.avg_sim.unwrap_or(0.0)
        )?;
        for element in cluster.sorted_elements() {
            writeln!(out, "{}", element.as_line())?;
        }

        if show_order {
            writeln!(out, "Order of Additions:")?;
            for step in &cluster.history {
                let members = step
                    .absorbed
                    .iter()
                    .map(|e| e.as_line())
                    .collect::<Vec<_>>()
                    .join("; ");
                match step.avg {
                    Some(avg) => writeln!(out, "\t+ {} (avg = {:.3})", members, avg)?,
                    None => writeln!(out, "\t= {}", members)?,
                }
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Writes the same clusters as the text report (non-singletons, report
/// order) as JSON, for downstream evaluation tooling.
pub fn write_json_report(out: &mut impl Write, store: &ClusterStore) -> Result<()> {
    let clusters: Vec<&Cluster> = sorted_for_report(store)
        .into_iter()
        .filter(|c| !c.is_singleton())
        .collect();
    serde_json::to_writer_pretty(&mut *out, &clusters)?;
    writeln!(out)?;
    Ok(())
}

/// Writes the pre-clustering similarity graph in the plain vertex/edge
/// format consumed by external community-detection tools: one vertex per
/// initial cluster labelled with its representative element, one weighted
/// edge per similarity entry.
pub fn write_graph(
    out: &mut impl Write,
    store: &ClusterStore,
    index: &SimilarityIndex,
) -> Result<()> {
    writeln!(out, "*Vertices {}", store.len())?;
    for cluster in store.iter() {
        let representative = &cluster.elements[0];
        writeln!(out, " {} \"{}\"", cluster.id, representative.as_line())?;
    }

    let entries = index.sorted_entries();
    writeln!(out, "*Edges {}", entries.len())?;
    for (key, entry) in entries {
        writeln!(out, "{} {} {}", key.lo(), key.hi(), entry.avg)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::scores::PairScoreTable;

    fn el(language: &str, form: &str) -> Element {
        Element::new(language, form, "gloss")
    }

    fn merged_store() -> ClusterStore {
        let mut store = ClusterStore::from_singletons(vec![
            el("C", "a"),
            el("F", "b"),
            el("M", "c"),
            el("O", "d"),
        ]);
        // ids 0..4; merge 0+2 at 0.9, leave 1 and 3 as singletons
        store.merge(0, 2, 0.9, 0.9, 1).unwrap();
        store
    }

    #[test]
    fn report_skips_singletons_but_numbers_them() {
        let mut out = Vec::new();
        write_report(&mut out, &merged_store(), false).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Cluster 0: Average Similarity = 0.900\n"));
        assert!(text.contains("C\ta\tgloss\n"));
        assert!(text.contains("M\tc\tgloss\n"));
        assert!(!text.contains("F\tb"));
        assert!(!text.contains("O\td"));
    }

    #[test]
    fn report_orders_by_decreasing_average() {
        let mut store = ClusterStore::from_singletons(vec![
            el("C", "a"),
            el("F", "b"),
            el("M", "c"),
            el("O", "d"),
        ]);
        store.merge(0, 1, 0.2, 0.2, 1).unwrap();
        store.merge(2, 3, 0.8, 0.8, 1).unwrap();

        let mut out = Vec::new();
        write_report(&mut out, &store, false).unwrap();
        let text = String::from_utf8(out).unwrap();

        let high = text.find("Average Similarity = 0.800").unwrap();
        let low = text.find("Average Similarity = 0.200").unwrap();
        assert!(high < low);
    }

    #[test]
    fn merge_trail_is_printed_when_requested() {
        let mut out = Vec::new();
        write_report(&mut out, &merged_store(), true).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Order of Additions:"));
        assert!(text.contains("\t= C\ta\tgloss"));
        assert!(text.contains("\t+ M\tc\tgloss (avg = 0.900)"));
    }

    #[test]
    fn json_report_contains_only_non_singletons() {
        let mut out = Vec::new();
        write_json_report(&mut out, &merged_store()).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();

        let clusters = parsed.as_array().unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0]["id"], 0);
        assert_eq!(clusters[0]["elements"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn graph_lists_vertices_then_weighted_edges() {
        let store = ClusterStore::from_singletons(vec![el("C", "a"), el("M", "b")]);
        let mut table = PairScoreTable::new();
        table.insert(el("C", "a"), el("M", "b"), 0.5);
        let index = SimilarityIndex::build(&store, &table);

        let mut out = Vec::new();
        write_graph(&mut out, &store, &index).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("*Vertices 2\n"));
        assert!(text.contains(" 0 \"C\ta\tgloss\"\n"));
        assert!(text.contains(" 1 \"M\tb\tgloss\"\n"));
        assert!(text.contains("*Edges 1\n"));
        assert!(text.ends_with("0 1 0.5\n"));
    }
}
