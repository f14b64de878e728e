use anyhow::{Context, Result};
use clap::Parser;
use prettytable::{Cell, Row, Table};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use cognate::clustering::{
    self, write_graph, write_json_report, write_report, ClusteringEngine, ClusterStore,
};
use cognate::partition::read_definition_sets;
use cognate::scores::{read_classified_pairs, PairScoreTable, SameLanguagePolicy};

#[derive(Parser)]
#[clap(
    name = "cognate",
    about = "Cluster classifier-scored word pairs into cognate sets"
)]
struct Cli {
    /// Classified pairs file from the general model
    #[clap(short, long)]
    pairs: PathBuf,

    /// Output cluster report file
    #[clap(short, long)]
    clusters: PathBuf,

    /// Definition sets file; when given, clustering starts from these groups
    /// instead of one singleton per scored element
    #[clap(short, long)]
    sets: Option<PathBuf>,

    /// Classified pairs file from the substring model, blended with the
    /// general scores
    #[clap(long)]
    substring_pairs: Option<PathBuf>,

    /// Weight of the substring score versus the general score
    #[clap(long, default_value_t = clustering::DEFAULT_BLEND_WEIGHT)]
    substring_weight: f64,

    /// Merging stops once the maximum similarity is at or below this value
    #[clap(short, long, default_value_t = clustering::DEFAULT_MERGE_THRESHOLD)]
    threshold: f64,

    /// Drop same-language pairs entirely instead of scoring them 0
    #[clap(long)]
    no_same_lang: bool,

    /// Write the pre-clustering similarity graph to this file (vertex/edge
    /// format for external community-detection tools)
    #[clap(long)]
    graph: Option<PathBuf>,

    /// Also write the report as JSON to this file
    #[clap(long)]
    json: Option<PathBuf>,

    /// Include merge-order history in the report
    #[clap(long)]
    order: bool,

    /// Log progress to stderr
    #[clap(long)]
    progress: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    cognate::logging::configure_logging(args.progress);

    let start = Instant::now();
    let policy = if args.no_same_lang {
        SameLanguagePolicy::Exclude
    } else {
        SameLanguagePolicy::Zero
    };

    info!("reading classified pairs from {}", args.pairs.display());
    let general = read_classified_pairs(&args.pairs, policy)?;

    let table = match &args.substring_pairs {
        Some(path) => {
            info!("reading substring pairs from {}", path.display());
            let substring = read_classified_pairs(path, policy)?;
            info!(
                "blending scores with substring weight {}",
                args.substring_weight
            );
            PairScoreTable::blend(&general, &substring, args.substring_weight)
        }
        None => general,
    };
    info!("{} scored pairs loaded", table.len());

    let store = match &args.sets {
        Some(path) => {
            info!("initializing clusters from {}", path.display());
            ClusterStore::from_groups(read_definition_sets(path)?)
        }
        None => ClusterStore::from_singletons(table.elements()),
    };
    let initial_clusters = store.len();
    info!("{} initial clusters", initial_clusters);

    let mut engine = ClusteringEngine::new(store, table, args.threshold);
    engine.build_similarities()?;
    let initial_entries = engine.index().len();

    if let Some(path) = &args.graph {
        info!("writing similarity graph to {}", path.display());
        let file = File::create(path)
            .with_context(|| format!("failed to create graph file {}", path.display()))?;
        write_graph(&mut BufWriter::new(file), engine.store(), engine.index())?;
    }

    let merges = engine.run()?;

    let report = File::create(&args.clusters)
        .with_context(|| format!("failed to create cluster file {}", args.clusters.display()))?;
    write_report(&mut BufWriter::new(report), engine.store(), args.order)?;
    info!("cluster report written to {}", args.clusters.display());

    if let Some(path) = &args.json {
        let file = File::create(path)
            .with_context(|| format!("failed to create JSON file {}", path.display()))?;
        write_json_report(&mut BufWriter::new(file), engine.store())?;
        info!("JSON report written to {}", path.display());
    }

    let final_clusters = engine.store().len();
    let cognate_sets = engine.store().iter().filter(|c| !c.is_singleton()).count();

    let mut summary = Table::new();
    summary.add_row(Row::new(vec![Cell::new("Initial clusters"), Cell::new(&initial_clusters.to_string())]));
    summary.add_row(Row::new(vec![Cell::new("Similarity entries"), Cell::new(&initial_entries.to_string())]));
    summary.add_row(Row::new(vec![Cell::new("Merges"), Cell::new(&merges.to_string())]));
    summary.add_row(Row::new(vec![Cell::new("Final clusters"), Cell::new(&final_clusters.to_string())]));
    summary.add_row(Row::new(vec![Cell::new("Cognate sets"), Cell::new(&cognate_sets.to_string())]));
    summary.add_row(Row::new(vec![Cell::new("Elapsed"), Cell::new(&format!("{:.2?}", start.elapsed()))]));
    summary.printstd();

    Ok(())
}
