//! CLI entry point: load a map description, build its BSP tree, report the
//! tree's shape, and optionally persist an archived cache.

use std::process::ExitCode;

use clap::Parser;
use ddbsp::{cache, BspError, BuildConfig, MapDescription, NodeBuilder};

fn count_tree(tree: &ddbsp::output::Tree, nodes: &mut u32, leaves: &mut u32) {
    match tree {
        ddbsp::output::Tree::Leaf(_) => *leaves += 1,
        ddbsp::output::Tree::Node(n) => {
            *nodes += 1;
            count_tree(&n.right, nodes, leaves);
            count_tree(&n.left, nodes, leaves);
        }
    }
}

fn run() -> Result<(), BspError> {
    let config = BuildConfig::parse();
    config.validate_factor()?;

    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::new(config.tracing_filter())).init();

    let map = MapDescription::load(&config.input)?;
    let builder = NodeBuilder::new(config.factor)?;
    let built = builder.build(&map)?;

    let (mut nodes, mut leaves) = (0u32, 0u32);
    count_tree(&built.tree, &mut nodes, &mut leaves);
    println!(
        "built {} vertices, {} half-edges, {} faces, {} internal nodes, {} leaves",
        built.vertices.len(),
        built.hedges.len(),
        built.faces.len(),
        nodes,
        leaves
    );
    if !built.diagnostics.unclosed.is_empty() || !built.diagnostics.mismatches.is_empty() {
        println!(
            "{} unclosed sector(s), {} sector mismatch(es)",
            built.diagnostics.unclosed.len(),
            built.diagnostics.mismatches.len()
        );
    }

    if let Some(cache_path) = &config.cache {
        cache::write_archived(&built, cache_path)?;
        println!("wrote archived cache to {}", cache_path.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ddbsp: {err}");
            ExitCode::FAILURE
        }
    }
}
