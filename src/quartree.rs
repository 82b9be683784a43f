extern crate clap;
use clap::*;
use tracing_subscriber::EnvFilter;

mod cmd_quartree;

fn main() -> anyhow::Result<()> {
    init_logging();

    let app = Command::new("quartree")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`quartree` - Quartet-consistency trees from distance matrices")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .subcommand(cmd_quartree::build::make_subcommand())
        .subcommand(cmd_quartree::score::make_subcommand())
        .subcommand(cmd_quartree::clust::make_subcommand())
        .subcommand(cmd_quartree::to_dot::make_subcommand())
        .subcommand(cmd_quartree::oligo::make_subcommand())
        .after_help(
            r###"Subcommands:

* Trees:
    * build  - Hill-climbing search for a ternary tree
    * score  - Quartet score of a saved tree
    * clust  - Cut a saved tree into k clusters
    * to-dot - Graphviz text of a saved tree

* Oligos:
    * oligo - Expand degenerate oligos

Logging goes to stderr. Set RUST_LOG (or QUARTREE_LOG=debug) for more detail.

"###,
        );

    match app.get_matches().subcommand() {
        Some(("build", sub_matches)) => cmd_quartree::build::execute(sub_matches),
        Some(("score", sub_matches)) => cmd_quartree::score::execute(sub_matches),
        Some(("clust", sub_matches)) => cmd_quartree::clust::execute(sub_matches),
        Some(("to-dot", sub_matches)) => cmd_quartree::to_dot::execute(sub_matches),
        Some(("oligo", sub_matches)) => cmd_quartree::oligo::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("QUARTREE_LOG").unwrap_or_else(|_| "info".to_string());
        EnvFilter::new(level)
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
