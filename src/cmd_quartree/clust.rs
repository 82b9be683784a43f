use clap::*;
use quartree::libs::matrix::DistanceMatrix;
use quartree::libs::qtree::{cluster_with, io, ClusterOptions, Linkage};
use std::io::Write;
use std::path::Path;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("clust")
        .about("Cut a saved tree into k clusters")
        .after_help(
            r###"
Merges leaves of the checkpointed tree bottom-up until k clusters are left.
Each merge joins the two clusters closest in the tree; ties are broken by the
linkage distance over the matrix.

Output is `label<TAB>cluster` in matrix order. Clusters are numbered from 0.

Examples:
1. Three clusters with average linkage:
   quartree clust tests/data/six.tsv tree -k 3

2. Single linkage:
   quartree clust tests/data/six.tsv tree -k 2 --linkage single

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Distance matrix"),
        )
        .arg(
            Arg::new("dir")
                .required(true)
                .num_args(1)
                .index(2)
                .help("Checkpoint directory"),
        )
        .arg(
            Arg::new("k")
                .short('k')
                .required(true)
                .num_args(1)
                .value_parser(value_parser!(usize))
                .help("Number of clusters"),
        )
        .arg(
            Arg::new("linkage")
                .long("linkage")
                .num_args(1)
                .value_parser(["single", "complete", "average"])
                .default_value("average")
                .help("Distance between clusters"),
        )
        .arg(
            Arg::new("max_path")
                .long("max-path")
                .num_args(1)
                .default_value("3")
                .value_parser(value_parser!(usize))
                .help("Longest anchor-to-anchor path, in nodes, preferred for a merge"),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infile = args.get_one::<String>("infile").unwrap();
    let dir = args.get_one::<String>("dir").unwrap();

    let mut options = ClusterOptions::new(
        *args.get_one::<usize>("k").unwrap(),
        args.get_one::<String>("linkage").unwrap().parse::<Linkage>()?,
    );
    options.max_path_nodes = *args.get_one::<usize>("max_path").unwrap();

    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());

    //----------------------------
    // Ops
    //----------------------------
    let dm = DistanceMatrix::from_file(infile)?;
    let tree = io::load(Path::new(dir))?.with_leaf_order(dm.get_names())?;
    let labels = cluster_with(&options, &tree, &dm)?;

    //----------------------------
    // Output
    //----------------------------
    for (name, cluster) in dm.get_names().iter().zip(labels) {
        writer.write_fmt(format_args!("{}\t{}\n", name, cluster))?;
    }

    Ok(())
}
