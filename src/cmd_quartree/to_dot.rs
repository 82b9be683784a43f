use clap::*;
use quartree::libs::qtree::io;
use std::io::Write;
use std::path::Path;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("to-dot")
        .about("Graphviz text of a saved tree")
        .after_help(
            r###"
Writes the checkpointed tree as an undirected Graphviz graph. Inner nodes are
points, leaves are boxes.

With --clusters, leaves are filled with one color per cluster. The file holds
`label<TAB>cluster` lines, as written by `quartree clust`.

Examples:
1. Plain tree:
   quartree to-dot tree | neato -Tpng -o tree.png

2. Colored by cluster:
   quartree clust tests/data/six.tsv tree -k 3 > clusters.tsv
   quartree to-dot tree --clusters clusters.tsv

"###,
        )
        .arg(
            Arg::new("dir")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Checkpoint directory"),
        )
        .arg(
            Arg::new("clusters")
                .long("clusters")
                .num_args(1)
                .help("Cluster assignment of every leaf"),
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
    let dir = args.get_one::<String>("dir").unwrap();
    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());

    //----------------------------
    // Ops
    //----------------------------
    let tree = io::load(Path::new(dir))?;
    let clusters = match args.get_one::<String>("clusters") {
        Some(file) => Some(io::read_clusters(file, tree.labels())?),
        None => None,
    };

    writer.write_all(tree.to_dot(clusters.as_deref()).as_bytes())?;

    Ok(())
}
