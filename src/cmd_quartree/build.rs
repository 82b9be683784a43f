use clap::*;
use quartree::libs::matrix::DistanceMatrix;
use quartree::libs::qtree::{io, SearchOptions, TreeSearch};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use std::ops::ControlFlow;
use std::path::Path;
use tracing::info;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("build")
        .about("Hill-climbing search for a quartet-consistent ternary tree")
        .after_help(
            r###"
Searches for an unrooted ternary tree whose leaves are the rows of a distance
matrix. Starting from a random tree, each step applies one random mutation and
keeps the result only if the quartet score strictly improves.

Notes:
* The matrix is `label d1 d2 ... dn` per line, optionally preceded by a line
  holding n (relaxed PHYLIP). Supports gzipped files and stdin
* At least six leaves are needed
* Every accepted tree is written to the output directory as
  inner_node_dict.txt and leaf_dict.txt
* The final score is printed to stdout
* The search stops at --target, after --trees trees, and never before
  --min-iter trees

Examples:
1. Build a tree:
   quartree build tests/data/six.tsv -o tree

2. Reproducible run with a larger budget:
   quartree build tests/data/eight.phy -o tree --trees 5000 --seed 42

3. Continue from a previous checkpoint:
   quartree build tests/data/eight.phy --resume tree -o tree2

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
            Arg::new("outdir")
                .long("outdir")
                .short('o')
                .num_args(1)
                .default_value("dicts")
                .help("Checkpoint directory"),
        )
        .arg(
            Arg::new("trees")
                .long("trees")
                .short('n')
                .num_args(1)
                .default_value("1000")
                .value_parser(value_parser!(usize))
                .help("Maximum number of trees to generate"),
        )
        .arg(
            Arg::new("target")
                .long("target")
                .num_args(1)
                .default_value("0.98")
                .value_parser(value_parser!(f64))
                .help("Stop once the score reaches this value"),
        )
        .arg(
            Arg::new("min_iter")
                .long("min-iter")
                .num_args(1)
                .default_value("6")
                .value_parser(value_parser!(usize))
                .help("Never stop before this many trees"),
        )
        .arg(
            Arg::new("retries")
                .long("retries")
                .num_args(1)
                .default_value("1000")
                .value_parser(value_parser!(usize))
                .help("Resampling budget of each mutation"),
        )
        .arg(
            Arg::new("path_limit")
                .long("path-limit")
                .num_args(1)
                .value_parser(value_parser!(usize))
                .help("Reject mutation candidates joined by paths longer than this many nodes"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .short('s')
                .num_args(1)
                .value_parser(value_parser!(u64))
                .help("Random seed; default uses system entropy"),
        )
        .arg(
            Arg::new("resume")
                .long("resume")
                .num_args(1)
                .help("Start from the tree checkpointed in this directory"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .short('p')
                .value_parser(value_parser!(usize))
                .num_args(1)
                .default_value("1")
                .help("Number of threads for parallel processing"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infile = args.get_one::<String>("infile").unwrap();
    let outdir = Path::new(args.get_one::<String>("outdir").unwrap());

    let options = SearchOptions {
        n_trees: *args.get_one::<usize>("trees").unwrap(),
        target_score: *args.get_one::<f64>("target").unwrap(),
        min_iterations: *args.get_one::<usize>("min_iter").unwrap(),
        max_retries: *args.get_one::<usize>("retries").unwrap(),
        path_limit: args.get_one::<usize>("path_limit").copied(),
    };
    let rng = match args.get_one::<u64>("seed") {
        Some(seed) => StdRng::seed_from_u64(*seed),
        None => StdRng::from_entropy(),
    };

    let opt_parallel = *args.get_one::<usize>("parallel").unwrap();
    rayon::ThreadPoolBuilder::new()
        .num_threads(opt_parallel)
        .build_global()?;

    //----------------------------
    // Ops
    //----------------------------
    let dm = DistanceMatrix::from_file(infile)?;
    info!("Read {} objects from {}", dm.size(), infile);

    let mut search = match args.get_one::<String>("resume") {
        Some(dir) => {
            let tree = io::load(Path::new(dir))?;
            info!("Resume from {}", dir);
            TreeSearch::resume(&dm, tree, options, rng)?
        }
        None => TreeSearch::new(&dm, options, rng)?,
    };
    io::save(search.tree(), outdir)?;

    let mut failed = None;
    let outcome = search.run(|p| {
        if p.accepted {
            if let Err(e) = io::save(p.tree, outdir) {
                failed = Some(e);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    })?;
    if let Some(e) = failed {
        return Err(e);
    }

    //----------------------------
    // Output
    //----------------------------
    let mut writer = intspan::writer("stdout");
    writer.write_fmt(format_args!("{:.6}\n", outcome.score))?;

    Ok(())
}
