use clap::*;
use quartree::libs::matrix::DistanceMatrix;
use quartree::libs::qtree::{io, QuartetScorer};
use std::io::Write;
use std::path::Path;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("score")
        .about("Quartet score of a saved tree")
        .after_help(
            r###"
Scores the tree checkpointed in <dir> against a distance matrix.

Notes:
* Tree leaves and matrix labels must be the same set
* With --detail, also prints the raw cost and the best and worst costs the
  matrix allows, tab separated

Examples:
1. Score a tree:
   quartree score tests/data/six.tsv tree

2. Show the raw costs:
   quartree score tests/data/six.tsv tree --detail

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
            Arg::new("detail")
                .long("detail")
                .action(ArgAction::SetTrue)
                .help("Print cost, min cost and max cost after the score"),
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
    let is_detail = args.get_flag("detail");

    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());

    //----------------------------
    // Ops
    //----------------------------
    let dm = DistanceMatrix::from_file(infile)?;
    let tree = io::load(Path::new(dir))?.with_leaf_order(dm.get_names())?;

    let scorer = QuartetScorer::new(&dm);
    let score = scorer.score_tree(&tree)?;

    //----------------------------
    // Output
    //----------------------------
    if is_detail {
        writer.write_fmt(format_args!(
            "{:.6}\t{}\t{}\t{}\n",
            score.value,
            score.cost,
            scorer.min_cost(),
            scorer.max_cost()
        ))?;
    } else {
        writer.write_fmt(format_args!("{:.6}\n", score.value))?;
    }

    Ok(())
}
