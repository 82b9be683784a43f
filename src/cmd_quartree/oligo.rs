use clap::*;
use quartree::libs::oligo::{count_degeneracy, expand_degenerate, DegeneracyTable};
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("oligo")
        .about("Expand degenerate oligos")
        .after_help(
            r###"
Expands each pattern into every concrete sequence it stands for, using the
IUPAC nucleotide ambiguity codes (R Y S W K M B D H V N).

Notes:
* Patterns are uppercased first
* Sequences of one pattern are printed sorted and deduplicated
* With several patterns, each line is prefixed by the pattern and a TAB
* Symbols other than ACGT and the codes above are rejected unless --lenient
  is given, which keeps them as they are
* --count prints the number of expansions instead

Examples:
1. Expand one primer:
   quartree oligo GGNTAYCARGC

2. How degenerate are these primers:
   quartree oligo GGNTAYCARGC TGRTANCCRAA --count

"###,
        )
        .arg(
            Arg::new("patterns")
                .required(true)
                .num_args(1..)
                .index(1)
                .help("Degenerate patterns"),
        )
        .arg(
            Arg::new("lenient")
                .long("lenient")
                .action(ArgAction::SetTrue)
                .help("Keep unknown symbols as literals"),
        )
        .arg(
            Arg::new("count")
                .long("count")
                .short('c')
                .action(ArgAction::SetTrue)
                .help("Print the degeneracy of each pattern"),
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
    let patterns: Vec<String> = args
        .get_many::<String>("patterns")
        .unwrap()
        .map(|p| p.to_ascii_uppercase())
        .collect();
    let is_count = args.get_flag("count");
    let table = DegeneracyTable::iupac().with_strict(!args.get_flag("lenient"));

    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());

    //----------------------------
    // Ops
    //----------------------------
    let prefixed = patterns.len() > 1;
    for pattern in &patterns {
        if is_count {
            let count = count_degeneracy(pattern, &table)?;
            writer.write_fmt(format_args!("{}\t{}\n", pattern, count))?;
            continue;
        }

        for seq in expand_degenerate(pattern, &table)? {
            if prefixed {
                writer.write_fmt(format_args!("{}\t{}\n", pattern, seq))?;
            } else {
                writer.write_fmt(format_args!("{}\n", seq))?;
            }
        }
    }

    Ok(())
}
