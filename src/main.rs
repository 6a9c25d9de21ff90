use anyhow::Context as _;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Print the grammar after reading the definition file.
    #[arg(long)]
    dump_grammar: bool,

    /// Print the LR(1) state graph before parsing.
    #[arg(long)]
    dump_automaton: bool,

    /// The path of the grammar definition file.
    grammar: PathBuf,

    /// The input to parse, one terminal per character.
    input: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    let grammar = canlr::syntax::parse_file(&args.grammar)
        .with_context(|| anyhow::anyhow!("errored during processing {}", args.grammar.display()))?;

    if args.dump_grammar {
        println!("{}", grammar);
    }
    if args.dump_automaton {
        let automaton = canlr::lr1::Automaton::generate(&grammar);
        println!("{}", automaton.display(&grammar));
    }

    let parser = canlr::engine::Parser::new(grammar);
    if parser.has_conflict() {
        tracing::warn!("the grammar is ambiguous; shift-preference tie-breaks apply");
    }

    match parser.parse(&args.input) {
        Some(tree) => print!("{}", tree),
        None => anyhow::bail!("syntax error in input `{}'", args.input),
    }

    Ok(())
}
