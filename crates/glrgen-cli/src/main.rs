use anyhow::Context as _;
use clap::Parser;
use glrgen::{automaton::Automaton, codegen::Codegen, grammar::Grammar, schema::AstSchema};
use std::{
    fs,
    io::{Read as _, Write as _},
    path::PathBuf,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of the grammar file (`-` reads standard input).
    input: PathBuf,

    /// Specify the path of the emitted parser (defaults to the input with
    /// an `.sml` extension, or standard output when reading from stdin).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write a human-readable dump of the LR(0) automaton.
    #[arg(long)]
    automaton: Option<PathBuf>,

    /// Write a Graphviz rendering of the state graph.
    #[arg(long)]
    dot: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    process(&args)
        .with_context(|| anyhow::anyhow!("errored during processing {}", args.input.display()))?;

    Ok(())
}

fn process(args: &Args) -> anyhow::Result<()> {
    let from_stdin = args.input.as_os_str() == "-";
    let source = if from_stdin {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read the grammar from standard input")?;
        buf
    } else {
        fs::read_to_string(&args.input)
            .with_context(|| format!("failed to read {}", args.input.display()))?
    };

    let grammar = Grammar::from_source(&source)?;
    tracing::info!(
        terminals = grammar.terminals.len(),
        nonterminals = grammar.nonterminals.len(),
        rules = grammar.rules.len(),
        "grammar normalized"
    );

    let automaton = Automaton::build(&grammar);
    let schema = AstSchema::derive(&grammar);
    let codegen = Codegen::new(&grammar, &automaton, &schema);

    match (&args.output, from_stdin) {
        (Some(out_file), _) => write_file(out_file, codegen.to_string())?,
        (None, true) => {
            std::io::stdout()
                .write_all(codegen.to_string().as_bytes())
                .context("failed to write the parser to standard output")?;
        }
        (None, false) => {
            let out_file = args.input.with_extension("sml");
            write_file(&out_file, codegen.to_string())?;
        }
    }

    if let Some(path) = &args.automaton {
        write_file(path, automaton.display().to_string())?;
    }
    if let Some(path) = &args.dot {
        write_file(path, automaton.dot().to_string())?;
    }

    Ok(())
}

fn write_file(path: &PathBuf, contents: String) -> anyhow::Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
