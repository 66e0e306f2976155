//! Build-script integration.
//!
//! Generates a parser for every `*.cf` grammar below a crate root, writing
//! the emitted module to the mirrored path inside `OUT_DIR` and the
//! automaton dump next to the grammar for inspection.

use crate::{automaton::Automaton, codegen::Codegen, grammar::Grammar, schema::AstSchema};
use anyhow::Context as _;
use std::{env, fs, path::Path, path::PathBuf};
use walkdir::WalkDir;

/// Process every grammar under `CARGO_MANIFEST_DIR`.
pub fn process_root() -> anyhow::Result<()> {
    let root = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .context("`CARGO_MANIFEST_DIR` is not set; call this from a build script")?;
    process_dir(&root)
}

/// Process every grammar under `root`.
pub fn process_dir(root: &Path) -> anyhow::Result<()> {
    let out_dir = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .context("`OUT_DIR` is not set; call this from a build script")?;

    for entry in WalkDir::new(root) {
        let entry = entry?;
        let path = entry.path();
        let is_grammar = entry.file_type().is_file()
            && path.extension().map_or(false, |ext| ext == "cf");
        if is_grammar {
            generate(path, root, &out_dir)
                .with_context(|| format!("failed to generate a parser for {}", path.display()))?;
        }
    }
    Ok(())
}

fn generate(grammar_file: &Path, root: &Path, out_dir: &Path) -> anyhow::Result<()> {
    println!("cargo:rerun-if-changed={}", grammar_file.display());

    let grammar = Grammar::from_file(grammar_file)?;
    let automaton = Automaton::build(&grammar);
    let schema = AstSchema::derive(&grammar);
    let generated = Codegen::new(&grammar, &automaton, &schema).to_string();

    let out_file = out_dir
        .join(grammar_file.strip_prefix(root)?)
        .with_extension("sml");
    if let Some(parent) = out_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&out_file, generated)?;

    let automaton_file = grammar_file.with_extension("cf.automaton");
    fs::write(&automaton_file, automaton.display().to_string())?;

    Ok(())
}
