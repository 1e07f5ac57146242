//! memtree CLI: inspect and edit a settings file from the shell.
//!
//! # Usage
//!
//! ```text
//! memtree lockbox get pid.p
//! memtree lockbox set pid.p 0.8
//! memtree lockbox keys pid --defaults pid_defaults
//! memtree lockbox dump pid
//! memtree lockbox import pid saved_pid.yml
//! memtree lockbox rm pid.d
//! memtree lockbox mv pid pid_old
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`).

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use memtree_core::{
    Branch, ConfigLocator, Entry, MemoryTree, Result, TreeConfig, TreeError, YamlFormat,
};


#[derive(Debug, Parser)]
#[command(name = "memtree", version, about = "Read and edit hierarchical settings files")]
struct Cli {
    /// Directory for user copies (default: $MEMTREE_USER_DIR or ~/.config/memtree).
    #[arg(long)]
    user_dir: Option<PathBuf>,

    /// Directory holding templates (default: $MEMTREE_DEFAULT_DIR or ~/.config/memtree/defaults).
    #[arg(long)]
    default_dir: Option<PathBuf>,

    /// Template to seed the file from when it does not exist yet.
    #[arg(long)]
    source: Option<String>,

    /// Branch to fall back to on reads; repeat for a longer chain.
    #[arg(long = "defaults", global = true)]
    defaults: Vec<String>,

    /// Logical file name, e.g. `lockbox` or `./lockbox.yml`.
    file: String,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Print a leaf value, or a branch as a document.
    Get { path: String },
    /// Store a YAML value at a dotted path, creating branches on the way.
    Set { path: String, value: String },
    /// List the keys of a branch (merged with defaults).
    Keys { branch: Option<String> },
    /// Print a branch's own data as a document.
    Dump { branch: Option<String> },
    /// Replace a branch's own data with the contents of a file.
    Import { branch: String, file: PathBuf },
    /// Remove a key from its branch.
    Rm { path: String },
    /// Rename a branch in place.
    Mv { branch: String, new_name: String },
}

impl Cmd {
    fn mutates(&self) -> bool {
        matches!(self, Cmd::Set { .. } | Cmd::Import { .. } | Cmd::Rm { .. } | Cmd::Mv { .. })
    }
}


fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output.trim_end());
            }
        }
        Err(e) => {
            eprintln!("memtree: {}", e);
            process::exit(1);
        }
    }
}


fn locator_for(cli: &Cli) -> ConfigLocator {
    let mut locator = ConfigLocator::from_env();
    if let Some(dir) = &cli.user_dir {
        locator.user_dir = dir.clone();
    }
    if let Some(dir) = &cli.default_dir {
        locator.default_dir = dir.clone();
    }
    locator
}


fn run(cli: &Cli) -> Result<String> {
    let locator = locator_for(cli);
    let tree = MemoryTree::open(
        Some(cli.file.as_str()),
        cli.source.as_deref(),
        &locator,
        TreeConfig::from_env(),
    )?;
    debug!("opened {:?}", tree.path());
    let output = execute(&tree, &cli.defaults, &cli.command)?;
    if cli.command.mutates() {
        tree.save_now()?;
    }
    Ok(output)
}


fn execute(tree: &MemoryTree, defaults: &[String], cmd: &Cmd) -> Result<String> {
    match cmd {
        Cmd::Get { path } => {
            let (parent, key) = split_path(path)?;
            let branch = open_branch(tree, parent, defaults)?;
            match branch.read(key)? {
                Entry::Leaf(leaf) => Ok(leaf.to_string()),
                Entry::Branch(b) => render_merged(tree, &b),
            }
        }
        Cmd::Set { path, value } => {
            let (parent, key) = split_path(path)?;
            let node = YamlFormat::parse_value(value)?;
            create_branch(tree, parent)?.write(key, node)?;
            Ok(String::new())
        }
        Cmd::Keys { branch } => {
            let branch = open_branch(tree, branch.as_deref().unwrap_or(""), defaults)?;
            Ok(branch.keys()?.join("\n"))
        }
        Cmd::Dump { branch } => {
            let branch = open_branch(tree, branch.as_deref().unwrap_or(""), defaults)?;
            branch.export_text()
        }
        Cmd::Import { branch, file } => {
            let text = std::fs::read_to_string(file).map_err(|e| TreeError::FileAccess {
                path: file.clone(),
                source: e,
            })?;
            create_branch(tree, branch)?.import_text(&text)?;
            Ok(String::new())
        }
        Cmd::Rm { path } => {
            let (parent, key) = split_path(path)?;
            tree.resolve(parent, Vec::new())?.remove(key)?;
            Ok(String::new())
        }
        Cmd::Mv { branch, new_name } => {
            let renamed = tree.resolve(branch, Vec::new())?.rename(new_name)?;
            Ok(format!("{} -> {}", branch, renamed.full_name()))
        }
    }
}


/// `a.b.c` -> (`a.b`, `c`); `c` -> (``, `c`).
fn split_path(path: &str) -> Result<(&str, &str)> {
    let path = path.trim();
    let (parent, key) = match path.rsplit_once('.') {
        Some((parent, key)) => (parent, key),
        None => ("", path),
    };
    if key.is_empty() {
        return Err(TreeError::InvalidPath(format!("missing key in '{}'", path)));
    }
    Ok((parent, key))
}


fn open_branch<'t>(tree: &'t MemoryTree, dotted: &str, defaults: &[String]) -> Result<Branch<'t>> {
    let chain = defaults
        .iter()
        .map(|d| tree.resolve(d, Vec::new()))
        .collect::<Result<Vec<_>>>()?;
    tree.resolve(dotted, chain)
}


/// Walk `dotted` from the root, creating missing branches.
fn create_branch<'t>(tree: &'t MemoryTree, dotted: &str) -> Result<Branch<'t>> {
    let mut branch = tree.root();
    for segment in memtree_core::BranchPath::parse(dotted)?.segments() {
        branch = branch.new_branch(segment)?;
    }
    Ok(branch)
}


fn render_merged(tree: &MemoryTree, branch: &Branch<'_>) -> Result<String> {
    tree.format().render(&branch.merged_view()?)
}
