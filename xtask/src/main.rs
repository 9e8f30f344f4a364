use anyhow::{
    Context,
    Result,
    anyhow,
    ensure,
};
use clap::{
    Parser,
    Subcommand,
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    process::Command,
};

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Gomboc casino helper tasks (clippy, tests, formatting)",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run clippy for the entire workspace with warnings-as-errors
    Clippy,
    /// Run unit and integration tests
    Test {
        /// Only run the actix-backed HTTP transport tests
        #[arg(long)]
        http_only: bool,
    },
    /// Format the workspace
    Fmt {
        /// Fail instead of rewriting files
        #[arg(long)]
        check: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = repo_root()?;

    match cli.command {
        Commands::Clippy => run_clippy(&root)?,
        Commands::Test { http_only } => run_tests(&root, http_only)?,
        Commands::Fmt { check } => run_fmt(&root, check)?,
    }

    Ok(())
}

fn repo_root() -> Result<PathBuf> {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("xtask has no parent directory"))
}

fn run_clippy(root: &Path) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("clippy")
        .arg("--workspace")
        .arg("--all-targets")
        .arg("--")
        .arg("-D")
        .arg("warnings")
        .current_dir(root);
    run_command(cmd, "cargo clippy")
}

fn run_tests(root: &Path, http_only: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("test").arg("-p").arg("gomboc-casino");
    let label = if http_only {
        cmd.arg("--test").arg("http_transport");
        "cargo test --test http_transport"
    } else {
        "cargo test -p gomboc-casino"
    };
    cmd.current_dir(root);
    run_command(cmd, label)
}

fn run_fmt(root: &Path, check: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("fmt").arg("--all");
    if check {
        cmd.arg("--").arg("--check");
    }
    cmd.current_dir(root);
    run_command(cmd, "cargo fmt")
}

fn run_command(mut cmd: Command, label: &str) -> Result<()> {
    println!("Running: {}", label);
    let status = cmd
        .status()
        .with_context(|| format!("failed to run {label}"))?;
    ensure!(status.success(), "{label} failed with status {status}");
    Ok(())
}
