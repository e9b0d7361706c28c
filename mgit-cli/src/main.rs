//! MGit command line interface

mod output;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mgit_core::repository::ContentSource;
use mgit_core::{Change, CommitOptions, InitOptions, Repository};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter
const LOG_ENV: &str = "MGIT_LOG";

#[derive(Parser, Debug)]
#[command(name = "mgit")]
#[command(author = "MGit Contributors")]
#[command(version)]
#[command(about = "A content-addressable version control system")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty repository
    Init {
        /// Directory to initialize (default: current directory)
        path: Option<PathBuf>,
        /// Create a repository without a working tree
        #[arg(long)]
        bare: bool,
        /// Re-initialize an existing repository
        #[arg(long)]
        force: bool,
    },

    /// Stage file contents for the next commit
    Add {
        /// Stage every change in the working tree, deletions included
        #[arg(short = 'A', long, conflicts_with = "paths")]
        all: bool,
        #[arg(required_unless_present = "all")]
        paths: Vec<PathBuf>,
    },

    /// Remove paths from the index
    Rm {
        /// Only remove from the index (the working tree is never touched)
        #[arg(long, required = true)]
        cached: bool,
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Record the staged snapshot
    Commit {
        #[arg(short, long)]
        message: String,
        /// Record a commit even if nothing changed
        #[arg(long)]
        allow_empty: bool,
    },

    /// Show staged, unstaged and untracked changes
    Status {
        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// Show commit history
    Log {
        /// Starting revision (default: HEAD)
        rev: Option<String>,
        /// Limit the number of commits
        #[arg(short = 'n', long = "max-count")]
        max_count: Option<usize>,
        /// One line per commit
        #[arg(long)]
        oneline: bool,
    },

    /// Show changes
    Diff {
        /// Compare HEAD with the index
        #[arg(long)]
        cached: bool,
        /// Only list changed paths
        #[arg(long)]
        name_only: bool,
        /// Revisions to compare: none (index vs working tree), one (rev vs HEAD) or two
        #[arg(num_args = 0..=2, conflicts_with = "cached")]
        revs: Vec<String>,
    },

    /// List, create, annotate or delete tags
    Tag {
        /// Tag name; lists tags when omitted
        name: Option<String>,
        /// Revision to tag (default: HEAD)
        rev: Option<String>,
        /// Create an annotated tag
        #[arg(short = 'a', long)]
        annotate: bool,
        /// Tag message (implies -a)
        #[arg(short, long)]
        message: Option<String>,
        /// List tags
        #[arg(short, long, conflicts_with_all = ["name", "delete"])]
        list: bool,
        /// Delete the named tag
        #[arg(short, long, value_name = "TAG", conflicts_with_all = ["name", "rev", "annotate", "message"])]
        delete: Option<String>,
    },

    /// Get and set configuration
    Config {
        key: Option<String>,
        value: Option<String>,
        /// List all effective settings
        #[arg(long, conflicts_with_all = ["key", "unset"])]
        list: bool,
        /// Remove the key from the repository config
        #[arg(long, requires = "key", conflicts_with = "value")]
        unset: bool,
    },

    /// Print an object's content
    CatFile {
        /// Revision, object digest or `<rev>:<path>`
        object: String,
        /// Print the object kind instead of its content
        #[arg(short = 't')]
        kind: bool,
    },

    /// Verify object and ref integrity
    Fsck,
}

fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("mgit=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("mgit=warn"))
    };

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(env_filter)
        .try_init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// 1 for user errors, 2 for integrity/system errors and anything unclassified
fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<mgit_core::Error>())
        .map(|e| e.exit_code() as u8)
        .unwrap_or(2)
}

fn discover() -> Result<Repository> {
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    Ok(Repository::discover(&cwd)?)
}

fn run(command: Commands) -> Result<ExitCode> {
    let mut stdout = std::io::stdout().lock();

    match command {
        Commands::Init { path, bare, force } => {
            let path = match path {
                Some(p) => p,
                None => std::env::current_dir().context("cannot determine current directory")?,
            };
            let repo = Repository::init(&path, InitOptions { bare, force })?;
            let verb = if force { "Reinitialized" } else { "Initialized empty" };
            writeln!(stdout, "{} MGit repository in {}", verb, repo.meta_dir().display())?;
        }

        Commands::Add { all, paths } => {
            let repo = discover()?;
            let touched = if all { repo.add_all()? } else { repo.add(&paths)? };
            tracing::debug!(count = touched.len(), "add finished");
        }

        Commands::Rm { cached: _, paths } => {
            let repo = discover()?;
            for path in repo.unstage(&paths)? {
                writeln!(stdout, "rm '{}'", path)?;
            }
        }

        Commands::Commit { message, allow_empty } => {
            let repo = discover()?;
            let id = repo.commit(&message, CommitOptions { allow_empty })?;
            let branch = repo
                .refs()
                .current_branch()?
                .unwrap_or_else(|| "detached HEAD".to_string());
            let summary = message.lines().next().unwrap_or("");
            writeln!(stdout, "[{} {}] {}", branch, id.short(), summary)?;
        }

        Commands::Status { json } => {
            let repo = discover()?;
            let report = repo.status()?;
            if json {
                serde_json::to_writer_pretty(&mut stdout, &report)?;
                writeln!(stdout)?;
            } else {
                write!(stdout, "{}", output::render_status(&report))?;
            }
        }

        Commands::Log { rev, max_count, oneline } => {
            let repo = discover()?;
            let history = repo.log(rev.as_deref())?;
            for (i, entry) in history.take(max_count.unwrap_or(usize::MAX)).enumerate() {
                let (id, commit) = entry?;
                if i > 0 && !oneline {
                    writeln!(stdout)?;
                }
                write!(stdout, "{}", output::render_log_entry(&id, &commit, oneline))?;
            }
        }

        Commands::Diff { cached, name_only, revs } => {
            let repo = discover()?;
            let (changes, source) = match (cached, revs.as_slice()) {
                (true, _) => (repo.diff_cached()?, ContentSource::Store),
                (false, []) => (repo.diff_worktree()?, ContentSource::WorkTree),
                (false, [rev]) => (repo.diff_revisions(rev, "HEAD")?, ContentSource::Store),
                (false, [old, new]) => (repo.diff_revisions(old, new)?, ContentSource::Store),
                (false, _) => bail!("diff takes at most two revisions"),
            };
            print_changes(&repo, &changes, source, name_only, &mut stdout)?;
        }

        Commands::Tag { name, rev, annotate, message, list: _, delete } => {
            let repo = discover()?;
            match (delete, name) {
                (Some(tag), _) => {
                    let id = repo.delete_tag(&tag)?;
                    writeln!(stdout, "Deleted tag '{}' (was {})", tag, id.short())?;
                }
                (None, None) => {
                    for (tag, _) in repo.tags()? {
                        writeln!(stdout, "{}", tag)?;
                    }
                }
                (None, Some(name)) => {
                    // -m alone already makes the tag annotated
                    let message = match message {
                        Some(message) => Some(message),
                        None if annotate => Some(format!("Tag {}", name)),
                        None => None,
                    };
                    repo.tag(&name, rev.as_deref(), message.as_deref())?;
                }
            }
        }

        Commands::Config { key, value, list, unset } => {
            let mut repo = discover()?;
            match (key, value) {
                _ if list => {
                    for (k, v) in repo.config().list() {
                        writeln!(stdout, "{}={}", k, v)?;
                    }
                }
                (Some(key), _) if unset => repo.config_mut().unset(&key)?,
                (Some(key), Some(value)) => repo.config_mut().set(&key, &value)?,
                (Some(key), None) => match repo.config().get(&key)? {
                    Some(value) => writeln!(stdout, "{}", value)?,
                    None => return Err(mgit_core::Error::ConfigKeyNotFound(key).into()),
                },
                (None, _) => bail!("config requires a key or --list"),
            }
        }

        Commands::CatFile { object, kind } => {
            let repo = discover()?;
            let (_, object) = repo.read_object(&object)?;
            if kind {
                writeln!(stdout, "{}", object.kind())?;
            } else {
                stdout.write_all(&output::render_object(&object))?;
            }
        }

        Commands::Fsck => {
            let repo = discover()?;
            let report = repo.fsck()?;
            for (id, err) in &report.corrupt {
                writeln!(stdout, "corrupt object {}: {}", id, err)?;
            }
            for (name, err) in &report.broken_refs {
                writeln!(stdout, "broken ref {}: {}", name, err)?;
            }
            writeln!(stdout, "checked {} objects", report.checked)?;
            if !report.is_ok() {
                return Ok(ExitCode::from(2));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_changes(
    repo: &Repository,
    changes: &[Change],
    source: ContentSource,
    name_only: bool,
    out: &mut impl Write,
) -> Result<()> {
    for change in changes {
        if name_only {
            writeln!(out, "{}", output::render_change_name(change))?;
            continue;
        }
        let patch = repo.patch(change, source)?;
        write!(out, "{}", output::render_patch(change, &patch))?;
    }
    Ok(())
}
