use clap::{Args, CommandFactory, Parser, Subcommand};
use git_partial::parse::parse_selection_refs;
use git_partial::render::{DEFAULT_SPLIT_WIDTH, render_json, render_split, render_unified};
use git_partial::{
    ApplyOutcome, ApplyTarget, CompareMode, ContextLines, DiffSession, DiffSettings, GitCli,
    PartialError, WhitespaceMode,
};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "git-partial", version)]
#[command(about = "Stage, unstage or discard single hunks and lines of a file")]
struct Cli {
    /// Run as if git was started in this directory
    #[arg(short = 'C', global = true, default_value = ".")]
    repo: PathBuf,

    #[command(flatten)]
    diff: DiffArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DiffArgs {
    /// Ignore whitespace-only changes
    #[arg(short = 'w', long, global = true)]
    ignore_whitespace: bool,

    /// Context lines around each change (1, 3, 6, 12, 25, 50 or 100)
    #[arg(short = 'U', long = "context", global = true, default_value_t = ContextLines::default())]
    context: ContextLines,

    /// What commit changes are compared against
    #[arg(long, value_enum, global = true, default_value_t = CompareMode::default())]
    compare: CompareMode,
}

impl DiffArgs {
    fn settings(&self) -> DiffSettings {
        DiffSettings {
            whitespace: if self.ignore_whitespace {
                WhitespaceMode::Ignore
            } else {
                WhitespaceMode::Show
            },
            context_lines: self.context,
            compare: self.compare,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show a file's diff with `hunk:line` keys
    Show {
        path: String,
        /// Show changes in the index instead of the working tree
        #[arg(long)]
        staged: bool,
        /// Old and new side by side
        #[arg(long)]
        split: bool,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
        /// Text column width of each side in split view
        #[arg(long, default_value_t = DEFAULT_SPLIT_WIDTH)]
        width: usize,
    },
    /// Add working-tree changes to the index
    Stage(ApplyArgs),
    /// Take staged changes back out of the index
    Unstage(ApplyArgs),
    /// Throw away working-tree changes
    Discard(ApplyArgs),
    /// Print shell completions
    Completions { shell: clap_complete::Shell },
    /// Print the man page
    Man,
}

#[derive(Args)]
struct ApplyArgs {
    path: String,
    /// Apply one whole hunk by index
    #[arg(long, conflicts_with = "lines", required_unless_present = "lines")]
    hunk: Option<usize>,
    /// Apply single lines (e.g. "0:3,0:5..7,1:2")
    #[arg(long)]
    lines: Option<String>,
    /// Print the patch instead of applying it
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("GIT_PARTIAL_LOG", "warn"))
        .init();

    let cli = Cli::parse();
    let settings = cli.diff.settings();

    match cli.command {
        Commands::Show {
            path,
            staged,
            split,
            json,
            width,
        } => {
            let session = DiffSession::open(GitCli::new(&cli.repo), path, staged, settings)?;
            let output = match (json, split) {
                (true, _) => render_json(session.diff(), split)? + "\n",
                (false, true) => render_split(session.diff(), width),
                (false, false) => render_unified(session.diff(), None),
            };
            print!("{output}");
        }
        Commands::Stage(args) => apply(&cli.repo, settings, args, ApplyTarget::Stage)?,
        Commands::Unstage(args) => apply(&cli.repo, settings, args, ApplyTarget::Unstage)?,
        Commands::Discard(args) => apply(&cli.repo, settings, args, ApplyTarget::Discard)?,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "git-partial", &mut io::stdout());
        }
        Commands::Man => {
            clap_mangen::Man::new(Cli::command()).render(&mut io::stdout())?;
        }
    }

    Ok(())
}

fn apply(
    repo: &Path,
    settings: DiffSettings,
    args: ApplyArgs,
    target: ApplyTarget,
) -> Result<(), PartialError> {
    let staged = target == ApplyTarget::Unstage;
    let mut session = DiffSession::open(GitCli::new(repo), &args.path, staged, settings)?;

    if let Some(hunk) = args.hunk {
        if args.dry_run {
            print!("{}", session.hunk_patch(hunk, target)?);
            return Ok(());
        }
        session.apply_hunk_and_refresh(hunk, target)?;
        eprintln!("{target}: applied hunk {hunk} of {}", args.path);
        return Ok(());
    }

    let refs = parse_selection_refs(args.lines.as_deref().unwrap_or_default())?;
    for selection_ref in &refs {
        selection_ref.select_into(session.selection_mut());
    }
    log::debug!(
        "{} of {} references selected lines",
        session.selection().selection_count(),
        refs.len()
    );

    if args.dry_run {
        match session.selection_patch(target)? {
            Some(patch) => print!("{patch}"),
            None => {
                return Err(PartialError::NothingSelected { path: args.path });
            }
        }
        return Ok(());
    }

    match session.apply_selection(target)? {
        ApplyOutcome::Applied => eprintln!("{target}: applied selected lines of {}", args.path),
        ApplyOutcome::Skipped => return Err(PartialError::NothingSelected { path: args.path }),
    }
    Ok(())
}
