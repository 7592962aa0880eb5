use amdl2maml::convert::{self, CancellationToken, ConvertEvent, Paths};
use amdl2maml::types::Verbosity;
use amdl2maml::{config, output};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;

#[derive(Parser)]
#[command(name = "amdl2maml")]
#[command(about = "Converts AMDL (Markdown) topics into MAML help topics")]
#[command(long_about = "\
Converts AMDL (Markdown) topics into MAML help topics

Every .md, .markdown and .amdl file under the source folder becomes one .aml
topic at the same relative path under the destination folder. Names starting
with '.' are skipped.

Topic variants follow the file name:

  source/
  ├── amdl2maml.toml               # Optional settings (see gen-config)
  ├── Welcome.md                   # General (conceptual) topic
  ├── Terms-Glossary.md            # Glossary: last word 'Glossary'
  ├── Stub.md                      # Empty file: placeholder, no output
  └── Widgets/
      ├── Widgets.md               # Orientation: same name as its folder
      └── HowTo-Build.md           # HowTo: first word 'HowTo'

Topic ids are reused from the content layout given with --layout. A layout
is written to the destination after every run; pass it back in to keep ids
stable.

Run 'amdl2maml gen-config' to generate a documented amdl2maml.toml.")]
#[command(version)]
struct Cli {
    /// How much progress to print
    #[arg(long, value_enum, default_value_t = Verbosity::Normal, global = true)]
    verbosity: Verbosity,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a source tree into MAML topics
    Convert {
        /// Source directory
        #[arg(long)]
        source: PathBuf,
        /// Destination directory, created when missing
        #[arg(long)]
        destination: PathBuf,
        /// Content layout whose topic ids are reused
        #[arg(long)]
        layout: Option<PathBuf>,
    },
    /// Resolve titles, ids and links without writing anything
    Check {
        /// Source directory
        #[arg(long)]
        source: PathBuf,
        /// Content layout whose topic ids are reused
        #[arg(long)]
        layout: Option<PathBuf>,
    },
    /// Print a stock amdl2maml.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Convert {
            source,
            destination,
            layout,
        } => {
            require_paths(&source, layout.as_deref())?;
            let config = config::load_config(&source)?;
            init_thread_pool(&config.processing);

            let (tx, printer) = spawn_printer(cli.verbosity);
            let paths = Paths {
                source,
                destination,
                layout,
            };
            let result = convert::convert(&paths, &config, &CancellationToken::new(), Some(tx));
            printer.join().unwrap();
            let report = result?;
            if !report.failed.is_empty() {
                return Err(format!("{} topics failed", report.failed.len()).into());
            }
        }
        Command::Check { source, layout } => {
            require_paths(&source, layout.as_deref())?;
            let config = config::load_config(&source)?;
            init_thread_pool(&config.processing);

            let (tx, printer) = spawn_printer(cli.verbosity);
            let result = convert::check(
                &source,
                layout.as_deref(),
                &config,
                &CancellationToken::new(),
                Some(tx),
            );
            printer.join().unwrap();
            let report = result?;
            output::print_check_report(&report);
            if !report.unresolved.is_empty() || !report.failed.is_empty() {
                return Err("check found problems".into());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Fail early, before any step runs, when an input path is missing.
fn require_paths(source: &Path, layout: Option<&Path>) -> Result<(), String> {
    if !source.is_dir() {
        return Err(format!("Directory not found: {}", source.display()));
    }
    if let Some(layout) = layout
        && !layout.is_file()
    {
        return Err(format!("File not found: {}", layout.display()));
    }
    Ok(())
}

/// Single consumer of progress events; the only writer to stdout during a run.
fn spawn_printer(verbosity: Verbosity) -> (Sender<ConvertEvent>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_event(&event, verbosity);
        }
    });
    (tx, printer)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
