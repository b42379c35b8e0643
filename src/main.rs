use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod core;
mod kscreen;
mod layout;
mod monitor;
mod store;

use crate::core::LayoutManager;
use crate::kscreen::KscreenDoctor;
use crate::layout::Side;
use crate::store::LayoutStore;

/// Save and restore multi-monitor layouts through kscreen-doctor.
///
/// Without flags the saved layout is restored; monitors given as arguments
/// are disabled instead.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Opts {
    /// Save the current layout
    #[arg(long, short, conflicts_with_all = ["list", "left", "right", "left_right"])]
    save: bool,

    /// List connected monitors
    #[arg(long, short, conflicts_with_all = ["left", "right", "left_right"])]
    list: bool,

    /// Only enable the leftmost monitor (`-LR` for left and right)
    #[arg(long, short = 'L')]
    left: bool,

    /// Only enable the rightmost monitor
    #[arg(long, short = 'R')]
    right: bool,

    /// Only enable the leftmost and rightmost monitors, side by side
    #[arg(long, conflicts_with_all = ["left", "right"])]
    left_right: bool,

    /// Settings file to use instead of the default location
    #[arg(long = "config", short)]
    config_path: Option<PathBuf>,

    /// Layout file to use instead of the configured one
    #[arg(long = "store")]
    store_path: Option<PathBuf>,

    /// Print the kscreen-doctor command instead of running it
    #[arg(long, short = 'n')]
    dry_run: bool,

    /// Log more, repeat for even more (-vv, -vvv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Monitors to disable
    #[arg(conflicts_with_all = ["save", "list", "left", "right", "left_right"])]
    disable: Vec<String>,
}

#[derive(Debug, PartialEq)]
enum Mode {
    Save,
    List,
    Single(Side),
    LeftRight,
    Saved,
}

impl Opts {
    fn mode(&self) -> Mode {
        match (self.left, self.right) {
            _ if self.save => Mode::Save,
            _ if self.list => Mode::List,
            _ if self.left_right => Mode::LeftRight,
            (true, true) => Mode::LeftRight,
            (true, false) => Mode::Single(Side::Left),
            (false, true) => Mode::Single(Side::Right),
            (false, false) => Mode::Saved,
        }
    }

    fn log_level(&self, configured: Level) -> Level {
        match self.verbose {
            0 => configured,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

fn run(options: Opts) -> anyhow::Result<()> {
    let settings = config::load(options.config_path.as_deref())?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(options.log_level(settings.level()))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    debug!("Loaded settings: {settings:?}");

    let store_path = match options.store_path.as_deref() {
        Some(path) => PathBuf::from(config::expand_filename(&path.to_string_lossy())),
        None => settings.store_path(),
    };

    let tool = KscreenDoctor::new(&settings.command, options.dry_run);
    let mut manager = LayoutManager::new(tool, LayoutStore::new(store_path));

    match options.mode() {
        Mode::List => {
            for name in manager.list()? {
                println!("{name}");
            }

            Ok(())
        }
        Mode::Save => manager.save(),
        Mode::Single(side) => manager.apply_single(side),
        Mode::LeftRight => manager.apply_left_right(),
        Mode::Saved => manager.apply_saved(&options.disable),
    }
}

fn main() -> ExitCode {
    let options = Opts::parse();

    match run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
