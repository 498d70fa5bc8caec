mod selector;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use rootsweep::size::{format_megabytes, format_size, size_of};
use rootsweep::{
    ChannelListener, Config, Entry, Error, ExclusionPolicy, Outcome, Scan, SelectionStore,
    Session, Sorter, SortingPolicy, SortingPreference, Worker, deleter, logging,
};
use selector::Selector;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "rootsweep")]
#[command(about = "Find what takes space directly under a folder and delete it")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output, repeat for more
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also hide root entries starting with this prefix
    #[arg(long, value_name = "PREFIX", global = true)]
    exclude: Vec<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List the entries directly under ROOT with their sizes
    Scan {
        root: Option<PathBuf>,

        /// name or size (defaults to the saved preference)
        #[arg(long)]
        sort: Option<SortingPolicy>,
    },

    /// Mark entries and show their combined size
    Select {
        root: PathBuf,
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Current size of the given entries
    Size {
        root: PathBuf,
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Permanently delete the given entries
    Delete {
        root: PathBuf,
        #[arg(required = true)]
        names: Vec<String>,

        /// Show what would be deleted without deleting
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show or cycle the saved sorting
    Sort {
        #[command(subcommand)]
        action: SortAction,
    },

    /// Browse, mark and delete entries in the terminal
    Interactive { root: Option<PathBuf> },
}

#[derive(Subcommand)]
enum SortAction {
    Show,
    Next,
}

fn scan_with_spinner(root: &Path, exclusions: &ExclusionPolicy) -> rootsweep::Result<Scan> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Scanning {}...", root.display()));
    spinner.enable_steady_tick(Duration::from_millis(80));

    let mut worker = Worker::spawn();
    worker.submit_scan(root, exclusions.clone());
    let outcome = worker.recv();
    spinner.finish_and_clear();

    match outcome {
        Some(Outcome::Scanned { result, .. }) => result,
        _ => Err(Error::Cancelled),
    }
}

fn report_scan_notes(scan: &Scan) {
    if !scan.root_found {
        println!("{} {}", "Root does not exist:".yellow(), scan.root.display());
    }
    for name in &scan.unreadable {
        eprintln!("{} could not read {}, shown as empty", "warning:".yellow().bold(), name);
    }
}

fn print_entries(entries: &[Entry]) {
    let width = entries
        .iter()
        .map(|e| e.name.chars().count())
        .max()
        .unwrap_or(20);

    for entry in entries {
        let line = format!(
            "  {:<width$}  {:>10}  {}",
            entry.name,
            entry.size_human(),
            entry.kind().label(),
            width = width
        );
        if entry.is_hidden {
            println!("{}", line.dimmed());
        } else {
            println!("{}", line);
        }
    }
}

fn cmd_scan(
    config: &Config,
    exclusions: &ExclusionPolicy,
    root: Option<PathBuf>,
    sort: Option<SortingPolicy>,
) -> anyhow::Result<ExitCode> {
    let root = config.resolve_root(root);
    let policy = sort.unwrap_or_else(|| SortingPreference::load(config.preference_store()).current());

    let scan = scan_with_spinner(&root, exclusions)?;
    report_scan_notes(&scan);

    if scan.entries.is_empty() {
        println!("{}", "Nothing found.".yellow());
        return Ok(ExitCode::SUCCESS);
    }

    let sorted = Sorter::new()?.sort(&scan.entries, policy);
    println!("{} {} (by {})\n", "Scanned".cyan().bold(), root.display(), policy);
    print_entries(&sorted);
    println!(
        "\n{} entries, {}",
        scan.entries.len().to_string().green().bold(),
        format_size(scan.total_size()).green().bold()
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_select(exclusions: &ExclusionPolicy, root: PathBuf, names: Vec<String>) -> anyhow::Result<ExitCode> {
    let scan = scan_with_spinner(&root, exclusions)?;
    report_scan_notes(&scan);

    let mut store = SelectionStore::from_scan(scan);
    let mut unknown = 0;
    for name in &names {
        if let Err(err) = store.mark(name) {
            eprintln!("{} {}", "warning:".yellow().bold(), err);
            unknown += 1;
        }
    }

    let marked: Vec<Entry> = store
        .entries()
        .into_iter()
        .filter(|e| e.marked_for_deletion)
        .collect();
    print_entries(&marked);
    println!(
        "\n{} {} marked, {}",
        "Selected:".bold(),
        marked.len(),
        format_megabytes(store.aggregate_size()).green().bold()
    );

    Ok(if unknown == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_size(root: PathBuf, names: Vec<String>) -> ExitCode {
    let mut total = 0u64;
    for name in &names {
        let size = size_of(&root.join(name));
        total = total.saturating_add(size);
        println!("  {:<30}  {:>10}", name, format_size(size));
    }
    println!("\n{} {}", "Total:".bold(), format_megabytes(total).green().bold());
    ExitCode::SUCCESS
}

fn cmd_delete(
    exclusions: &ExclusionPolicy,
    root: PathBuf,
    names: Vec<String>,
    dry_run: bool,
    yes: bool,
) -> anyhow::Result<ExitCode> {
    let (allowed, refused): (Vec<String>, Vec<String>) =
        names.into_iter().partition(|name| exclusions.allows(name));
    for name in &refused {
        eprintln!("{} {} is protected and will not be deleted", "warning:".yellow().bold(), name);
    }

    let targets: Vec<(String, u64)> = allowed
        .iter()
        .map(|name| (name.clone(), size_of(&root.join(name))))
        .collect();
    let total: u64 = targets.iter().map(|(_, size)| size).sum();

    if dry_run {
        println!("{}", "Dry run - nothing will be deleted:\n".yellow());
        for (name, size) in &targets {
            println!("  {:<30}  {:>10}", name, format_size(*size));
        }
        println!("\n{} {}", "Total:".bold(), format_size(total).green().bold());
        return Ok(exit_for(refused.is_empty()));
    }

    if allowed.is_empty() {
        println!("\n{}", "Nothing selected.".yellow());
        return Ok(exit_for(refused.is_empty()));
    }

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Permanently delete {} entries ({})?",
                allowed.len(),
                format_size(total)
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("\n{}", "Cancelled.".yellow());
            return Ok(ExitCode::SUCCESS);
        }
    }

    println!("\n{} {} entries...", "Deleting".red().bold(), allowed.len());
    let report = deleter::delete(&root, &allowed);

    for name in &report.missing {
        println!("  {} {}", "already gone:".dimmed(), name);
    }
    if !report.failed.is_empty() {
        println!("\n{}", "Failed to delete:".red());
        for (name, err) in &report.failed {
            println!("  {} - {}", name, err);
        }
    }
    if !report.deleted.is_empty() {
        println!(
            "\n{} Cleaned {} in {} entries",
            "Done!".green().bold(),
            format_size(report.freed_bytes).green().bold(),
            report.deleted.len().to_string().green()
        );
    }

    Ok(exit_for(report.failed.is_empty() && refused.is_empty()))
}

fn exit_for(ok: bool) -> ExitCode {
    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn cmd_sort(config: &Config, action: SortAction) -> anyhow::Result<ExitCode> {
    let mut preference = SortingPreference::load(config.preference_store());
    let policy = match action {
        SortAction::Show => preference.current(),
        SortAction::Next => preference.advance().context("saving sorting preference")?,
    };
    println!("{}", policy);
    Ok(ExitCode::SUCCESS)
}

fn cmd_interactive(
    config: &Config,
    exclusions: &ExclusionPolicy,
    root: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let root = config.resolve_root(root);
    if !console::user_attended_stderr() {
        bail!("interactive mode needs a terminal");
    }

    let (tx, rx) = mpsc::channel();
    let session = Session::new(
        &root,
        exclusions.clone(),
        SortingPreference::load(config.preference_store()),
        ChannelListener(tx),
    )?;

    // The first scan runs on the selector's worker. A failed scan still opens
    // the selector with the reason in the status line.
    Selector::new(session, rx, Worker::spawn()).run()?;
    Ok(ExitCode::SUCCESS)
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    logging::init(config.logging.level.raised(cli.verbose));

    let exclusions = config.exclusion_policy(&cli.exclude);

    match cli.command.unwrap_or(Command::Interactive { root: None }) {
        Command::Scan { root, sort } => cmd_scan(&config, &exclusions, root, sort),
        Command::Select { root, names } => cmd_select(&exclusions, root, names),
        Command::Size { root, names } => Ok(cmd_size(root, names)),
        Command::Delete {
            root,
            names,
            dry_run,
            yes,
        } => cmd_delete(&exclusions, root, names, dry_run, yes),
        Command::Sort { action } => cmd_sort(&config, action),
        Command::Interactive { root } => cmd_interactive(&config, &exclusions, root),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn cli(dir: &TempDir, args: &[&str]) -> Cli {
        let config = dir.path().join("no-config.toml");
        let mut argv = vec!["rootsweep", "--config", config.to_str().unwrap()];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn scanning_a_file_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.txt");
        File::create(&file).unwrap().write_all(b"x").unwrap();

        let result = run(cli(&dir, &["scan", file.to_str().unwrap()]));

        let err = result.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::ListingFailed { .. })));
    }

    #[test]
    fn scanning_a_missing_root_succeeds() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");

        let code = run(cli(&dir, &["scan", missing.to_str().unwrap()])).unwrap();

        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn delete_exit_code_follows_failures() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root");
        fs::create_dir(&root).unwrap();
        File::create(root.join("keep")).unwrap().write_all(b"x").unwrap();
        File::create(root.join("old.log")).unwrap().write_all(b"x").unwrap();
        let root = root.to_str().unwrap();
        let too_long = "a".repeat(300);

        let code = run(cli(&dir, &["delete", "-y", root, "old.log"])).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);

        let code = run(cli(&dir, &["delete", "-y", root, &too_long, "keep"])).unwrap();
        assert_eq!(code, ExitCode::FAILURE);
        assert!(!dir.path().join("root").join("keep").exists());

        let code = run(cli(&dir, &["delete", "-y", root, "Android"])).unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }
}
