pub mod config;
pub mod generator;
pub mod options;
pub mod scanner;
pub mod stylesheet;

pub use generator::{GridPlugin, Host, SpacingScale, UtilityMap, Variant};
pub use options::{GridOptions, GridSettings, Profile, RawEntry, RawOption, Steps};
pub use stylesheet::Stylesheet;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildOptions {
    pub content: Vec<String>,
    pub out: Option<String>,
    pub minify: bool,
    pub config: Option<String>,
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Build(BuildOptions),
    List {
        config: Option<String>,
    },
    Watch {
        build: BuildOptions,
        poll: bool,
        poll_interval_ms: u64,
    },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliError {
    pub message: String,
}

pub fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Build(options) => run_build(&options),
        Command::List { config } => run_list(config.as_deref()),
        Command::Watch {
            build,
            poll,
            poll_interval_ms,
        } => run_watch(&build, poll, poll_interval_ms),
        Command::Help => {
            print_help();
            Ok(())
        }
    }
}

pub fn run_from_env() -> Result<(), CliError> {
    let command = parse_args(env::args().skip(1))?;
    run(command)
}

pub fn parse_args<I>(args: I) -> Result<Command, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut iter = args.into_iter();
    let Some(cmd) = iter.next() else {
        return Ok(Command::Help);
    };

    match cmd.as_str() {
        "build" => parse_build_args(iter.collect(), "build", false).map(|(build, _, _)| {
            Command::Build(build)
        }),
        "watch" => parse_build_args(iter.collect(), "watch", true).map(
            |(build, poll, poll_interval_ms)| Command::Watch {
                build,
                poll,
                poll_interval_ms,
            },
        ),
        "list" => parse_list_args(iter.collect()),
        "-h" | "--help" | "help" => Ok(Command::Help),
        _ => Err(CliError {
            message: format!("unknown command: {}", cmd),
        }),
    }
}

fn flag_value(args: &[String], idx: usize, command: &str, flag: &str) -> Result<String, CliError> {
    args.get(idx).cloned().ok_or_else(|| CliError {
        message: format!("{} requires a value for {}", command, flag),
    })
}

fn parse_build_args(
    args: Vec<String>,
    command: &str,
    allow_poll: bool,
) -> Result<(BuildOptions, bool, u64), CliError> {
    let mut build = BuildOptions::default();
    let mut poll = false;
    let mut poll_interval_ms = 500;
    let mut idx = 0;

    while idx < args.len() {
        match args[idx].as_str() {
            "--out" | "--output" | "-o" => {
                idx += 1;
                build.out = Some(flag_value(&args, idx, command, "--output")?);
            }
            "--config" | "-c" => {
                idx += 1;
                build.config = Some(flag_value(&args, idx, command, "--config")?);
            }
            "--ignore" | "-I" => {
                idx += 1;
                build.ignore.push(flag_value(&args, idx, command, "--ignore")?);
            }
            "--minify" => {
                build.minify = true;
            }
            "--poll" | "--poll-interval" if !allow_poll => {
                return Err(CliError {
                    message: format!("{} is only supported with watch", args[idx]),
                });
            }
            "--poll" => {
                poll = true;
            }
            "--poll-interval" => {
                idx += 1;
                let value = flag_value(&args, idx, command, "--poll-interval")?;
                poll = true;
                poll_interval_ms = parse_u64_arg(&value, "--poll-interval")?;
            }
            value if value.starts_with('-') => {
                return Err(CliError {
                    message: format!("unknown {} option: {}", command, value),
                });
            }
            value => {
                build.content.push(value.to_string());
            }
        }
        idx += 1;
    }

    Ok((build, poll, poll_interval_ms))
}

fn parse_list_args(args: Vec<String>) -> Result<Command, CliError> {
    let mut config = None;
    let mut idx = 0;

    while idx < args.len() {
        match args[idx].as_str() {
            "--config" | "-c" => {
                idx += 1;
                config = Some(flag_value(&args, idx, "list", "--config")?);
            }
            value => {
                return Err(CliError {
                    message: format!("unexpected list argument: {}", value),
                });
            }
        }
        idx += 1;
    }

    Ok(Command::List { config })
}

fn parse_u64_arg(value: &str, flag: &str) -> Result<u64, CliError> {
    value.parse::<u64>().map_err(|_| CliError {
        message: format!("{} requires a positive integer, got '{}'", flag, value),
    })
}

fn print_help() {
    println!("ironframe-grid");
    println!();
    println!("USAGE:");
    println!(
        "  ironframe-grid build [--config <path>] [--output <path>] [--minify] [--ignore <glob>] [<glob...>]"
    );
    println!("  ironframe-grid list [--config <path>]");
    println!(
        "  ironframe-grid watch [--config <path>] [--output <path>] [--minify] [--ignore <glob>] [--poll] [--poll-interval <ms>] [<glob...>]"
    );
    println!();
    println!("Without globs every utility is emitted; with globs only the classes found in");
    println!("matching files are kept.");
    println!();
    println!("EXAMPLES:");
    println!("  ironframe-grid build -c grid.toml --output dist/grid.css");
    println!("  ironframe-grid build -c grid.toml --minify \"src/**/*.{{html,tsx}}\"");
    println!("  ironframe-grid list -c grid.toml");
    println!("  ironframe-grid watch --poll --poll-interval 250 -c grid.toml \"src/**/*.html\"");
}

fn build_header() -> String {
    "/*! ironframe-grid | MIT License */".to_string()
}

fn load_config(path: Option<&str>) -> Result<config::Config, CliError> {
    match path {
        Some(path) => config::load(Path::new(path)).map_err(|err| CliError {
            message: err.message,
        }),
        None => Ok(config::Config::default()),
    }
}

fn build_stylesheet(config: &config::Config) -> Result<Stylesheet, CliError> {
    let options = config::resolve_options(config).map_err(|err| CliError {
        message: err.message,
    })?;
    let mut sheet = Stylesheet::new(
        config::resolve_spacing(config),
        config::resolve_screens(config),
    );
    GridPlugin::new(&options).register(&mut sheet);
    Ok(sheet)
}

/// Renders the full stylesheet text for `options`, returning it together
/// with the number of scanned files when content globs were given.
pub fn render(options: &BuildOptions) -> Result<(String, Option<usize>), CliError> {
    let config = load_config(options.config.as_deref())?;
    let sheet = build_stylesheet(&config)?;

    let (utility_css, files_scanned) = if options.content.is_empty() {
        (sheet.emit(options.minify), None)
    } else {
        let mut ignore = options.ignore.clone();
        if let Some(out_path) = options.out.as_ref() {
            ignore.push(out_path.clone());
        }
        let scan = scanner::scan_globs_with_ignore(&options.content, &ignore).map_err(|err| {
            CliError {
                message: err.message,
            }
        })?;
        let used = stylesheet::UsedClasses::from_candidates(scan.classes, sheet.screens());
        (
            sheet.emit_used(options.minify, &used),
            Some(scan.files_scanned),
        )
    };

    let header = build_header();
    let css = if options.minify {
        format!("{}{}", header, utility_css)
    } else if utility_css.is_empty() {
        format!("{}\n", header)
    } else {
        format!("{}\n{}\n", header, utility_css)
    };
    log::debug!("rendered {} grid utilities", sheet.class_count());

    Ok((css, files_scanned))
}

fn run_build(options: &BuildOptions) -> Result<(), CliError> {
    let (css, files_scanned) = render(options)?;

    if let Some(out_path) = options.out.as_ref() {
        fs::write(out_path, css).map_err(|err| CliError {
            message: format!("failed to write output {}: {}", out_path, err),
        })?;
    } else {
        print!("{}", css);
    }

    match files_scanned {
        Some(files) => eprintln!("scanned {} files", files),
        None => eprintln!("emitted every grid utility"),
    }

    Ok(())
}

fn run_list(config_path: Option<&str>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let options = config::resolve_options(&config).map_err(|err| CliError {
        message: err.message,
    })?;
    let names = GridPlugin::new(&options).class_names(&config::resolve_spacing(&config));

    for name in &names {
        println!("{}", name);
    }
    eprintln!("{} classes", names.len());

    Ok(())
}

fn run_watch(build: &BuildOptions, poll: bool, poll_interval_ms: u64) -> Result<(), CliError> {
    run_build(build)?;

    let (tx, rx) = channel();
    let mut ignore = build.ignore.clone();
    if let Some(out_path) = build.out.as_ref() {
        ignore.push(out_path.clone());
    }
    let ignore_set = build_globset(&ignore).ok();
    let mut watcher: Box<dyn notify::Watcher> = if poll {
        Box::new(
            notify::PollWatcher::new(
                tx,
                notify::Config::default()
                    .with_poll_interval(Duration::from_millis(poll_interval_ms)),
            )
            .map_err(|err| CliError {
                message: format!("failed to start poll watcher: {}", err),
            })?,
        )
    } else {
        Box::new(notify::recommended_watcher(tx).map_err(|err| CliError {
            message: format!("failed to start watcher: {}", err),
        })?)
    };

    for root in watch_roots(&build.content, build.config.as_deref()) {
        watcher
            .watch(&root, notify::RecursiveMode::Recursive)
            .map_err(|err| CliError {
                message: format!("failed to watch {}: {}", root.display(), err),
            })?;
    }

    if poll {
        eprintln!("watching for changes (polling, press Ctrl+C to stop)...");
    } else {
        eprintln!("watching for changes (press Ctrl+C to stop)...");
    }

    let mut debounce = Debounce::new(Instant::now(), Duration::from_millis(200));
    loop {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(event_result) => {
                let event = match event_result {
                    Ok(event) => event,
                    Err(err) => {
                        eprintln!("watch error: {}", err);
                        continue;
                    }
                };
                if should_ignore_event(&event, ignore_set.as_ref()) {
                    continue;
                }
                if !debounce.ready(Instant::now()) {
                    continue;
                }
                eprintln!("change detected, rebuilding...");
                if let Err(err) = run_build(build) {
                    eprintln!("build failed: {}", err.message);
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            Err(_) => break,
        }
    }

    Ok(())
}

/// Drops events that arrive within `window` of the last accepted one.
struct Debounce {
    last: Instant,
    window: Duration,
}

impl Debounce {
    fn new(start: Instant, window: Duration) -> Self {
        Self {
            last: start,
            window,
        }
    }

    fn ready(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) < self.window {
            return false;
        }
        self.last = now;
        true
    }
}

fn watch_roots(patterns: &[String], config: Option<&str>) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for pattern in patterns.iter().map(String::as_str).chain(config) {
        let root = glob_root(pattern);
        let normalized = if root.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            root
        };
        if seen.insert(normalized.clone()) {
            roots.push(normalized);
        }
    }

    if roots.is_empty() {
        roots.push(PathBuf::from("."));
    }
    roots
}

fn glob_root(pattern: &str) -> PathBuf {
    let Some(first_meta) = pattern.find(['*', '?', '[', '{']) else {
        let path = Path::new(pattern);
        if pattern.ends_with('/') || pattern.ends_with('\\') || path.extension().is_none() {
            return path.to_path_buf();
        }
        return path.parent().unwrap_or(Path::new(".")).to_path_buf();
    };

    let prefix = &pattern[..first_meta];
    match prefix.rfind(['/', '\\']) {
        Some(0) => PathBuf::from(&prefix[..1]),
        Some(idx) => PathBuf::from(&prefix[..idx]),
        None => PathBuf::from("."),
    }
}

fn build_globset(patterns: &[String]) -> Result<globset::GlobSet, CliError> {
    let mut builder = globset::GlobSetBuilder::new();
    for pattern in patterns {
        let glob = globset::Glob::new(pattern).map_err(|err| CliError {
            message: format!("invalid glob pattern '{}': {}", pattern, err),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|err| CliError {
        message: format!("failed to build ignore glob set: {}", err),
    })
}

fn should_ignore_event(event: &notify::Event, ignore_set: Option<&globset::GlobSet>) -> bool {
    let Some(ignore_set) = ignore_set else {
        return false;
    };
    if event.paths.is_empty() {
        return false;
    }
    event.paths.iter().all(|path| ignore_set.is_match(path))
}
