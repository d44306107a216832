//! lexmode - highlight a file with a registered mode
//!
//! Prints the file with terminal colors, or with `--tokens` one row per
//! token showing its position and class.

use std::env;
use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use serde::Deserialize;
use tracing::{debug, info};

use lexmode::config::Config;
use lexmode::error::{ModeError, Result};
use lexmode::mode::PLAIN_TEXT_MIME;
use lexmode::render::{write_highlighted, write_token_table};
use lexmode::{split_lines, start_state, tokenize_line, HighlightCache, ModeRegistry, ModeSpec};

/// Parsed command line
#[derive(Debug, Default)]
struct Args {
    mode: Option<ModeSpec>,
    tab_width: Option<usize>,
    tokens: bool,
    list: bool,
    config: Option<PathBuf>,
    verbose: u8,
    file: Option<PathBuf>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let Some(args) = parse_args(env::args().skip(1))? else {
        return Ok(());
    };
    setup_tracing(args.verbose);

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    let mut registry = ModeRegistry::with_builtins();
    config.apply(&mut registry);

    if args.list {
        return print_modes(&registry);
    }

    let Some(file) = args.file else {
        return Err(ModeError::Message("no input file (try --help)".to_string()));
    };
    let text = read_input(&file)?;

    let mut options = config.mode_options();
    if let Some(width) = args.tab_width {
        options.tab_size = width.clamp(1, 16);
    }

    // An explicit --mode must resolve; anything else falls back quietly
    let mode = match args.mode {
        Some(spec) => registry.try_get_mode(&options, spec)?,
        None => {
            let spec = config
                .mode_for_path(&file)
                .or_else(|| config.default_mode.clone())
                .unwrap_or_else(|| ModeSpec::from(PLAIN_TEXT_MIME));
            registry.get_mode(&options, spec)
        }
    };
    info!(mode = mode.name(), file = %file.display(), "highlighting");

    let lines = split_lines(&text);
    let lines = match lines.split_last() {
        Some((last, rest)) if last.is_empty() => rest,
        _ => &lines[..],
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if args.tokens {
        let mut state = start_state(&mode, 0);
        for (line_no, line) in lines.iter().enumerate() {
            let tokens = tokenize_line(&mode, line, &mut state, options.tab_size);
            write_token_table(&mut out, line_no, line, &tokens)?;
        }
    } else {
        let mut cache = HighlightCache::new(mode, options.tab_size);
        for (line, spans) in lines.iter().zip(cache.highlight_document(lines)) {
            write_highlighted(&mut out, line, spans)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Parse arguments; `None` means the run is already complete (help, version)
fn parse_args<I>(args: I) -> Result<Option<Args>>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(None);
            }
            "--version" | "-V" => {
                print_version();
                return Ok(None);
            }
            "--mode" | "-m" => {
                let value = required_value(&arg, args.next())?;
                parsed.mode = Some(parse_mode_arg(&value)?);
            }
            "--tab-width" | "-t" => {
                let value = required_value(&arg, args.next())?;
                let width = value
                    .parse()
                    .map_err(|_| ModeError::Message(format!("invalid tab width: {}", value)))?;
                parsed.tab_width = Some(width);
            }
            "--config" | "-c" => {
                let value = required_value(&arg, args.next())?;
                parsed.config = Some(PathBuf::from(value));
            }
            "--tokens" => parsed.tokens = true,
            "--list" => parsed.list = true,
            "-v" | "--verbose" => parsed.verbose += 1,
            "-vv" => parsed.verbose += 2,
            "-" => parsed.file = Some(PathBuf::from("-")),
            _ if arg.starts_with('-') => {
                return Err(ModeError::Message(format!("unknown option: {}", arg)));
            }
            _ => {
                if parsed.file.is_some() {
                    return Err(ModeError::Message(format!("unexpected argument: {}", arg)));
                }
                parsed.file = Some(PathBuf::from(&arg));
            }
        }
    }
    Ok(Some(parsed))
}

fn required_value(flag: &str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| ModeError::Message(format!("{} requires a value", flag)))
}

/// A mode argument is a name or MIME type, or an inline TOML table
///
/// `--mode '{ name = "clike", dialect = "c" }'`
fn parse_mode_arg(value: &str) -> Result<ModeSpec> {
    #[derive(Deserialize)]
    struct Wrapper {
        mode: ModeSpec,
    }

    if value.trim_start().starts_with('{') {
        let wrapper: Wrapper = toml::from_str(&format!("mode = {}", value))?;
        Ok(wrapper.mode)
    } else {
        Ok(ModeSpec::from(value))
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    debug!(path = %path.display(), "reading input");
    Ok(fs::read_to_string(path)?)
}

/// Log to stderr, filtered by LEXMODE_LOG or the -v count
fn setup_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("LEXMODE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn print_modes(registry: &ModeRegistry) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Modes:")?;
    for name in registry.mode_names() {
        let marker = if registry.default_mode() == Some(name) { " (default)" } else { "" };
        writeln!(out, "  {}{}", name, marker)?;
    }
    writeln!(out)?;
    writeln!(out, "MIME types:")?;
    for mime in registry.mime_types() {
        writeln!(out, "  {}", mime)?;
    }
    Ok(())
}

fn print_usage() {
    println!("lexmode {} - line tokenizer and highlighter", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: lexmode [OPTIONS] FILE");
    println!();
    println!("Options:");
    println!("  -m, --mode SPEC       Mode name, MIME type or inline TOML table");
    println!("  -t, --tab-width N     Tab width for column computations");
    println!("  -c, --config PATH     Config file (default ~/.lexmode.toml)");
    println!("      --tokens          Print one row per token instead of colored text");
    println!("      --list            List registered modes and MIME types");
    println!("  -v, --verbose         More logging (repeat for more)");
    println!("  -h, --help            Show this help message");
    println!("  -V, --version         Show version information");
    println!();
    println!("FILE may be - to read standard input.");
    println!("LEXMODE_LOG overrides the log filter, e.g. LEXMODE_LOG=lexmode=debug");
}

fn print_version() {
    println!("lexmode {}", lexmode::VERSION);
}
