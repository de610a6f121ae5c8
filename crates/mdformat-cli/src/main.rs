//! mdformat - CommonMark compliant Markdown formatter

use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use mdformat::{EndOfLine, FileConfig, Options, PluginRegistry, WrapMode};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

const NOT_EQUIVALENT_HELP: &str = "Formatted Markdown renders to different HTML than input \
Markdown. This is a bug in mdformat or one of its installed plugins. Please retry without any \
plugins enabled. If this error persists, report an issue including the input Markdown.";

#[derive(Parser)]
#[command(name = "mdformat")]
#[command(version, about = "CommonMark compliant Markdown formatter", long_about = None)]
struct Cli {
    /// Files to format. Directories are searched for *.md files, "-" reads stdin
    #[arg(value_name = "PATH")]
    paths: Vec<String>,

    /// Do not apply changes to files
    #[arg(long)]
    check: bool,

    /// Apply consecutive numbering to ordered lists
    #[arg(long)]
    number: bool,

    /// Paragraph word wrap mode (default: keep)
    #[arg(long, value_name = "{keep,no,INTEGER}")]
    wrap: Option<WrapMode>,

    /// Output file line ending mode (default: lf)
    #[arg(long, value_name = "{lf,crlf,keep}")]
    end_of_line: Option<EndOfLine>,

    /// Exclude files that match the glob pattern (multiple allowed)
    #[arg(long, value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Parser extensions to enable (default: all bundled extensions)
    #[arg(long = "extension", value_name = "NAME")]
    extensions: Vec<String>,
}

/// A file to format, or stdin
enum Source {
    Stdin,
    File(PathBuf),
}

impl Source {
    fn display(&self) -> String {
        match self {
            Source::Stdin => "-".to_string(),
            Source::File(path) => path.display().to_string(),
        }
    }
}

/// Failure that ends the run
#[derive(Debug)]
struct Fatal {
    title: String,
    help: Option<&'static str>,
}

impl Fatal {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            help: None,
        }
    }
}

impl From<io::Error> for Fatal {
    fn from(err: io::Error) -> Self {
        Fatal::new(err.to_string())
    }
}

impl From<mdformat::Error> for Fatal {
    fn from(err: mdformat::Error) -> Self {
        Fatal::new(err.to_string())
    }
}

fn print_error(title: &str, help: Option<&str>) {
    eprintln!("Error: {title}");
    if let Some(help) = help {
        eprintln!();
        eprintln!("{help}");
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(fatal) => {
            print_error(&fatal.title, fatal.help);
            ExitCode::FAILURE
        }
    }
}

/// Format or check every source. Returns false if a file was not formatted.
fn run(cli: &Cli) -> Result<bool, Fatal> {
    if cli.paths.is_empty() {
        eprintln!("No files have been passed in. Doing nothing.");
        return Ok(true);
    }

    let registry = PluginRegistry::with_builtins();
    let base = if cli.extensions.is_empty() {
        registry.configure_all(Options::default())
    } else {
        registry.configure(Options::default(), &cli.extensions)?
    };
    let changes_ast = base.changes_ast();

    let sources = resolve_sources(&cli.paths)?;
    let cwd = env::current_dir()?;
    let mut all_formatted = true;

    for source in sources {
        let config_dir = match &source {
            Source::File(path) => path.parent().unwrap_or(cwd.as_path()),
            Source::Stdin => cwd.as_path(),
        };
        let config = FileConfig::discover(config_dir).map_err(mdformat::Error::from)?;

        if let Source::File(path) = &source {
            let (patterns, root) = if cli.exclude.is_empty() {
                (&config.exclude, config.root().unwrap_or(cwd.as_path()))
            } else {
                (&cli.exclude, cwd.as_path())
            };
            if is_excluded(path, patterns, root)? {
                debug!(path = %path.display(), "Excluded");
                continue;
            }
        }

        let options = cli_overrides(cli, config.apply(base.clone()))
            .with_filename(source.display());

        let original = match &source {
            Source::File(path) => fs::read_to_string(path)?,
            Source::Stdin => {
                let mut text = String::new();
                io::stdin().read_to_string(&mut text)?;
                text
            }
        };
        let formatted = mdformat::text_with_newlines(&original, &options)?;

        if cli.check {
            if formatted != original {
                all_formatted = false;
                print_error(&format!("File \"{}\" is not formatted.", source.display()), None);
            }
            continue;
        }

        if !changes_ast && !mdformat::is_md_equal(&original, &formatted, &options) {
            return Err(Fatal {
                title: format!("Could not format \"{}\".", source.display()),
                help: Some(NOT_EQUIVALENT_HELP),
            });
        }

        match &source {
            Source::File(path) => {
                if formatted != original {
                    fs::write(path, formatted.as_bytes())?;
                }
            }
            Source::Stdin => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(formatted.as_bytes())?;
                stdout.flush()?;
            }
        }
    }

    Ok(all_formatted)
}

/// Command line flags override configuration file values
fn cli_overrides(cli: &Cli, mut options: Options) -> Options {
    if let Some(wrap) = cli.wrap {
        options.wrap = wrap;
    }
    if cli.number {
        options.number = true;
    }
    if let Some(end_of_line) = cli.end_of_line {
        options.end_of_line = end_of_line;
    }
    options
}

/// Expand path arguments to the files they name
fn resolve_sources(paths: &[String]) -> Result<Vec<Source>, Fatal> {
    let mut sources = Vec::new();
    for arg in paths {
        if arg == "-" {
            sources.push(Source::Stdin);
            continue;
        }
        let path = std::path::absolute(arg)?;
        if path.is_dir() {
            let entries = WalkDir::new(&path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "md"));
            sources.extend(entries.map(|entry| Source::File(entry.into_path())));
        } else if path.is_file() {
            sources.push(Source::File(path));
        } else {
            return Err(Fatal::new(format!("File \"{}\" does not exist.", path.display())));
        }
    }
    Ok(sources)
}

fn exclude_set(patterns: &[String]) -> Result<GlobSet, Fatal> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|err| Fatal::new(format!("Invalid exclude pattern: {err}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|err| Fatal::new(format!("Invalid exclude pattern: {err}")))
}

/// Whether `path`, relative to `root`, matches one of `patterns`
fn is_excluded(path: &Path, patterns: &[String], root: &Path) -> Result<bool, Fatal> {
    if patterns.is_empty() {
        return Ok(false);
    }
    let Ok(relative) = path.strip_prefix(root) else {
        return Ok(false);
    };
    Ok(exclude_set(patterns)?.is_match(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_excluded() {
        let root = Path::new("/project");
        let patterns = vec!["venv/**".to_string(), "*.txt.md".to_string()];

        assert!(is_excluded(Path::new("/project/venv/a/b.md"), &patterns, root).unwrap());
        assert!(is_excluded(Path::new("/project/notes.txt.md"), &patterns, root).unwrap());
        assert!(!is_excluded(Path::new("/project/docs/notes.txt.md"), &patterns, root).unwrap());
        assert!(!is_excluded(Path::new("/elsewhere/venv/a.md"), &patterns, root).unwrap());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from(["mdformat", "--wrap", "40", "--number", "x.md"]);
        let options = cli_overrides(&cli, Options::default().with_wrap(WrapMode::NoWrap));
        assert_eq!(options.wrap, WrapMode::Width(40));
        assert!(options.number);
        assert_eq!(options.end_of_line, EndOfLine::Lf);
    }

    #[test]
    fn test_invalid_wrap_is_rejected() {
        assert!(Cli::try_parse_from(["mdformat", "--wrap", "0", "x.md"]).is_err());
        assert!(Cli::try_parse_from(["mdformat", "--end-of-line", "cr", "x.md"]).is_err());
    }
}
