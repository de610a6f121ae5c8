//! Text and file formatting API

use std::fs;
use std::io::Write;
use std::path::Path;

use mdformat_core::{render, EndOfLine, Env, Options};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::equivalence::parser_features;
use crate::parser::{parse, ParsedDocument};
use crate::{Error, Result};

static RE_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\r|\n").expect("valid regex"));

/// Format a Markdown string.
///
/// When paragraphs are rewrapped the result is formatted a second time,
/// since some escapes depend on where lines break.
///
/// # Errors
///
/// Fails if the parsed tokens do not form a tree, which indicates a parser
/// extension bug.
pub fn text(md: &str, options: &Options) -> Result<String> {
    let mut rendering = render_pass(md, options)?;
    if options.do_wrap() {
        debug!(wrap = %options.wrap, "Rendering a second pass");
        rendering = render_pass(&rendering, options)?;
    }
    Ok(rendering)
}

fn render_pass(md: &str, options: &Options) -> Result<String> {
    let md = RE_NEWLINES.replace_all(md, "\n");
    let ParsedDocument { tokens, references } = parse(&md, &parser_features(options));
    let mut env = Env::new(references);
    Ok(render(tokens, options, &mut env)?)
}

/// Line ending to write, given the input document and the configured mode
pub fn detect_newline_type(md: &str, end_of_line: EndOfLine) -> &'static str {
    match end_of_line {
        EndOfLine::Keep => match RE_NEWLINES.find(md) {
            Some(newline) if newline.as_str() == "\r\n" => "\r\n",
            _ => "\n",
        },
        EndOfLine::Crlf => "\r\n",
        EndOfLine::Lf => "\n",
    }
}

/// Format `md` and convert its line endings per `options.end_of_line`
pub fn text_with_newlines(md: &str, options: &Options) -> Result<String> {
    let formatted = text(md, options)?;
    let newline = detect_newline_type(md, options.end_of_line);
    if newline == "\n" {
        return Ok(formatted);
    }
    Ok(formatted.replace('\n', newline))
}

/// Format a Markdown file in place.
///
/// The file is only rewritten when formatting changes it. Returns whether
/// it changed.
///
/// # Errors
///
/// Fails if `path` is not a regular file, is a symlink, or cannot be read
/// or written.
pub fn file(path: impl AsRef<Path>, options: &Options) -> Result<bool> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::InvalidPath {
            path: path.to_path_buf(),
            reason: "It is not a file.",
        });
    }
    if path.is_symlink() {
        return Err(Error::InvalidPath {
            path: path.to_path_buf(),
            reason: "It is a symlink.",
        });
    }

    let original = fs::read_to_string(path)?;
    let options = options.clone().with_filename(path.display().to_string());
    let formatted = text_with_newlines(&original, &options)?;
    if formatted == original {
        return Ok(false);
    }
    atomic_write(path, &formatted)?;
    Ok(true)
}

/// Replace the content of `path` without leaving a partially written file
fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())?;
    }
    temp.persist(path).map_err(|err| Error::Io(err.error))?;
    Ok(())
}
