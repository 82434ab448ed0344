//! Capture of the calling stack and its HTML rendering.
//!
//! Capture parses the standard library's backtrace text, so it works on
//! stable without extra unwinding crates. Entries that carry no source
//! location are dropped there; frames that cannot be laid out as
//! `directory/file` are dropped at render time.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::MAIN_SEPARATOR;
use std::sync::Arc;
use tracing::trace;

#[cfg(feature = "stacktrace")]
use crate::RecorderConfig;

/// One frame of a captured stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackFrame {
    pub path: String,
    pub line: u32,
    pub function: String,
    pub code: String,
}

impl StackFrame {
    pub fn new(
        path: impl Into<String>,
        line: u32,
        function: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            line,
            function: function.into(),
            code: code.into(),
        }
    }
}

type SourceFile = Option<Arc<Vec<String>>>;

// Files are read once per process; unreadable paths are remembered as `None`.
static SOURCE_LINES: Lazy<RwLock<HashMap<String, SourceFile>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Captures the current stack, outermost frame first.
///
/// Frames matching [`RecorderConfig::is_hidden`] are removed, which keeps the
/// recording machinery itself out of the trace.
#[cfg(feature = "stacktrace")]
pub fn capture(config: &RecorderConfig) -> Vec<StackFrame> {
    use std::backtrace::{Backtrace, BacktraceStatus};

    let backtrace = Backtrace::force_capture();
    if backtrace.status() != BacktraceStatus::Captured {
        return Vec::new();
    }

    let mut frames: Vec<StackFrame> = parse_backtrace(&backtrace.to_string())
        .into_iter()
        .filter(|frame| !config.is_hidden(&frame.function))
        .collect();
    frames.reverse();

    if let Some(max) = config.max_frames {
        if frames.len() > max {
            frames.drain(..frames.len() - max);
        }
    }

    if config.source_lines {
        for frame in &mut frames {
            frame.code = source_line(&frame.path, frame.line).unwrap_or_default();
        }
    }

    frames
}

/// Parses the text form of a standard library backtrace, innermost first.
///
/// Symbols without an `at path:line[:col]` location are skipped.
pub fn parse_backtrace(text: &str) -> Vec<StackFrame> {
    let mut frames = Vec::new();
    let mut function: Option<String> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(location) = trimmed.strip_prefix("at ") {
            let Some(name) = function.take() else {
                continue;
            };
            match parse_location(name, location) {
                Some(frame) => frames.push(frame),
                None => trace!(location, "skipping frame with unreadable location"),
            }
        } else {
            let name = match trimmed.split_once(": ") {
                Some((index, name))
                    if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) =>
                {
                    name
                }
                _ => trimmed,
            };
            function = Some(name.to_string());
        }
    }

    frames
}

fn parse_location(function: String, location: &str) -> Option<StackFrame> {
    let (rest, last) = location.rsplit_once(':')?;
    let last: u32 = last.parse().ok()?;

    // `path:line:col`, or `path:line` when no column is known
    let (path, line) = match rest.rsplit_once(':') {
        Some((path, line)) => match line.parse::<u32>() {
            Ok(line) => (path, line),
            Err(_) => (rest, last),
        },
        None => (rest, last),
    };

    if path.is_empty() {
        return None;
    }
    Some(StackFrame::new(path, line, function, String::new()))
}

/// Returns the trimmed source text at `line` (1-based) of `path`.
pub fn source_line(path: &str, line: u32) -> Option<String> {
    let index = (line as usize).checked_sub(1)?;

    if let Some(file) = SOURCE_LINES.read().get(path) {
        return line_at(file, index);
    }

    let loaded: SourceFile = std::fs::read_to_string(path)
        .ok()
        .map(|text| Arc::new(text.lines().map(str::to_string).collect()));

    let mut cache = SOURCE_LINES.write();
    let file = cache.entry(path.to_string()).or_insert(loaded);
    line_at(file, index)
}

fn line_at(file: &SourceFile, index: usize) -> Option<String> {
    file.as_ref()?.get(index).map(|text| text.trim().to_string())
}

/// Forgets every file read by [`source_line`].
pub fn clear_source_cache() {
    SOURCE_LINES.write().clear();
}

/// Renders frames as HTML, one frame per line, all values escaped.
///
/// # Examples
///
/// ```
/// use cache_panel_core::{render_stacktrace, StackFrame};
///
/// let html = render_stacktrace(&[StackFrame::new("app/views.rs", 7, "index", "cache.get(\"a<b\")")]);
/// assert_eq!(
///     html,
///     "<span class=\"path\">app/</span><span class=\"file\">views.rs</span> in \
///      <span class=\"func\">index</span>(<span class=\"lineno\">7</span>)\n  \
///      <span class=\"code\">cache.get(&quot;a&lt;b&quot;)</span>"
/// );
/// ```
pub fn render_stacktrace(frames: &[StackFrame]) -> String {
    frames
        .iter()
        .filter_map(render_frame)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_frame(frame: &StackFrame) -> Option<String> {
    let Some((directory, file)) = frame.path.rsplit_once(MAIN_SEPARATOR) else {
        trace!(path = %frame.path, "skipping frame without directory");
        return None;
    };

    Some(format!(
        "<span class=\"path\">{}/</span><span class=\"file\">{}</span> in \
         <span class=\"func\">{}</span>(<span class=\"lineno\">{}</span>)\n  \
         <span class=\"code\">{}</span>",
        escape_html(directory),
        escape_html(file),
        escape_html(&frame.function),
        frame.line,
        escape_html(&frame.code),
    ))
}

/// Escapes `& < > " '` for inclusion in HTML text or attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
