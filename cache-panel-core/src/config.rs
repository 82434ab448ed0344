/// Frame name prefixes hidden from recorded stack traces by default: the
/// standard library, the test harness, the runtime entry shims and this
/// crate's own recording frames.
pub const DEFAULT_HIDDEN_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "test::",
    "__rust_",
    "cache_panel_core::",
];

/// Options for the recording layer.
///
/// # Examples
///
/// ```
/// use cache_panel_core::RecorderConfig;
///
/// let config = RecorderConfig::default()
///     .hide("actix_web::")
///     .with_max_frames(12)
///     .with_source_lines(false);
///
/// assert!(config.is_hidden("<actix_web::app::App as core::ops::Fn>::call"));
/// assert!(config.is_hidden("std::rt::lang_start"));
/// assert!(!config.is_hidden("my_app::views::index"));
/// ```
#[derive(Clone, Debug)]
pub struct RecorderConfig {
    /// Frames whose function name starts with one of these are dropped.
    pub hidden_prefixes: Vec<String>,
    /// Look up the source text of each frame.
    pub source_lines: bool,
    /// Keep at most this many frames, the ones closest to the cache call.
    pub max_frames: Option<usize>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            hidden_prefixes: DEFAULT_HIDDEN_PREFIXES.iter().map(|p| p.to_string()).collect(),
            source_lines: true,
            max_frames: None,
        }
    }
}

impl RecorderConfig {
    /// Creates the default configuration: standard library, test harness
    /// and recording frames hidden, source lines looked up, no frame limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hides frames from another framework or library.
    pub fn hide(mut self, prefix: impl Into<String>) -> Self {
        self.hidden_prefixes.push(prefix.into());
        self
    }

    /// Turns source text lookup for each frame on or off.
    ///
    /// Without it frames still carry path, line and function, and no source
    /// file is read.
    pub fn with_source_lines(mut self, enabled: bool) -> Self {
        self.source_lines = enabled;
        self
    }

    /// Keeps at most `max` frames per call, the innermost ones.
    ///
    /// # Examples
    ///
    /// ```
    /// use cache_panel_core::RecorderConfig;
    ///
    /// let config = RecorderConfig::new().with_max_frames(5);
    /// assert_eq!(config.max_frames, Some(5));
    /// ```
    pub fn with_max_frames(mut self, max: usize) -> Self {
        self.max_frames = Some(max);
        self
    }

    /// Whether a frame with this function name is dropped. Leading `<` of
    /// trait-qualified names is ignored.
    pub fn is_hidden(&self, function: &str) -> bool {
        let name = function.trim_start_matches('<');
        self.hidden_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }
}
