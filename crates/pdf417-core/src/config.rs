//! Per-call decoding options.

/// Options for one decode call.
///
/// The codeword width bounds come from the caller's detector, which has
/// measured the start and stop patterns; the scanner relaxes them by two
/// pixels and tightens them further as codewords are accepted. Width
/// adaptation never leaks back into this value.
///
/// # Example
/// ```
/// use pdf417_core::DecodeOptions;
///
/// let options = DecodeOptions::new(45, 60).with_character_set("utf-8");
/// assert_eq!(options.character_set.as_deref(), Some("utf-8"));
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodeOptions {
    /// Smallest plausible codeword width in pixels, inclusive.
    pub min_codeword_width: i32,
    /// Largest plausible codeword width in pixels, inclusive.
    pub max_codeword_width: i32,
    /// Initial character set for byte compaction, as an `encoding_rs`
    /// label. `None` means Latin-1; ECI codewords in the stream take
    /// precedence either way.
    pub character_set: Option<String>,
}

impl DecodeOptions {
    #[must_use]
    pub fn new(min_codeword_width: i32, max_codeword_width: i32) -> Self {
        Self {
            min_codeword_width,
            max_codeword_width,
            character_set: None,
        }
    }

    /// Override the initial byte-compaction character set.
    #[must_use]
    pub fn with_character_set(mut self, label: impl Into<String>) -> Self {
        self.character_set = Some(label.into());
        self
    }
}
