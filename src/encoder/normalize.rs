//! Inclusion-class line normalization.

use regex::Regex;

use crate::config::ConfigError;

/// Strips every character outside an inclusion character class.
///
/// The normalized form is used only to compute a fingerprint; the original,
/// unmodified line is what gets stored and ultimately output. Normalization
/// is pure and deterministic, and an entirely-stripped line is still valid
/// digest input.
#[derive(Debug, Clone)]
pub struct Normalizer {
    exclusion: Regex,
}

impl Normalizer {
    /// Build a normalizer from a character-class body (e.g. `"0-9a-zA-Z"`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] when the class body is not a
    /// valid regex character class.
    pub fn new(char_class: &str) -> Result<Self, ConfigError> {
        let exclusion =
            Regex::new(&format!("[^{char_class}]")).map_err(|source| ConfigError::InvalidPattern {
                pattern: char_class.to_string(),
                source,
            })?;
        Ok(Self { exclusion })
    }

    /// Remove every character outside the inclusion class.
    #[must_use]
    pub fn normalize(&self, line: &str) -> String {
        self.exclusion.replace_all(line, "").into_owned()
    }
}
