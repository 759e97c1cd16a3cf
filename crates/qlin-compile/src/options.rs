//! Compilation options.

use serde::{Deserialize, Serialize};

use qlin_emit::OutputFormat;

use crate::error::CompileResult;
use crate::lower::DEFAULT_MAX_INLINE_DEPTH;

/// Options controlling a [`Pipeline`](crate::Pipeline) run.
///
/// Every field has a default, so a driver's config file only needs to name
/// what it changes:
///
/// ```rust
/// use qlin_compile::CompileOptions;
/// use qlin_emit::OutputFormat;
///
/// let options = CompileOptions::from_yaml("format: openqasm3\n").unwrap();
/// assert_eq!(options.format, OutputFormat::OpenQasm3);
/// assert_eq!(options.max_inline_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Target text format.
    pub format: OutputFormat,
    /// Limit on nested inlined calls.
    pub max_inline_depth: usize,
    /// Emit a comment naming the source binding of each qubit register slot.
    pub annotate_registers: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Flat,
            max_inline_depth: DEFAULT_MAX_INLINE_DEPTH,
            annotate_registers: false,
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_max_inline_depth(mut self, depth: usize) -> Self {
        self.max_inline_depth = depth;
        self
    }

    #[must_use]
    pub fn with_register_annotations(mut self, annotate: bool) -> Self {
        self.annotate_registers = annotate;
        self
    }

    /// Parse options from JSON.
    pub fn from_json(json: &str) -> CompileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse options from YAML.
    pub fn from_yaml(yaml: &str) -> CompileResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;

    #[test]
    fn test_defaults() {
        let options = CompileOptions::default();
        assert_eq!(options.format, OutputFormat::Flat);
        assert_eq!(options.max_inline_depth, DEFAULT_MAX_INLINE_DEPTH);
        assert!(!options.annotate_registers);
    }

    #[test]
    fn test_builder() {
        let options = CompileOptions::new()
            .with_format(OutputFormat::OpenQasm3)
            .with_max_inline_depth(4)
            .with_register_annotations(true);
        assert_eq!(options.format, OutputFormat::OpenQasm3);
        assert_eq!(options.max_inline_depth, 4);
        assert!(options.annotate_registers);
    }

    #[test]
    fn test_from_json_partial() {
        let options = CompileOptions::from_json(r#"{"max_inline_depth": 8}"#).unwrap();
        assert_eq!(options.max_inline_depth, 8);
        assert_eq!(options.format, OutputFormat::Flat);
    }

    #[test]
    fn test_from_yaml() {
        let options =
            CompileOptions::from_yaml("format: openqasm3\nannotate_registers: true\n").unwrap();
        assert_eq!(options.format, OutputFormat::OpenQasm3);
        assert!(options.annotate_registers);
    }

    #[test]
    fn test_invalid_options() {
        assert!(matches!(
            CompileOptions::from_json(r#"{"format": "braket"}"#),
            Err(CompileError::OptionsJson(_))
        ));
        assert!(matches!(
            CompileOptions::from_yaml("max_inline_depth: [1, 2]"),
            Err(CompileError::OptionsYaml(_))
        ));
    }
}
