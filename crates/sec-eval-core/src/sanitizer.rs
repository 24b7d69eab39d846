//! Sanitizer report extraction from raw container output.
//!
//! Sanitizers bracket their reports with stable markers
//! (`==1234==ERROR: AddressSanitizer: ...` through `==1234==ABORTING`). When
//! both are present the exact bracketed span is returned. Truncated or
//! non-standard output falls back to a character window around the first
//! known sanitizer name, so a crash is still surfaced.

use regex::Regex;

/// Sanitizer names scanned by the fallback, in priority order.
pub const SANITIZER_INDICATORS: [&str; 5] = [
    "AddressSanitizer",
    "LeakSanitizer",
    "UndefinedBehaviorSanitizer",
    "ThreadSanitizer",
    "MemorySanitizer",
];

pub const DEFAULT_CONTEXT_CHARS: usize = 1000;

const START_PATTERN: &str = r"==\d{2,}==ERROR: (\w+)Sanitizer:";
const END_PATTERN: &str = r"==\d+==ABORTING";

#[derive(Debug, Clone)]
pub struct SanitizerExtractor {
    start: Regex,
    end: Regex,
    context_chars: usize,
}

impl Default for SanitizerExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_CHARS)
    }
}

impl SanitizerExtractor {
    pub fn new(context_chars: usize) -> Self {
        Self {
            start: Regex::new(START_PATTERN).expect("sanitizer start pattern is a valid regex"),
            end: Regex::new(END_PATTERN).expect("sanitizer end pattern is a valid regex"),
            context_chars,
        }
    }

    /// Returns the sanitizer report contained in `output`, if any.
    pub fn extract<'a>(&self, output: &'a str) -> Option<&'a str> {
        self.bracketed(output).or_else(|| self.around_indicator(output))
    }

    fn bracketed<'a>(&self, output: &'a str) -> Option<&'a str> {
        let start = self.start.find(output)?;
        let end = self.end.find(output)?;
        if end.end() > start.start() {
            Some(&output[start.start()..end.end()])
        } else {
            None
        }
    }

    fn around_indicator<'a>(&self, output: &'a str) -> Option<&'a str> {
        let (indicator, idx) = SANITIZER_INDICATORS
            .iter()
            .find_map(|indicator| output.find(indicator).map(|idx| (*indicator, idx)))?;

        let window_start = match self.context_chars {
            0 => idx,
            n => output[..idx]
                .char_indices()
                .rev()
                .nth(n - 1)
                .map(|(pos, _)| pos)
                .unwrap_or(0),
        };

        let after = idx + indicator.len();
        let window_end = output[after..]
            .char_indices()
            .nth(self.context_chars)
            .map(|(pos, _)| after + pos)
            .unwrap_or(output.len());

        Some(&output[window_start..window_end])
    }
}

/// Convenience wrapper using the default 1000 character context window.
pub fn extract_sanitizer_report(output: &str) -> Option<&str> {
    SanitizerExtractor::default().extract(output)
}
