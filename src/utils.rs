//! Output truncation and tool-identifier sanitisation.
//!
//! Tool output can be arbitrarily large (a `Grep` over a big repo, a `Bash`
//! command that dumps a log file). [`OutputLimiter`] enforces a byte and
//! item budget before a tool result is handed back to the model, so one
//! noisy tool call can't blow out the context window.

/// Default byte budget for a single tool result.
pub const DEFAULT_MAX_BYTES: usize = 50 * 1024;

/// Default item budget (e.g. matched lines, listed files) for a single tool result.
pub const DEFAULT_MAX_ITEMS: usize = 500;

/// Truncates tool output to a byte or item budget.
///
/// Truncation prefers a newline boundary so output isn't cut mid-line, and
/// always appends exactly one marker line reporting the original size and
/// suggesting a narrower query.
#[derive(Debug, Clone, Copy)]
pub struct OutputLimiter {
    pub max_bytes: usize,
    pub max_items: usize,
}

impl Default for OutputLimiter {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }
}

impl OutputLimiter {
    pub fn new(max_bytes: usize, max_items: usize) -> Self {
        Self { max_bytes, max_items }
    }

    /// Truncate a block of text to `max_bytes`, preferring to cut at the
    /// last newline within budget. Returns the text unchanged if it already
    /// fits.
    pub fn truncate_text(&self, text: &str) -> String {
        if text.len() <= self.max_bytes {
            return text.to_string();
        }

        let original_len = text.len();
        let mut cut = self.max_bytes;
        // Don't split a multi-byte UTF-8 sequence.
        while cut > 0 && !text.is_char_boundary(cut) {
            cut -= 1;
        }
        let slice = &text[..cut];
        let boundary = slice.rfind('\n').map(|i| i + 1).unwrap_or(cut);
        let truncated = &text[..boundary];

        format!(
            "{truncated}\n[output truncated: showing {shown} of {original} bytes — narrow your query to see more]",
            shown = boundary,
            original = original_len,
        )
    }

    /// Truncate a list of items (e.g. matched lines, directory entries) to
    /// `max_items`, appending a marker with the true count.
    pub fn truncate_items(&self, items: Vec<String>) -> Vec<String> {
        let original_count = items.len();
        if original_count <= self.max_items {
            return items;
        }

        let mut truncated: Vec<String> = items.into_iter().take(self.max_items).collect();
        truncated.push(format!(
            "[output truncated: showing {shown} of {original} items — narrow your query to see more]",
            shown = self.max_items,
            original = original_count,
        ));
        truncated
    }
}

/// Sanitise a tool-use id for use as a JavaScript identifier: any character
/// outside `[A-Za-z0-9_$]` becomes `_`. Used by the `JavaScript` tool when
/// injecting prior tool results as global variables into the sandboxed
/// engine.
pub fn sanitize_js_identifier(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_text_passthrough_under_budget() {
        let limiter = OutputLimiter::new(1024, 10);
        assert_eq!(limiter.truncate_text("hello"), "hello");
    }

    #[test]
    fn truncate_text_cuts_at_newline_boundary() {
        let limiter = OutputLimiter::new(10, 10);
        let text = "0123456789\nabcdefghij\nzzzz";
        let result = limiter.truncate_text(text);
        assert!(result.starts_with("0123456789\n"));
        assert!(result.contains("truncated"));
        assert!(!result.contains("abcdefghij"));
    }

    #[test]
    fn truncate_text_reports_original_size() {
        let limiter = OutputLimiter::new(5, 10);
        let text = "a\nb\nc\nd\ne\nf\ng";
        let result = limiter.truncate_text(text);
        assert!(result.contains(&text.len().to_string()));
    }

    #[test]
    fn truncate_items_under_budget_unchanged() {
        let limiter = OutputLimiter::new(1024, 3);
        let items = vec!["a".to_string(), "b".to_string()];
        let result = limiter.truncate_items(items.clone());
        assert_eq!(result, items);
    }

    #[test]
    fn truncate_items_over_budget_appends_marker() {
        let limiter = OutputLimiter::new(1024, 2);
        let items = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let result = limiter.truncate_items(items);
        assert_eq!(result.len(), 3);
        assert!(result.last().unwrap().contains("truncated"));
        assert!(result.last().unwrap().contains('3'));
    }

    #[test]
    fn sanitize_js_identifier_replaces_invalid_chars() {
        assert_eq!(sanitize_js_identifier("toolu_01AbC-23"), "toolu_01AbC_23");
        assert_eq!(sanitize_js_identifier("a.b/c d"), "a_b_c_d");
        assert_eq!(sanitize_js_identifier("$valid_99"), "$valid_99");
    }
}
