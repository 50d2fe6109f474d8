//! Command line tokenization
//!
//! The grammar is plain: tokens are separated by runs of [`DELIMITER`], and
//! a bounded split lets the final token keep the rest of the line verbatim.
//! There is no quoting or escaping.

/// Token separator.
pub const DELIMITER: char = ' ';

/// Split `text` into at most `max` tokens; `max == 0` means unbounded.
///
/// Runs of delimiters count as one separator and leading delimiters are
/// skipped. When the limit is reached the last token holds everything left,
/// including inner and trailing delimiters. No token is ever empty.
pub fn split_bounded(text: &str, max: usize) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = text.trim_start_matches(DELIMITER);

    while !rest.is_empty() {
        if max != 0 && tokens.len() + 1 == max {
            tokens.push(rest);
            break;
        }
        match rest.find(DELIMITER) {
            Some(end) => {
                tokens.push(&rest[..end]);
                rest = rest[end..].trim_start_matches(DELIMITER);
            }
            None => {
                tokens.push(rest);
                break;
            }
        }
    }

    tokens
}

/// Split a command line into its command name and the remaining text.
///
/// Returns `None` for blank input. The remainder is empty when the line
/// holds a single token.
pub fn split_command(text: &str) -> Option<(&str, &str)> {
    let tokens = split_bounded(text, 2);
    let name = *tokens.first()?;
    Some((name, tokens.get(1).copied().unwrap_or("")))
}

/// Split parameter text into exactly `arity` tokens.
///
/// Returns `None` when the text yields a different number of tokens; for
/// arity 0 that means any non-blank text.
pub fn tokenize_params(text: &str, arity: usize) -> Option<Vec<&str>> {
    let tokens = split_bounded(text, arity);
    (tokens.len() == arity).then_some(tokens)
}

/// Extend a dispatch path by one segment.
pub fn join_path(path: &str, segment: &str) -> String {
    format!("{path} {segment}").trim().to_string()
}
