//! Splitting of raw command lines into tokens.
//!
//! There is no quoting or escaping: a delimiter inside quotes still splits.

use crate::vector::Vector;

/// Delimiter used for command lines and alias expansions.
pub const DELIMITER: char = ' ';

/// Split `line` on `delimiter`, left to right.
///
/// Runs of consecutive delimiters collapse, so the result never contains an
/// empty token.
pub fn split_into_tokens(line: &str, delimiter: char) -> Vector {
    line.split(delimiter)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_runs_collapse() {
        let tokens = split_into_tokens("ls  -la  /tmp", DELIMITER);
        assert_eq!(tokens.as_slice(), &["ls", "-la", "/tmp"]);
    }

    #[test]
    fn test_leading_and_trailing_delimiters() {
        let tokens = split_into_tokens("   echo hi   ", DELIMITER);
        assert_eq!(tokens.as_slice(), &["echo", "hi"]);
    }

    #[test]
    fn test_blank_line_has_no_tokens() {
        assert!(split_into_tokens("", DELIMITER).is_empty());
        assert!(split_into_tokens("    ", DELIMITER).is_empty());
    }

    #[test]
    fn test_quotes_do_not_group() {
        let tokens = split_into_tokens("echo 'a b'", DELIMITER);
        assert_eq!(tokens.as_slice(), &["echo", "'a", "b'"]);
    }

    #[test]
    fn test_operators_are_plain_tokens() {
        let tokens = split_into_tokens("cat < in.txt", DELIMITER);
        assert_eq!(tokens.as_slice(), &["cat", "<", "in.txt"]);
    }

    #[test]
    fn test_other_delimiter() {
        let tokens = split_into_tokens("a,,b,c", ',');
        assert_eq!(tokens.as_slice(), &["a", "b", "c"]);
    }
}
