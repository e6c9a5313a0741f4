//! Comma-delimited text codec
//!
//! Line-oriented: one record per line. A field containing the delimiter or
//! the quote character is wrapped in quotes with inner quotes doubled.
//! Line breaks inside a value are flattened to a single space on write.

use std::borrow::Cow;
use thiserror::Error;

pub const DELIMITER: char = ',';
pub const QUOTE: char = '"';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unterminated quoted field")]
    UnterminatedQuote,
}

/// Quote a single field if it needs it
pub fn escape_field(value: &str) -> Cow<'_, str> {
    let value = if value.contains(['\r', '\n']) {
        Cow::Owned(flatten_line_breaks(value))
    } else {
        Cow::Borrowed(value)
    };

    if !value.contains([DELIMITER, QUOTE]) {
        return value;
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push(QUOTE);
    for c in value.chars() {
        if c == QUOTE {
            quoted.push(QUOTE);
        }
        quoted.push(c);
    }
    quoted.push(QUOTE);
    Cow::Owned(quoted)
}

fn flatten_line_breaks(value: &str) -> String {
    value.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// Join already-rendered values into one delimited line (no terminator)
pub fn format_record<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = String::new();
    for (i, value) in values.into_iter().enumerate() {
        if i > 0 {
            line.push(DELIMITER);
        }
        line.push_str(&escape_field(value.as_ref()));
    }
    line
}

/// Split one line into fields.
///
/// The quote character toggles quoted mode wherever it appears; a doubled
/// quote inside quoted mode yields one literal quote. Delimiters inside
/// quoted mode are literal.
pub fn parse_line(line: &str) -> Result<Vec<String>, ParseError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            QUOTE if in_quotes && chars.peek() == Some(&QUOTE) => {
                current.push(QUOTE);
                chars.next();
            }
            QUOTE => in_quotes = !in_quotes,
            DELIMITER if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if in_quotes {
        return Err(ParseError::UnterminatedQuote);
    }

    fields.push(current);
    Ok(fields)
}

/// Non-blank lines of a file, without line terminators
pub fn lines(content: &str) -> impl Iterator<Item = &str> {
    content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(values: &[&str]) -> Vec<String> {
        parse_line(&format_record(values)).unwrap()
    }

    #[test]
    fn test_plain_values_are_not_quoted() {
        assert_eq!(format_record(["1", "Intro to X", "ACME"]), "1,Intro to X,ACME");
    }

    #[test]
    fn test_comma_and_quote_escaping() {
        assert_eq!(escape_field("My, \"Great\" Book"), "\"My, \"\"Great\"\" Book\"");
        assert_eq!(
            parse_line("\"My, \"\"Great\"\" Book\"").unwrap(),
            vec!["My, \"Great\" Book"]
        );
    }

    #[test]
    fn test_round_trip_preserves_awkward_values() {
        let values = [
            "plain",
            "has, comma",
            "has \"quote\"",
            "both, \"of\" them",
            "",
            "\"\"",
            ",",
        ];
        assert_eq!(round_trip(&values), values);
    }

    #[test]
    fn test_empty_fields() {
        assert_eq!(parse_line("").unwrap(), vec![""]);
        assert_eq!(parse_line("a,,b,").unwrap(), vec!["a", "", "b", ""]);
    }

    #[test]
    fn test_quote_toggles_mid_field() {
        assert_eq!(parse_line("ab\"c,d\"e,f").unwrap(), vec!["abc,de", "f"]);
    }

    #[test]
    fn test_unterminated_quote_is_an_error() {
        assert_eq!(
            parse_line("1,\"open ended,2"),
            Err(ParseError::UnterminatedQuote)
        );
    }

    #[test]
    fn test_line_breaks_are_flattened() {
        assert_eq!(escape_field("line one\r\nline two\nthree"), "line one line two three");
        assert_eq!(round_trip(&["a\nb, c"]), vec!["a b, c"]);
    }

    #[test]
    fn test_lines_skip_blanks_and_carriage_returns() {
        let content = "h1,h2\r\n\r\na,b\n   \nc,d";
        assert_eq!(lines(content).collect::<Vec<_>>(), vec!["h1,h2", "a,b", "c,d"]);
    }
}
