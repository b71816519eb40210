#![forbid(unsafe_code)]

/// POSIX single-quote `value`; embedded quotes become `'\''`.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_plain_and_embedded_quotes() {
        assert_eq!(shell_quote("/tmp/repo"), "'/tmp/repo'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("a b$c"), "'a b$c'");
    }
}
