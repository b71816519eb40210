#![forbid(unsafe_code)]

/// Joins captured streams the way they are reported: stdout, then stderr, outer whitespace trimmed.
pub fn combine_streams(stdout: &str, stderr: &str) -> String {
    format!("{stdout}\n{stderr}").trim().to_string()
}

/// Keeps at most `max_lines` trailing lines of `text`. Line breaks are preserved as written.
pub fn tail_lines(text: &str, max_lines: usize) -> &str {
    if max_lines == 0 {
        return "";
    }
    let mut seen = 0usize;
    for (idx, byte) in text.bytes().enumerate().rev() {
        if byte == b'\n' {
            seen += 1;
            if seen == max_lines {
                return &text[idx + 1..];
            }
        }
    }
    text
}

/// Keeps at most `max_chars` trailing characters of `text`.
pub fn tail_chars(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return "";
    }
    match text.char_indices().rev().nth(max_chars - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// Line bound first, then character bound; both keep the suffix.
pub fn bound_output(text: &str, max_lines: usize, max_chars: usize) -> String {
    tail_chars(tail_lines(text, max_lines), max_chars).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_count(text: &str) -> usize {
        if text.is_empty() {
            0
        } else {
            text.split('\n').count()
        }
    }

    #[test]
    fn combine_trims_outer_whitespace() {
        assert_eq!(combine_streams("ok\n", ""), "ok");
        assert_eq!(combine_streams("", "boom\n"), "boom");
        assert_eq!(combine_streams("a", "b"), "a\nb");
    }

    #[test]
    fn tail_lines_keeps_suffix() {
        let text = "one\ntwo\nthree\nfour";
        assert_eq!(tail_lines(text, 2), "three\nfour");
        assert_eq!(tail_lines(text, 4), text);
        assert_eq!(tail_lines(text, 10), text);
        assert_eq!(tail_lines(text, 0), "");
    }

    #[test]
    fn tail_lines_preserves_crlf() {
        let text = "a\r\nb\r\nc";
        assert_eq!(tail_lines(text, 2), "b\r\nc");
    }

    #[test]
    fn tail_chars_respects_char_boundaries() {
        assert_eq!(tail_chars("héllo", 4), "éllo");
        assert_eq!(tail_chars("héllo", 10), "héllo");
        assert_eq!(tail_chars("héllo", 0), "");
        assert_eq!(tail_chars("日本語", 2), "本語");
    }

    #[test]
    fn bound_output_applies_both_limits_as_suffix() {
        let text = (1..=500)
            .map(|i| format!("line {i:03} {}", "x".repeat(40)))
            .collect::<Vec<_>>()
            .join("\n");
        for (max_lines, max_chars) in [(200, 12_000), (3, 12_000), (200, 100), (1, 5), (0, 50)] {
            let bounded = bound_output(&text, max_lines, max_chars);
            assert!(text.ends_with(&bounded), "must be an exact suffix");
            assert!(line_count(&bounded) <= max_lines);
            assert!(bounded.chars().count() <= max_chars);
        }
        assert!(bound_output(&text, 3, 12_000).starts_with("line 498"));
    }

    #[test]
    fn short_output_is_untouched() {
        assert_eq!(bound_output("all good", 200, 12_000), "all good");
        assert_eq!(bound_output("", 200, 12_000), "");
    }
}
