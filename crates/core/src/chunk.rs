//! Line-respecting message splitting for length-limited platforms.

/// Split `text` into a head of at most `max` characters and the remainder.
///
/// Whole lines are accumulated into the head greedily and the newline at the
/// cut is dropped. When the whole lines that fit hold only whitespace (a first
/// line longer than `max`, or blank lines before one) the text is cut hard at
/// `max` characters. Returns `None` as the remainder when `text` already fits.
#[must_use]
pub fn split_message(text: &str, max: usize) -> (String, Option<String>) {
    if max == 0 || text.chars().count() <= max {
        return (text.to_string(), None);
    }

    let mut head_end = 0;
    let mut head_chars = 0;
    let mut offset = 0;
    let mut taken = 0;

    for line in text.split('\n') {
        let line_chars = line.chars().count();
        let joined = if taken == 0 {
            line_chars
        } else {
            head_chars + 1 + line_chars
        };
        if joined > max {
            break;
        }
        head_chars = joined;
        head_end = offset + line.len();
        offset = head_end + 1;
        taken += 1;
    }

    if text[..head_end].trim().is_empty() {
        let cut = text
            .char_indices()
            .nth(max)
            .map_or(text.len(), |(i, _)| i);
        return (text[..cut].to_string(), Some(text[cut..].to_string()));
    }

    let rest = text.get(head_end + 1..).unwrap_or_default();
    (
        text[..head_end].to_string(),
        (!rest.is_empty()).then(|| rest.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(count: usize, width: usize) -> String {
        (0..count)
            .map(|i| {
                let c = char::from(b'a' + (i % 26) as u8);
                std::iter::repeat_n(c, width).collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_short_message_is_untouched() {
        let (head, rest) = split_message("hello\nworld", 2000);
        assert_eq!(head, "hello\nworld");
        assert!(rest.is_none());
    }

    #[test]
    fn test_3500_chars_split_on_line_boundary() {
        let text = format!("{}\n", lines(35, 99));
        assert_eq!(text.chars().count(), 3500);

        let (head, rest) = split_message(&text, 2000);
        let rest = rest.unwrap_or_default();

        assert!(head.chars().count() <= 2000);
        assert_eq!(head.chars().count(), 1999);
        assert!(text.starts_with(&format!("{head}\n")));
        assert!(head.lines().all(|l| l.len() == 99));
        assert_eq!(format!("{head}\n{rest}"), text);
    }

    #[test]
    fn test_remainder_may_need_another_split() {
        let text = lines(50, 99);
        let (_, rest) = split_message(&text, 2000);
        let rest = rest.unwrap_or_default();
        assert!(rest.chars().count() > 2000);

        let (second, third) = split_message(&rest, 2000);
        assert!(second.chars().count() <= 2000);
        assert!(third.is_some());
    }

    #[test]
    fn test_overlong_single_line_is_hard_cut() {
        let text = "x".repeat(2500);
        let (head, rest) = split_message(&text, 2000);
        assert_eq!(head.len(), 2000);
        assert_eq!(rest.as_deref().map(str::len), Some(500));
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = format!("{}\n{}", "é".repeat(8), "ü".repeat(8));
        let (head, rest) = split_message(&text, 10);
        assert_eq!(head, "é".repeat(8));
        assert_eq!(rest.as_deref(), Some("ü".repeat(8).as_str()));
    }

    #[test]
    fn test_exact_fit_then_trailing_newline() {
        let text = format!("{}\n", "y".repeat(10));
        let (head, rest) = split_message(&text, 10);
        assert_eq!(head, "y".repeat(10));
        assert!(rest.is_none());
    }

    #[test]
    fn test_blank_first_line_before_overlong_line_is_hard_cut() {
        let text = format!("\n{}", "x".repeat(3000));
        let (head, rest) = split_message(&text, 2000);
        assert_eq!(head.chars().count(), 2000);
        assert!(!head.trim().is_empty());
        assert_eq!(format!("{head}{}", rest.unwrap_or_default()), text);
    }
}
