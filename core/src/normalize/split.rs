//! Bracket- and quote-aware scanning for compound field text.

fn closing_quote(c: char, prev: Option<char>) -> Option<char> {
    match c {
        '"' => Some('"'),
        '\u{201C}' => Some('\u{201D}'),
        '\u{2018}' => Some('\u{2019}'),
        // apostrophes inside words ("driver's") never open a quote
        '\'' => match prev {
            None => Some('\''),
            Some(p) if p.is_whitespace() || is_open_bracket(p) => Some('\''),
            _ => None,
        },
        _ => None,
    }
}

fn is_open_bracket(c: char) -> bool {
    matches!(c, '(' | '[' | '{' | '\u{FF08}' | '\u{3010}' | '\u{300C}')
}

fn is_close_bracket(c: char) -> bool {
    matches!(c, ')' | ']' | '}' | '\u{FF09}' | '\u{3011}' | '\u{300D}')
}

fn scan(text: &str, honor_quotes: bool) -> (Vec<(usize, char)>, bool) {
    let mut out = Vec::new();
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;

    for (offset, c) in text.char_indices() {
        if let Some(close) = quote {
            if c == close {
                quote = None;
            }
            prev = Some(c);
            continue;
        }
        if honor_quotes {
            if let Some(close) = closing_quote(c, prev) {
                quote = Some(close);
                prev = Some(c);
                continue;
            }
        }
        if is_open_bracket(c) {
            depth += 1;
        } else if is_close_bracket(c) {
            depth = depth.saturating_sub(1);
        } else if depth == 0 {
            out.push((offset, c));
        }
        prev = Some(c);
    }
    (out, quote.is_none())
}

/// Characters of `text` that sit at bracket depth 0 and outside quotes, with
/// their byte offsets. An unterminated quote is treated as literal text.
pub fn top_level_chars(text: &str) -> Vec<(usize, char)> {
    let (chars, balanced) = scan(text, true);
    if balanced {
        chars
    } else {
        scan(text, false).0
    }
}

/// Split compound text on top-level commas (ASCII and full-width).
pub fn split_compound(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (offset, c) in top_level_chars(text) {
        if c == ',' || c == '\u{FF0C}' {
            parts.push(&text[start..offset]);
            start = offset + c.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn comma_inside_parentheses_is_not_a_separator() {
        assert_eq!(split_compound("A(x, y), B"), vec!["A(x, y)", "B"]);
    }

    #[test]
    fn nested_and_fullwidth_brackets() {
        assert_eq!(
            split_compound("BMS [cell (1, 2)], VCU（주행, 정차）， MCU"),
            vec!["BMS [cell (1, 2)]", "VCU（주행, 정차）", "MCU"]
        );
    }

    #[test]
    fn quoted_commas_are_kept() {
        assert_eq!(
            split_compound("\"open, then close\", 'a, b', c"),
            vec!["\"open, then close\"", "'a, b'", "c"]
        );
    }

    #[test]
    fn apostrophe_inside_word_does_not_open_quote() {
        assert_eq!(
            split_compound("driver's seat, passenger's seat"),
            vec!["driver's seat", "passenger's seat"]
        );
    }

    #[test]
    fn unterminated_quote_falls_back_to_plain_split() {
        assert_eq!(split_compound("\"a, b"), vec!["\"a", "b"]);
    }

    #[test]
    fn empty_segments_are_dropped() {
        assert_eq!(split_compound(" , A,, B ,"), vec!["A", "B"]);
        assert!(split_compound("   ").is_empty());
    }

    #[test]
    fn unbalanced_close_does_not_underflow() {
        assert_eq!(split_compound("a), b"), vec!["a)", "b"]);
    }

    proptest! {
        #[test]
        fn joined_plain_items_split_back(items in proptest::collection::vec("[A-Za-z0-9가-힣]{1,8}( [A-Za-z0-9]{1,4})?", 1..6)) {
            let joined = items.join(", ");
            prop_assert_eq!(split_compound(&joined), items);
        }

        #[test]
        fn split_items_never_contain_top_level_commas(text in "[a-z(), ]{0,24}") {
            for part in split_compound(&text) {
                prop_assert_eq!(split_compound(&part), vec![part.clone()]);
            }
        }
    }
}
