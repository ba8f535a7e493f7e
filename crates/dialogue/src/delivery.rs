//! Reply formatting helpers: splitting long replies into chat lines and
//! picking the sentences worth archiving.

/// Longest chat line sent when splitting is enabled.
pub const MAX_LINE_CHARS: usize = 256;

/// Shortest sentence kept when archiving a reply.
pub const MIN_ARCHIVED_SENTENCE_CHARS: usize = 15;

/// Split text into sentences, keeping terminal punctuation. A sentence ends
/// at `.`, `!` or `?` followed by whitespace or the end of the text.
pub fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let terminal = matches!(c, '.' | '!' | '?');
        let boundary = chars.peek().is_none_or(|next| next.is_whitespace());
        if terminal && boundary {
            let sentence = current.trim();
            if !sentence.is_empty() {
                out.push(sentence.to_string());
            }
            current.clear();
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        out.push(rest.to_string());
    }
    out
}

/// Sentences of at least `min_chars` characters.
pub fn filter_short_sentences(text: &str, min_chars: usize) -> Vec<String> {
    sentences(text)
        .into_iter()
        .filter(|s| s.chars().count() >= min_chars)
        .collect()
}

/// Break a reply into lines of at most `max_chars` characters, packing whole
/// sentences where possible and hard-wrapping on whitespace otherwise.
pub fn split_long_message(text: &str, max_chars: usize) -> Vec<String> {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();

    for sentence in sentences(text) {
        for piece in wrap(&sentence, max_chars) {
            let joined = current.chars().count() + 1 + piece.chars().count();
            if current.is_empty() {
                current = piece;
            } else if joined <= max_chars {
                current.push(' ');
                current.push_str(&piece);
            } else {
                lines.push(std::mem::replace(&mut current, piece));
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Wrap one sentence on whitespace. Words longer than a line are cut.
fn wrap(sentence: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut line = String::new();

    for word in sentence.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > max_chars {
            if !line.is_empty() {
                out.push(std::mem::take(&mut line));
            }
            let cut: String = word.chars().take(max_chars).collect();
            word = word.chars().skip(max_chars).collect();
            out.push(cut);
        }

        if line.is_empty() {
            line = word;
        } else if line.chars().count() + 1 + word.chars().count() <= max_chars {
            line.push(' ');
            line.push_str(&word);
        } else {
            out.push(std::mem::replace(&mut line, word));
        }
    }
    if !line.is_empty() {
        out.push(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentences_keep_punctuation() {
        assert_eq!(
            sentences("Hi! The forge is hot. Need a blade?"),
            vec!["Hi!", "The forge is hot.", "Need a blade?"]
        );
    }

    #[test]
    fn decimals_do_not_split() {
        assert_eq!(sentences("It costs 2.5 emeralds."), vec!["It costs 2.5 emeralds."]);
    }

    #[test]
    fn short_sentences_are_filtered() {
        let kept = filter_short_sentences(
            "Aye. The northern mines are full of iron ore. Go!",
            MIN_ARCHIVED_SENTENCE_CHARS,
        );
        assert_eq!(kept, vec!["The northern mines are full of iron ore."]);
        assert!(filter_short_sentences("Ok. Sure.", MIN_ARCHIVED_SENTENCE_CHARS).is_empty());
    }

    #[test]
    fn short_message_is_one_line() {
        assert_eq!(split_long_message("  Hello there.  ", 256), vec!["Hello there."]);
    }

    #[test]
    fn long_message_splits_on_sentences() {
        let text = "First sentence here. Second sentence here. Third one.";
        let lines = split_long_message(text, 25);
        assert_eq!(
            lines,
            vec!["First sentence here.", "Second sentence here.", "Third one."]
        );
    }

    #[test]
    fn packs_sentences_up_to_limit() {
        let lines = split_long_message("One. Two. Three. Four.", 10);
        assert_eq!(lines, vec!["One. Two.", "Three.", "Four."]);
    }

    #[test]
    fn overlong_sentence_wraps_on_whitespace() {
        let sentence = "word ".repeat(80);
        let lines = split_long_message(&sentence, MAX_LINE_CHARS);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= MAX_LINE_CHARS));
        assert!(lines.iter().all(|l| !l.starts_with(' ') && !l.ends_with(' ')));
    }

    #[test]
    fn unbroken_word_is_cut() {
        let lines = split_long_message(&"x".repeat(30), 12);
        assert_eq!(lines, vec!["x".repeat(12), "x".repeat(12), "x".repeat(6)]);
    }
}
