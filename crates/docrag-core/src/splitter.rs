//! Recursive, boundary-aware text splitter.
//!
//! Text is cut at the highest-priority boundary present: paragraph (`\n\n`),
//! then line (`\n`), then word (` `), then single characters. Pieces are
//! greedily merged back into windows of at most `length` characters, and each
//! new window starts with up to `overlap` characters carried over from the
//! previous one.

use std::collections::VecDeque;

use crate::config::ChunkingConfig;
use crate::error::Result;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    length: usize,
    overlap: usize,
}

impl TextSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { length: config.length, overlap: config.overlap })
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, &SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, finer) = pick_separator(text, separators);
        let pieces = split_pieces(text, separator);

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) < self.length {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending, separator));
                pending.clear();
            }
            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_with(piece, finer));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending, separator));
        }
        chunks
    }

    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut out = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joiner = if window.is_empty() { 0 } else { sep_len };
            if total + len + joiner > self.length && !window.is_empty() {
                push_window(&mut out, &window, separator);
                // Drop from the front until what remains fits as overlap and
                // leaves room for the incoming piece.
                loop {
                    let joiner = if window.is_empty() { 0 } else { sep_len };
                    let too_long = total > 0 && total + len + joiner > self.length;
                    if total <= self.overlap && !too_long {
                        break;
                    }
                    let Some(first) = window.pop_front() else { break };
                    let joined = if window.is_empty() { 0 } else { sep_len };
                    total -= char_len(first) + joined;
                }
            }
            total += len + if window.is_empty() { 0 } else { sep_len };
            window.push_back(piece);
        }
        push_window(&mut out, &window, separator);
        out
    }
}

fn pick_separator<'a, 's>(text: &str, separators: &'s [&'a str]) -> (&'a str, &'s [&'a str]) {
    for (i, &sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

fn split_pieces<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect()
    } else {
        text.split(separator).filter(|s| !s.is_empty()).collect()
    }
}

fn push_window(out: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(length: usize, overlap: usize) -> TextSplitter {
        TextSplitter::new(ChunkingConfig { length, overlap }).expect("valid config")
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = splitter(100, 10).split("Corrosive PPE requires gloves and goggles.");
        assert_eq!(chunks, vec!["Corrosive PPE requires gloves and goggles."]);
    }

    #[test]
    fn empty_and_blank_text_produce_nothing() {
        assert!(splitter(100, 10).split("").is_empty());
        assert!(splitter(100, 10).split(" \n\n \n").is_empty());
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let text = "first paragraph here\n\nsecond paragraph here";
        let chunks = splitter(25, 0).split(text);
        assert_eq!(chunks, vec!["first paragraph here", "second paragraph here"]);
    }

    #[test]
    fn falls_back_to_lines_then_words() {
        let text = "alpha beta gamma delta\nepsilon zeta";
        let chunks = splitter(12, 0).split(text);
        assert_eq!(chunks, vec!["alpha beta", "gamma delta", "epsilon zeta"]);
    }

    #[test]
    fn falls_back_to_characters_without_boundaries() {
        let text = "abcdefghij";
        let chunks = splitter(4, 1).split(text);
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn no_chunk_exceeds_window_length() {
        let text = "lorem ipsum dolor sit amet ".repeat(40)
            + "\n\n"
            + &"x".repeat(250)
            + "\nshort line\n\nthe end";
        for (length, overlap) in [(50, 10), (64, 0), (100, 99), (7, 3)] {
            for chunk in splitter(length, overlap).split(&text) {
                assert!(chunk.chars().count() <= length, "{} > {}", chunk.chars().count(), length);
                assert!(!chunk.is_empty());
            }
        }
    }

    #[test]
    fn consecutive_word_windows_overlap() {
        let text = (0..40).map(|i| format!("w{i:02}")).collect::<Vec<_>>().join(" ");
        let chunks = splitter(30, 10).split(&text);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let last_word = pair[0].split(' ').last().expect("word");
            assert!(pair[1].starts_with(last_word) || pair[1].contains(last_word), "{:?}", pair);
        }
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let text = "äöüß".repeat(10);
        let chunks = splitter(6, 2).split(&text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 6));
        assert_eq!(chunks[0], "äöüßäö");
    }
}
