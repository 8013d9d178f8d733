use std::fmt;

/// Punctuation marks that get their own token and pause/typo treatment.
pub const PUNCTUATION: [char; 6] = [',', '.', '!', '?', ';', ':'];

pub fn is_punctuation(c: char) -> bool {
    PUNCTUATION.contains(&c)
}

/// Sentence-ending marks get longer pauses than clause separators.
pub fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\'' || c == '_'
}

/// One typed unit of the input text.
///
/// Concatenating the tokens of a text in order reproduces the text exactly;
/// the session relies on that to guarantee the net visible result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Run of letters, digits, apostrophes, or underscores. Case preserved.
    Word(String),
    /// A single mark from [`PUNCTUATION`].
    Punct(char),
    /// Any other single character (whitespace, symbols), passed through verbatim.
    Other(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(word) => f.write_str(word),
            Token::Punct(c) | Token::Other(c) => write!(f, "{c}"),
        }
    }
}

/// Normalize line endings (`\r\n` and bare `\r` become `\n`). Applied before
/// tokenization so the round-trip contract is stated over normalized text.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Split text into words, punctuation marks, and verbatim other characters.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if is_word_char(c) {
            current.push(c);
            continue;
        }

        if !current.is_empty() {
            tokens.push(Token::Word(std::mem::take(&mut current)));
        }

        if is_punctuation(c) {
            tokens.push(Token::Punct(c));
        } else {
            tokens.push(Token::Other(c));
        }
    }

    if !current.is_empty() {
        tokens.push(Token::Word(current));
    }

    tokens
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn reassemble(tokens: &[Token]) -> String {
        tokens.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn splits_words_punctuation_and_whitespace() {
        let tokens = tokenize("Hi, there!");
        assert_eq!(
            tokens,
            vec![
                Token::Word("Hi".into()),
                Token::Punct(','),
                Token::Other(' '),
                Token::Word("there".into()),
                Token::Punct('!'),
            ]
        );
    }

    #[test]
    fn apostrophes_and_underscores_stay_inside_words() {
        let tokens = tokenize("don't snake_case");
        assert_eq!(
            tokens,
            vec![
                Token::Word("don't".into()),
                Token::Other(' '),
                Token::Word("snake_case".into()),
            ]
        );
    }

    #[test]
    fn round_trip_reproduces_the_input() {
        let inputs = [
            "",
            "word",
            "Hello, world! How's it going?\nSecond line; with: marks.",
            "  leading and   multiple spaces ",
            "digits 123 mixed42with letters",
            "symbols *&^% and (parens) [brackets]",
            "trailing punctuation!",
            "\n\nblank\n\nlines\n",
        ];
        for input in inputs {
            assert_eq!(reassemble(&tokenize(input)), input, "input {input:?}");
        }
    }

    #[test]
    fn round_trip_after_line_ending_normalization() {
        let text = normalize_line_endings("a\r\nb\rc\n");
        assert_eq!(text, "a\nb\nc\n");
        assert_eq!(reassemble(&tokenize(&text)), text);
    }

    #[test]
    fn every_punctuation_mark_gets_its_own_token() {
        for c in PUNCTUATION {
            let tokens = tokenize(&format!("x{c}y"));
            assert_eq!(
                tokens,
                vec![
                    Token::Word("x".into()),
                    Token::Punct(c),
                    Token::Word("y".into()),
                ]
            );
        }
    }
}
