//! Shell-style wildcard matching.
//!
//! Supported syntax:
//! - `*` matches any run of characters, including none
//! - `?` matches exactly one character
//! - `[abc]`, `[a-z]` match one character from the set; `[!abc]` matches one character outside it
//!
//! A `]` placed first in a set is literal, as is a `-` placed first or last. An unterminated `[` matches a literal `[`.
//! Every other character, regex metacharacters included, matches itself. Matching is case-sensitive and anchored at
//! both ends.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyChar,
    AnyRun,
    Class(CharClass),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassItem {
    Single(char),
    Range(char, char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CharClass {
    negated: bool,
    items: Vec<ClassItem>,
}

impl CharClass {
    fn contains(&self, c: char) -> bool {
        let hit = self.items.iter().any(|item| match *item {
            ClassItem::Single(s) => s == c,
            ClassItem::Range(lo, hi) => lo <= c && c <= hi,
        });
        hit != self.negated
    }
}

/// A compiled glob pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    source: String,
    tokens: Vec<Token>,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Self { Self { source: pattern.to_owned(), tokens: tokenize(pattern) } }

    pub fn as_str(&self) -> &str { &self.source }

    /// Run the pattern as a nondeterministic automaton over `text`.
    ///
    /// State `i` means the first `i` tokens have been satisfied. A `*` state loops on every character and also
    /// passes through to the next state without consuming anything.
    pub fn matches(&self, text: &str) -> bool {
        let accept = self.tokens.len();
        let mut current = vec![false; accept + 1];
        current[0] = true;
        self.follow_empty_runs(&mut current);

        for c in text.chars() {
            let mut next = vec![false; accept + 1];
            for (state, token) in self.tokens.iter().enumerate() {
                if !current[state] {
                    continue;
                }
                match token {
                    Token::Literal(l) if *l == c => next[state + 1] = true,
                    Token::AnyChar => next[state + 1] = true,
                    Token::AnyRun => next[state] = true,
                    Token::Class(class) if class.contains(c) => next[state + 1] = true,
                    _ => {}
                }
            }
            self.follow_empty_runs(&mut next);
            if !next.contains(&true) {
                return false;
            }
            current = next;
        }

        current[accept]
    }

    // States are visited in ascending order so consecutive `*` tokens chain in one pass.
    fn follow_empty_runs(&self, states: &mut [bool]) {
        for (state, token) in self.tokens.iter().enumerate() {
            if states[state] && *token == Token::AnyRun {
                states[state + 1] = true;
            }
        }
    }
}

impl From<&str> for GlobPattern {
    fn from(pattern: &str) -> Self { Self::new(pattern) }
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                if tokens.last() != Some(&Token::AnyRun) {
                    tokens.push(Token::AnyRun);
                }
                i += 1;
            }
            '?' => {
                tokens.push(Token::AnyChar);
                i += 1;
            }
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    tokens.push(Token::Class(parse_class(&chars[i + 1..end])));
                    i = end + 1;
                }
                None => {
                    tokens.push(Token::Literal('['));
                    i += 1;
                }
            },
            c => {
                tokens.push(Token::Literal(c));
                i += 1;
            }
        }
    }

    tokens
}

/// Index of the `]` closing the set opened at `open`, if there is one.
fn class_end(chars: &[char], open: usize) -> Option<usize> {
    let mut j = open + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    (j..chars.len()).find(|&k| chars[k] == ']')
}

fn parse_class(body: &[char]) -> CharClass {
    let (negated, body) = match body.split_first() {
        Some(('!', rest)) => (true, rest),
        _ => (false, body),
    };

    let mut items = Vec::new();
    let mut k = 0;
    while k < body.len() {
        if k + 2 < body.len() && body[k + 1] == '-' {
            items.push(ClassItem::Range(body[k], body[k + 2]));
            k += 3;
        } else {
            items.push(ClassItem::Single(body[k]));
            k += 1;
        }
    }

    CharClass { negated, items }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glob(pattern: &str, text: &str) -> bool { GlobPattern::new(pattern).matches(text) }

    #[test]
    fn test_literals_are_anchored() {
        assert!(glob("Obi-Wan", "Obi-Wan"));
        assert!(!glob("Obi", "Obi-Wan"));
        assert!(!glob("Wan", "Obi-Wan"));
        assert!(glob("", ""));
        assert!(!glob("", "x"));
    }

    #[test]
    fn test_star_and_question_mark() {
        assert!(glob("Ana*", "Anakin"));
        assert!(glob("*kin", "Anakin"));
        assert!(glob("A*a*n", "Anakin"));
        assert!(glob("*", ""));
        assert!(glob("**", "anything/at/all"));
        assert!(glob("?uke", "Luke"));
        assert!(!glob("?uke", "uke"));
        assert!(!glob("L?", "Luke"));
        assert!(glob("*a?i*", "Anakin"));
    }

    #[test]
    fn test_character_classes() {
        assert!(glob("[LD]uke", "Luke"));
        assert!(!glob("[LD]uke", "Puke"));
        assert!(glob("R[0-9]-D[0-9]", "R2-D2"));
        assert!(!glob("R[0-9]-D[0-9]", "RX-D2"));
        assert!(glob("[!a-z]*", "Yoda"));
        assert!(!glob("[!a-z]*", "yoda"));
        assert!(glob("[]]", "]"));
        assert!(glob("[!]]", "x"));
        assert!(glob("[a-]", "-"));
        assert!(glob("[-a]", "-"));
    }

    #[test]
    fn test_unterminated_class_is_literal() {
        assert!(glob("[abc", "[abc"));
        assert!(!glob("[abc", "a"));
        assert!(glob("a[", "a["));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        assert!(glob("a.c", "a.c"));
        assert!(!glob("a.c", "abc"));
        assert!(glob("(x|y)+$", "(x|y)+$"));
        assert!(!glob("^x", "x"));
    }

    #[test]
    fn test_case_sensitive_and_unicode() {
        assert!(!glob("luke", "Luke"));
        assert!(glob("Pad?é", "Padmé"));
        assert!(glob("[à-ü]*", "élan"));
    }
}
