// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

/// The closed set of prepositions the command parser recognises, grouped by equivalence the way
/// the classic servers group them.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Preposition {
    WithUsing,
    AtTo,
    InFrontOf,
    IntoIn,
    OnTopOfOn,
    OutOf,
    Over,
    Through,
    Under,
    Behind,
    Beside,
    ForAbout,
    As,
    OffOf,
}

/// Longest multi-word form in the table ("in front of", "on top of").
const MAX_PREP_WORDS: usize = 3;

impl Preposition {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "with" | "using" => Some(Self::WithUsing),
            "at" | "to" => Some(Self::AtTo),
            "in front of" => Some(Self::InFrontOf),
            "in" | "inside" | "into" => Some(Self::IntoIn),
            "on top of" | "on" | "onto" | "upon" => Some(Self::OnTopOfOn),
            "out of" | "from inside" | "from" => Some(Self::OutOf),
            "over" => Some(Self::Over),
            "through" => Some(Self::Through),
            "under" | "underneath" | "beneath" => Some(Self::Under),
            "behind" => Some(Self::Behind),
            "beside" => Some(Self::Beside),
            "for" | "about" => Some(Self::ForAbout),
            "as" => Some(Self::As),
            "off" | "off of" => Some(Self::OffOf),
            _ => None,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::WithUsing => "with/using",
            Self::AtTo => "at/to",
            Self::InFrontOf => "in front of",
            Self::IntoIn => "in/inside/into",
            Self::OnTopOfOn => "on top of/on/onto/upon",
            Self::OutOf => "out of/from inside/from",
            Self::Over => "over",
            Self::Through => "through",
            Self::Under => "under/underneath/beneath",
            Self::Behind => "behind",
            Self::Beside => "beside",
            Self::ForAbout => "for/about",
            Self::As => "as",
            Self::OffOf => "off/off of",
        }
    }
}

/// A preposition located in a word list: which words it spans, and the text as typed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PrepMatch {
    pub index: usize,
    pub word_count: usize,
    pub prep: Preposition,
    pub text: String,
}

/// Find the first preposition in a word list, preferring the longest form at each position so
/// that "in front of" wins over "in".
pub fn seek_preposition(words: &[String]) -> Option<PrepMatch> {
    for index in 0..words.len() {
        let max_len = MAX_PREP_WORDS.min(words.len() - index);
        for word_count in (1..=max_len).rev() {
            let candidate = words[index..index + word_count].join(" ").to_lowercase();
            if let Some(prep) = Preposition::parse(&candidate) {
                return Some(PrepMatch {
                    index,
                    word_count,
                    prep,
                    text: words[index..index + word_count].join(" "),
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_parse_single_words() {
        assert_eq!(Preposition::parse("with"), Some(Preposition::WithUsing));
        assert_eq!(Preposition::parse("to"), Some(Preposition::AtTo));
        assert_eq!(Preposition::parse("beneath"), Some(Preposition::Under));
        assert_eq!(Preposition::parse("rock"), None);
    }

    #[test]
    fn test_seek_simple() {
        let m = seek_preposition(&words("rock in box")).unwrap();
        assert_eq!(m.index, 1);
        assert_eq!(m.word_count, 1);
        assert_eq!(m.prep, Preposition::IntoIn);
        assert_eq!(m.text, "in");
    }

    #[test]
    fn test_seek_prefers_longest_form() {
        let m = seek_preposition(&words("rock in front of box")).unwrap();
        assert_eq!(m.index, 1);
        assert_eq!(m.word_count, 3);
        assert_eq!(m.prep, Preposition::InFrontOf);
        assert_eq!(m.text, "in front of");
    }

    #[test]
    fn test_seek_off_of() {
        let m = seek_preposition(&words("dust off of mantle")).unwrap();
        assert_eq!(m.index, 1);
        assert_eq!(m.word_count, 2);
        assert_eq!(m.prep, Preposition::OffOf);
    }

    #[test]
    fn test_seek_none() {
        assert_eq!(seek_preposition(&words("red rubber ball")), None);
        assert_eq!(seek_preposition(&[]), None);
    }

    #[test]
    fn test_seek_ignores_numeric_words() {
        // A numeric first argument must not be confused with a preposition.
        assert_eq!(seek_preposition(&words("1")), None);
    }
}
