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

use crate::matching::prepositions::seek_preposition;
use crate::matching::{ObjectNameMatcher, ParseCommandError, ParsedCommand};
use crate::util::parse_into_words;

/// Split a raw command line into verb / direct object / preposition / indirect object, resolving
/// the object strings in the invoker's environment.
pub fn parse_command<M: ObjectNameMatcher>(
    input: &str,
    env: &M,
) -> Result<ParsedCommand, ParseCommandError> {
    let command = input.trim();
    if parse_into_words(command).is_empty() {
        return Err(ParseCommandError::EmptyCommand);
    }

    // Split into verb and argument string at the first space.
    let mut parts = command.splitn(2, ' ');
    let verb = parts.next().unwrap_or_default().to_string();
    let argstr = parts.next().unwrap_or_default().to_string();

    let words = parse_into_words(&argstr);

    let prep_match = seek_preposition(&words);

    let dobjstr = match &prep_match {
        Some(m) => {
            if m.index == 0 {
                None
            } else {
                Some(words[0..m.index].join(" "))
            }
        }
        None => {
            if words.is_empty() {
                None
            } else {
                Some(words.join(" "))
            }
        }
    };
    let dobj = match &dobjstr {
        Some(dobjstr) => env
            .match_object(dobjstr)
            .map_err(ParseCommandError::ErrorDuringMatch)?,
        None => None,
    };

    let iobjstr = prep_match
        .as_ref()
        .map(|m| words[m.index + m.word_count..].join(" "));
    let iobj = match &iobjstr {
        Some(iobjstr) => env
            .match_object(iobjstr)
            .map_err(ParseCommandError::ErrorDuringMatch)?,
        None => None,
    };

    Ok(ParsedCommand {
        verb,
        argstr,
        args: words,
        dobjstr,
        dobj,
        prepstr: prep_match.as_ref().map(|m| m.text.clone()),
        prep: prep_match.map(|m| m.prep),
        iobjstr,
        iobj,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::Preposition;
    use crate::matching::match_env::DefaultObjectMatcher;
    use crate::matching::mock_matching_env::{
        MOCK_BALL1, MOCK_PLAYER, MOCK_ROOM1, MOCK_THING1, MOCK_THING2, setup_mock_environment,
    };
    use crate::model::WorldError;
    use crate::{AMBIGUOUS, DbRef, FAILED_MATCH};
    use pretty_assertions::assert_eq;

    struct SimpleParseMatcher {}
    impl ObjectNameMatcher for SimpleParseMatcher {
        fn match_object(&self, name: &str) -> Result<Option<DbRef>, WorldError> {
            Ok(match name {
                "rock" => Some(DbRef::mk(1)),
                "box" => Some(DbRef::mk(2)),
                _ => None,
            })
        }
    }

    #[test]
    fn test_parse_single_arg_command() {
        let parsed = parse_command("look rock", &SimpleParseMatcher {}).unwrap();
        assert_eq!(parsed.verb, "look");
        assert_eq!(parsed.dobjstr, Some("rock".to_string()));
        assert_eq!(parsed.dobj, Some(DbRef::mk(1)));
        assert_eq!(parsed.prepstr, None);
        assert_eq!(parsed.prep, None);
        assert_eq!(parsed.iobjstr, None);
        assert_eq!(parsed.iobj, None);
        assert_eq!(parsed.args, vec!["rock"]);
        assert_eq!(parsed.argstr, "rock");
    }

    #[test]
    fn test_parse_dobj_prep_iobj_command() {
        let parsed = parse_command("put rock in box", &SimpleParseMatcher {}).unwrap();
        assert_eq!(parsed.verb, "put");
        assert_eq!(parsed.dobjstr, Some("rock".to_string()));
        assert_eq!(parsed.dobj, Some(DbRef::mk(1)));
        assert_eq!(parsed.prepstr, Some("in".to_string()));
        assert_eq!(parsed.prep, Some(Preposition::IntoIn));
        assert_eq!(parsed.iobjstr, Some("box".to_string()));
        assert_eq!(parsed.iobj, Some(DbRef::mk(2)));
        assert_eq!(parsed.args, vec!["rock", "in", "box"]);
    }

    #[test]
    fn test_parse_leading_preposition() {
        // The first token is already a preposition, so there is no direct object string.
        let parsed = parse_command("look at rock in box", &SimpleParseMatcher {}).unwrap();
        assert_eq!(parsed.verb, "look");
        assert_eq!(parsed.dobjstr, None);
        assert_eq!(parsed.dobj, None);
        assert_eq!(parsed.prepstr, Some("at".to_string()));
        assert_eq!(parsed.prep, Some(Preposition::AtTo));
        assert_eq!(parsed.iobjstr, Some("rock in box".to_string()));
    }

    #[test]
    fn test_parse_multiword_preposition() {
        let parsed =
            parse_command("wave wand in front of mirror", &SimpleParseMatcher {}).unwrap();
        assert_eq!(parsed.dobjstr, Some("wand".to_string()));
        assert_eq!(parsed.prepstr, Some("in front of".to_string()));
        assert_eq!(parsed.prep, Some(Preposition::InFrontOf));
        assert_eq!(parsed.iobjstr, Some("mirror".to_string()));
    }

    #[test]
    fn test_parse_quoted_arg_command() {
        let parsed = parse_command("say \"hello, world!\"", &SimpleParseMatcher {}).unwrap();
        assert_eq!(parsed.verb, "say");
        assert_eq!(parsed.dobjstr, Some("hello, world!".to_string()));
        assert_eq!(parsed.args, vec!["hello, world!"]);
        assert_eq!(parsed.argstr, "\"hello, world!\"");
    }

    #[test]
    fn test_parse_empty_command() {
        assert_eq!(
            parse_command("   ", &SimpleParseMatcher {}),
            Err(ParseCommandError::EmptyCommand)
        );
    }

    #[test]
    fn test_parse_with_environment_matcher() {
        let env = setup_mock_environment();
        let matcher = DefaultObjectMatcher::new(&env, Some(MOCK_PLAYER), MOCK_ROOM1);

        let parsed = parse_command("get thing1", &matcher).unwrap();
        assert_eq!(parsed.dobj, Some(MOCK_THING1));

        let parsed = parse_command("put thing1 in t2", &matcher).unwrap();
        assert_eq!(parsed.dobj, Some(MOCK_THING1));
        assert_eq!(parsed.prep, Some(Preposition::IntoIn));
        assert_eq!(parsed.iobj, Some(MOCK_THING2));

        let parsed = parse_command("look ball", &matcher).unwrap();
        assert_eq!(parsed.dobj, Some(AMBIGUOUS));

        let parsed = parse_command("look #6", &matcher).unwrap();
        assert_eq!(parsed.dobj, Some(MOCK_BALL1));
    }

    #[test]
    fn test_parse_unmatched_is_failed_match() {
        let env = setup_mock_environment();
        let matcher = DefaultObjectMatcher::new(&env, Some(MOCK_PLAYER), MOCK_ROOM1);
        let parsed = parse_command("ins 1", &matcher).unwrap();
        assert_eq!(parsed.verb, "ins");
        assert_eq!(parsed.prep, None);
        assert_eq!(parsed.dobjstr, Some("1".to_string()));
        assert_eq!(parsed.dobj, Some(FAILED_MATCH));
    }
}
