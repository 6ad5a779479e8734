// Tally
// Copyright (C) 2025 Throneless Tech

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    CheckIn,
    JoinDate,
    Leaderboard,
}

impl Command {
    /// Match a message body against the three command tokens. Anything
    /// else is ignored without a reply.
    pub fn parse(text: &str) -> Option<Self> {
        let token = text.trim();
        if token.eq_ignore_ascii_case("check-in") {
            Some(Command::CheckIn)
        } else if token.eq_ignore_ascii_case("join-date") {
            Some(Command::JoinDate)
        } else if token.eq_ignore_ascii_case("leaderboard") {
            Some(Command::Leaderboard)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test_commands {
    use super::*;

    #[test]
    fn it_should_match_the_command_tokens() {
        assert_eq!(Command::parse("check-in"), Some(Command::CheckIn));
        assert_eq!(Command::parse("join-date"), Some(Command::JoinDate));
        assert_eq!(Command::parse("leaderboard"), Some(Command::Leaderboard));
    }

    #[test]
    fn it_should_ignore_case() {
        assert_eq!(Command::parse("Check-In"), Some(Command::CheckIn));
        assert_eq!(Command::parse("LEADERBOARD"), Some(Command::Leaderboard));
    }

    #[test]
    fn it_should_trim_surrounding_whitespace() {
        assert_eq!(Command::parse("  check-in \n"), Some(Command::CheckIn));
        assert_eq!(Command::parse("\tjoin-date "), Some(Command::JoinDate));
    }

    #[test]
    fn it_should_ignore_everything_else() {
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("checkin"), None);
        assert_eq!(Command::parse("check-in please"), None);
        assert_eq!(Command::parse("!check-in"), None);
        assert_eq!(Command::parse("hello there"), None);
    }
}
