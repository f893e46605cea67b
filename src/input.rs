//! Line-oriented command language for the interactive slideshow.
//!
//! Navigation keys accept a decimal numeric prefix (`3l` moves three items
//! forward, `5g` jumps to the fifth item). Everything else is a word command.

use std::str::FromStr;

use crate::events::{Command, Navigation};
use crate::preferences::Toggle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Quit,
}

/// Pointer gestures of a touch or mouse front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    WheelUp,
    WheelDown,
    EdgeLeft,
    EdgeRight,
    EdgeTop,
    EdgeBottom,
}

impl Gesture {
    pub fn navigation(self) -> Navigation {
        match self {
            Self::WheelUp | Self::EdgeLeft => Navigation::Backward(1),
            Self::WheelDown => Navigation::Forward(1),
            Self::EdgeRight => Navigation::Step,
            Self::EdgeTop | Self::EdgeBottom => Navigation::Next,
        }
    }
}

impl FromStr for Gesture {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wheel-up" => Ok(Self::WheelUp),
            "wheel-down" => Ok(Self::WheelDown),
            "edge-left" => Ok(Self::EdgeLeft),
            "edge-right" => Ok(Self::EdgeRight),
            "edge-top" => Ok(Self::EdgeTop),
            "edge-bottom" => Ok(Self::EdgeBottom),
            _ => Err(()),
        }
    }
}

/// Map a key pressed after an optional numeric prefix.
pub fn key_navigation(prefix: Option<usize>, key: char) -> Option<Navigation> {
    let n = prefix.unwrap_or(1);
    let nav = match key {
        'l' | 'n' | 'j' => Navigation::Forward(n),
        'h' | 'p' | 'k' => Navigation::Backward(n),
        'g' => Navigation::First(n),
        'G' => Navigation::Last(prefix),
        'r' => Navigation::Random,
        'x' => Navigation::Hide,
        '.' => Navigation::Next,
        _ => return None,
    };
    Some(nav)
}

pub fn parse_line(line: &str) -> Result<Input, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Command(Command::Navigate(Navigation::Next)));
    }
    if let Some(expression) = line.strip_prefix('/') {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err("search needs an expression".to_string());
        }
        return Ok(Input::Command(Command::Search(expression.to_string())));
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let command = match word {
        "q" | "quit" | "exit" => return Ok(Input::Quit),
        "panel" => Command::TogglePanel,
        "status" => Command::Status,
        "tag" if !rest.is_empty() => Command::RefineTag(rest.to_string()),
        "interval" => {
            let secs = rest
                .parse::<i64>()
                .map_err(|_| format!("interval needs a number of seconds, got '{rest}'"))?;
            Command::SetInterval(secs)
        }
        "toggle" => Command::Toggle(rest.parse::<Toggle>()?),
        "next" => Command::Navigate(Navigation::Next),
        _ => {
            if let Ok(gesture) = word.parse::<Gesture>() {
                Command::Navigate(gesture.navigation())
            } else {
                Command::Navigate(parse_key_sequence(line)?)
            }
        }
    };
    Ok(Input::Command(command))
}

fn parse_key_sequence(line: &str) -> Result<Navigation, String> {
    let digits_end = line
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("'{line}' needs a key after the count"))?;
    let (digits, key) = line.split_at(digits_end);
    let prefix = if digits.is_empty() {
        None
    } else {
        Some(
            digits
                .parse::<usize>()
                .map_err(|_| format!("count '{digits}' is too large"))?,
        )
    };
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(key), None) => {
            key_navigation(prefix, key).ok_or_else(|| format!("unknown key '{key}'"))
        }
        _ => Err(format!("unknown command '{line}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nav(line: &str) -> Navigation {
        match parse_line(line) {
            Ok(Input::Command(Command::Navigate(nav))) => nav,
            other => panic!("expected navigation for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn keys_take_numeric_prefix() {
        assert_eq!(nav("l"), Navigation::Forward(1));
        assert_eq!(nav("12l"), Navigation::Forward(12));
        assert_eq!(nav("3h"), Navigation::Backward(3));
        assert_eq!(nav("g"), Navigation::First(1));
        assert_eq!(nav("4g"), Navigation::First(4));
        assert_eq!(nav("G"), Navigation::Last(None));
        assert_eq!(nav("7G"), Navigation::Last(Some(7)));
        assert_eq!(nav("r"), Navigation::Random);
        assert_eq!(nav("x"), Navigation::Hide);
        assert_eq!(nav(""), Navigation::Next);
        assert_eq!(nav("0l"), Navigation::Forward(0));
    }

    #[test]
    fn gestures_map_to_navigation() {
        assert_eq!(nav("wheel-down"), Navigation::Forward(1));
        assert_eq!(nav("wheel-up"), Navigation::Backward(1));
        assert_eq!(nav("edge-left"), Navigation::Backward(1));
        assert_eq!(nav("edge-right"), Navigation::Step);
        assert_eq!(nav("edge-top"), Navigation::Next);
    }

    #[test]
    fn word_commands() {
        assert_eq!(
            parse_line("/ path like '%cat%' "),
            Ok(Input::Command(Command::Search("path like '%cat%'".into())))
        );
        assert_eq!(
            parse_line("tag sunset"),
            Ok(Input::Command(Command::RefineTag("sunset".into())))
        );
        assert_eq!(
            parse_line("interval 30"),
            Ok(Input::Command(Command::SetInterval(30)))
        );
        assert_eq!(
            parse_line("toggle clock"),
            Ok(Input::Command(Command::Toggle(Toggle::Clock)))
        );
        assert_eq!(parse_line("q"), Ok(Input::Quit));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_line("42").is_err());
        assert!(parse_line("3z").is_err());
        assert!(parse_line("interval soon").is_err());
        assert!(parse_line("toggle everything").is_err());
        assert!(parse_line("/").is_err());
        assert!(parse_line("hello").is_err());
    }
}
