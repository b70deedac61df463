//! Command line splitting and option parsing.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::{CommandError, CommandResult};

/// Split a command line into words.
///
/// Single and double quotes group words; a backslash escapes the next
/// character outside single quotes.
pub fn tokenize(line: &str) -> CommandResult<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') | (Some('"'), '"') => quote = None,
            (Some('\''), c) => current.push(c),
            (_, '\\') => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| CommandError::invalid_argument("Trailing backslash"))?;
                current.push(escaped);
                in_word = true;
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if let Some(q) = quote {
        return Err(CommandError::invalid_argument(format!("Unterminated quote {q}")));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Description of one option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    /// Single-letter form, used as `-x`.
    pub short: Option<char>,
    /// Long form, used as `--name`. Also the key values are stored under.
    pub long: &'static str,
    /// Whether a value follows the option.
    pub takes_value: bool,
    /// Help text.
    pub help: &'static str,
}

impl OptionSpec {
    /// An option taking a value.
    #[must_use]
    pub const fn value(short: char, long: &'static str, help: &'static str) -> Self {
        Self {
            short: Some(short),
            long,
            takes_value: true,
            help,
        }
    }

    /// A flag without value.
    #[must_use]
    pub const fn flag(long: &'static str, help: &'static str) -> Self {
        Self {
            short: None,
            long,
            takes_value: false,
            help,
        }
    }
}

impl fmt::Display for OptionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(short) = self.short {
            write!(f, "-{short}, ")?;
        }
        write!(f, "--{}", self.long)?;
        if self.takes_value {
            write!(f, " <value>")?;
        }
        Ok(())
    }
}

/// Parsed arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    values: BTreeMap<String, String>,
    flags: BTreeSet<String>,
    positional: Vec<String>,
}

impl Args {
    /// Parse `words` against `specs`.
    ///
    /// Accepts `-x value`, `--long value` and `--long=value`. `--` ends
    /// option parsing.
    pub fn parse(words: &[String], specs: &[OptionSpec]) -> CommandResult<Self> {
        let mut args = Self::default();
        let mut iter = words.iter();
        while let Some(word) = iter.next() {
            if word == "--" {
                args.positional.extend(iter.by_ref().cloned());
                break;
            }
            let (spec, inline) = if let Some(long) = word.strip_prefix("--") {
                let (name, inline) = match long.split_once('=') {
                    Some((name, value)) => (name, Some(value)),
                    None => (long, None),
                };
                (specs.iter().find(|s| s.long == name), inline)
            } else if let Some(short) = word.strip_prefix('-').filter(|s| s.chars().count() == 1) {
                (specs.iter().find(|s| s.short.is_some_and(|c| short.starts_with(c))), None)
            } else {
                args.positional.push(word.clone());
                continue;
            };

            let spec = spec.ok_or_else(|| {
                CommandError::invalid_argument(format!("Unknown option '{word}'"))
            })?;
            if spec.takes_value {
                let value = match inline {
                    Some(value) => value.to_string(),
                    None => iter.next().cloned().ok_or_else(|| {
                        CommandError::invalid_argument(format!(
                            "Missing value for option '--{}'",
                            spec.long
                        ))
                    })?,
                };
                args.values.insert(spec.long.to_string(), value);
            } else if inline.is_some() {
                return Err(CommandError::invalid_argument(format!(
                    "Option '--{}' does not take a value",
                    spec.long
                )));
            } else {
                args.flags.insert(spec.long.to_string());
            }
        }
        Ok(args)
    }

    /// Parse options up to the first positional word. That word and every
    /// word after it are kept as positional, unparsed.
    pub fn parse_leading(words: &[String], specs: &[OptionSpec]) -> CommandResult<Self> {
        let mut end = 0;
        while let Some(word) = words.get(end) {
            if word == "--" || !word.starts_with('-') {
                break;
            }
            let takes_value = specs.iter().any(|s| {
                s.takes_value
                    && (word == &format!("--{}", s.long)
                        || s.short.is_some_and(|c| word == &format!("-{c}")))
            });
            end += if takes_value { 2 } else { 1 };
        }
        let end = end.min(words.len());
        let mut args = Self::parse(&words[..end], specs)?;
        let rest = match words.get(end) {
            Some(word) if word == "--" => &words[end + 1..],
            _ => &words[end..],
        };
        args.positional.extend(rest.iter().cloned());
        Ok(args)
    }

    /// Value of an option, by long name.
    #[must_use]
    pub fn value(&self, long: &str) -> Option<&str> {
        self.values.get(long).map(String::as_str)
    }

    /// Parsed value of an option.
    pub fn parse_value<T>(&self, long: &str) -> CommandResult<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.value(long)
            .map(|v| {
                v.parse().map_err(|e| {
                    CommandError::invalid_argument(format!("Invalid value '{v}' for option '--{long}': {e}"))
                })
            })
            .transpose()
    }

    /// Whether a flag was given.
    #[must_use]
    pub fn flag(&self, long: &str) -> bool {
        self.flags.contains(long)
    }

    /// Words that are not options.
    #[must_use]
    pub fn positional(&self) -> &[String] {
        &self.positional
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECS: &[OptionSpec] = &[
        OptionSpec::value('n', "name", "Name"),
        OptionSpec::value('l', "level", "Level"),
        OptionSpec::flag("inline", "Inline"),
    ];

    fn words(line: &str) -> Vec<String> {
        tokenize(line).unwrap()
    }

    #[test]
    fn tokenize_quotes_and_escapes() {
        assert_eq!(words("a  b"), ["a", "b"]);
        assert_eq!(words(r#"env -p "JAVA.*" x"#), ["env", "-p", "JAVA.*", "x"]);
        assert_eq!(words("say 'it''s'"), ["say", "its"]);
        assert_eq!(words(r"a\ b"), ["a b"]);
        assert_eq!(words("''"), [""]);
        assert!(words("   ").is_empty());
        assert!(tokenize("\"open").is_err());
        assert!(tokenize("end\\").is_err());
    }

    #[test]
    fn parse_forms() {
        let args = Args::parse(&words("-n root --level=debug --inline extra"), SPECS).unwrap();
        assert_eq!(args.value("name"), Some("root"));
        assert_eq!(args.value("level"), Some("debug"));
        assert!(args.flag("inline"));
        assert_eq!(args.positional(), ["extra"]);

        let args = Args::parse(&words("--name x -- -n"), SPECS).unwrap();
        assert_eq!(args.value("name"), Some("x"));
        assert_eq!(args.positional(), ["-n"]);
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            Args::parse(&words("-x"), SPECS),
            Err(CommandError::InvalidArgument(_))
        ));
        let err = Args::parse(&words("--name"), SPECS).unwrap_err();
        assert_eq!(err.to_string(), "Missing value for option '--name'");
        assert!(Args::parse(&words("--inline=yes"), SPECS).is_err());
    }

    #[test]
    fn leading_options_only() {
        let args = Args::parse_leading(&words("--name 5 --inline metrics -n x -l"), SPECS).unwrap();
        assert_eq!(args.value("name"), Some("5"));
        assert!(args.flag("inline"));
        assert_eq!(args.positional(), ["metrics", "-n", "x", "-l"]);

        let args = Args::parse_leading(&words("-- -n"), SPECS).unwrap();
        assert_eq!(args.positional(), ["-n"]);
        assert!(Args::parse_leading(&words("--name"), SPECS).is_err());
    }

    #[test]
    fn typed_values() {
        let args = Args::parse(&words("-n 42"), SPECS).unwrap();
        assert_eq!(args.parse_value::<u64>("name").unwrap(), Some(42));
        assert_eq!(args.parse_value::<u64>("level").unwrap(), None);
        let args = Args::parse(&words("-n many"), SPECS).unwrap();
        assert!(args.parse_value::<u64>("name").is_err());
    }

    #[test]
    fn spec_display() {
        assert_eq!(SPECS[0].to_string(), "-n, --name <value>");
        assert_eq!(SPECS[2].to_string(), "--inline");
    }
}
