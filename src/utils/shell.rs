//! Display quoting and word splitting for argument vectors.
//!
//! Nothing here is ever handed to a shell. Commands run with structured argv;
//! quoting exists only so logs and plans show a command line that could be
//! pasted into a terminal, and splitting turns configured command strings
//! into argv.

/// Quote a single argument when it contains shell metacharacters.
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    const SHELL_META: &[char] = &[
        ' ', '\t', '\n', '\'', '"', '\\', '$', '`', '!', '*', '?', '[', ']', '(', ')', '{', '}',
        '<', '>', '|', '&', ';', '#', '~',
    ];

    if !arg.contains(SHELL_META) {
        return arg.to_string();
    }

    format!("'{}'", arg.replace('\'', "'\\''"))
}

/// Render a program and its arguments as one display line.
pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(quote_arg)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a configured command string into argv the way a POSIX shell would
/// tokenize it: single quotes, double quotes and backslash escapes, with no
/// expansion. `None` when a quote is left open or the line ends in a bare
/// backslash.
pub fn split_words(command: &str) -> Option<Vec<String>> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next()? {
                        '\'' => break,
                        c => word.push(c),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next()? {
                        '"' => break,
                        '\\' => match chars.next()? {
                            c @ ('"' | '\\' | '$' | '`') => word.push(c),
                            '\n' => {}
                            c => {
                                word.push('\\');
                                word.push(c);
                            }
                        },
                        c => word.push(c),
                    }
                }
            }
            '\\' => match chars.next()? {
                '\n' => {}
                c => {
                    in_word = true;
                    word.push(c);
                }
            },
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                word.push(c);
            }
        }
    }

    if in_word {
        words.push(word);
    }
    Some(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_arg_leaves_plain_words() {
        assert_eq!(quote_arg("cache-rebuild"), "cache-rebuild");
        assert_eq!(quote_arg("--tag=migrate_default_content"), "--tag=migrate_default_content");
    }

    #[test]
    fn quote_arg_wraps_metacharacters() {
        assert_eq!(quote_arg("hello world"), "'hello world'");
        assert_eq!(quote_arg("it's"), "'it'\\''s'");
        assert_eq!(quote_arg(""), "''");
    }

    #[test]
    fn command_line_joins_program_and_args() {
        let args = vec!["run".to_string(), "gulp".to_string(), "styles:production".to_string()];
        assert_eq!(command_line("npm", &args), "npm run gulp styles:production");
    }

    #[test]
    fn split_words_ignores_repeated_whitespace() {
        assert_eq!(
            split_words("  en:enable   devel\tkint ").unwrap(),
            vec!["en:enable", "devel", "kint"]
        );
        assert!(split_words("   ").unwrap().is_empty());
    }

    #[test]
    fn split_words_keeps_quoted_arguments_together() {
        assert_eq!(
            split_words("config:set system.site name 'Acme Intranet'").unwrap(),
            vec!["config:set", "system.site", "name", "Acme Intranet"]
        );
        assert_eq!(
            split_words(r#"config:set system.site slogan "Say \"hi\" \$USER""#).unwrap(),
            vec!["config:set", "system.site", "slogan", "Say \"hi\" $USER"]
        );
        assert_eq!(
            split_words(r"user:create Jane\ Doe --mail=''").unwrap(),
            vec!["user:create", "Jane Doe", "--mail="]
        );
    }

    #[test]
    fn split_words_keeps_empty_quoted_argument() {
        assert_eq!(split_words("state:set key ''").unwrap(), vec!["state:set", "key", ""]);
    }

    #[test]
    fn split_words_rejects_unterminated_quotes() {
        assert!(split_words("config:set system.site name 'Acme").is_none());
        assert!(split_words(r#"state:set key "open"#).is_none());
        assert!(split_words(r"cache-rebuild \").is_none());
    }

    #[test]
    fn quoted_display_splits_back_to_the_same_argv() {
        let args = vec!["config:set".to_string(), "it's here".to_string(), "".to_string()];
        let line = command_line("drush", &args);
        let words = split_words(&line).unwrap();
        assert_eq!(&words[1..], &args[..]);
    }
}
