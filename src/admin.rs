//! Line based administration commands read from stdin.
//!
//! ```text
//! remove short <code...>
//! remove url <target...>
//! set <code> <target> [http|html]
//! ```
//!
//! These go straight to the store and skip every validation and dedup rule
//! of the shortening service.

use std::{io::BufRead, str::FromStr};

use thiserror::Error;

use crate::{
    db::{DbError, LinkStore},
    model::RedirectMethod,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    RemoveShort(String),
    RemoveUrl(String),
    Set {
        short: String,
        target: String,
        redirect: RedirectMethod,
    },
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?}")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (command, rest) = split_word(line);
        if command.is_empty() {
            return Err(CommandError::Empty);
        }
        match command.to_lowercase().as_str() {
            // the argument runs to the end of the line, targets may contain spaces
            "remove" => match split_word(rest) {
                ("short", short) if !short.is_empty() => Ok(Command::RemoveShort(short.to_string())),
                ("url", target) if !target.is_empty() => Ok(Command::RemoveUrl(target.to_string())),
                _ => Err(CommandError::Usage("remove short <code> | remove url <target>")),
            },
            "set" => {
                let mut args = rest.split_whitespace();
                match (args.next(), args.next()) {
                    (Some(short), Some(target)) => Ok(Command::Set {
                        short: short.to_string(),
                        target: target.to_string(),
                        redirect: RedirectMethod::normalize(args.next().unwrap_or_default()),
                    }),
                    _ => Err(CommandError::Usage("set <code> <target> [http|html]")),
                }
            }
            _ => Err(CommandError::Unknown(command.to_string())),
        }
    }
}

/// First word of `line` and the trimmed remainder.
fn split_word(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    }
}

impl Command {
    pub fn execute<S: LinkStore>(&self, store: &S) -> Result<(), DbError> {
        match self {
            Command::RemoveShort(short) => {
                let removed = store.delete_by_short(short)?;
                tracing::info!("removed {removed} link(s) with short code {short}");
            }
            Command::RemoveUrl(target) => {
                let removed = store.delete_by_target(target)?;
                tracing::info!("removed {removed} link(s) pointing to {target}");
            }
            Command::Set {
                short,
                target,
                redirect,
            } => {
                store.insert_direct(short, target, *redirect)?;
                tracing::info!("set {short} -> {target} ({redirect})");
            }
        }
        Ok(())
    }
}

/// Reads commands until the input closes. Bad lines and store failures are
/// logged and skipped.
pub fn listen<S: LinkStore, R: BufRead>(store: &S, input: R) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("failed to read admin input: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(command) => {
                if let Err(e) = command.execute(store) {
                    tracing::error!("admin command {:?} failed: {e}", &command);
                }
            }
            Err(e) => tracing::warn!("{e}"),
        }
    }
    tracing::debug!("admin input closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Db;

    #[test]
    fn test_parse_remove() {
        assert_eq!(
            "remove short abc".parse::<Command>().unwrap(),
            Command::RemoveShort("abc".to_string())
        );
        assert_eq!(
            "REMOVE url https://example.com".parse::<Command>().unwrap(),
            Command::RemoveUrl("https://example.com".to_string())
        );
    }

    #[test]
    fn test_parse_remove_keeps_spaces() {
        assert_eq!(
            "remove url http://lmddgtfy.net/?q=rust lifetimes".parse::<Command>().unwrap(),
            Command::RemoveUrl("http://lmddgtfy.net/?q=rust lifetimes".to_string())
        );
        assert_eq!(
            "remove short  my link ".parse::<Command>().unwrap(),
            Command::RemoveShort("my link".to_string())
        );
    }

    #[test]
    fn test_parse_set() {
        assert_eq!(
            "set abc https://example.com html".parse::<Command>().unwrap(),
            Command::Set {
                short: "abc".to_string(),
                target: "https://example.com".to_string(),
                redirect: RedirectMethod::Html,
            }
        );
    }

    #[test]
    fn test_parse_set_defaults_to_http() {
        let command = "set abc https://example.com".parse::<Command>().unwrap();
        assert!(matches!(command, Command::Set { redirect: RedirectMethod::Http, .. }));

        let command = "set abc https://example.com bogus".parse::<Command>().unwrap();
        assert!(matches!(command, Command::Set { redirect: RedirectMethod::Http, .. }));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>().unwrap_err(), CommandError::Empty);
        assert!(matches!("list".parse::<Command>(), Err(CommandError::Unknown(_))));
        assert!(matches!("remove short".parse::<Command>(), Err(CommandError::Usage(_))));
        assert!(matches!("remove id abc".parse::<Command>(), Err(CommandError::Usage(_))));
        assert!(matches!("set abc".parse::<Command>(), Err(CommandError::Usage(_))));
    }

    #[test]
    fn test_listen_runs_commands() {
        let db = Db::in_memory().unwrap();
        let input = "set aaa https://example.com/a\n\
                     set bbb https://example.com/b html\n\
                     nonsense\n\
                     set ccc https://example.com/c\n\
                     remove short aaa\n\
                     remove url https://example.com/c\n";
        listen(&db, input.as_bytes());

        assert!(matches!(db.lookup("aaa"), Err(DbError::NotFound(_))));
        assert!(matches!(db.lookup("ccc"), Err(DbError::NotFound(_))));
        assert_eq!(db.lookup("bbb").unwrap().redirect, RedirectMethod::Html);
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn test_remove_duckduckgo_link_by_target() {
        let db = Db::in_memory().unwrap();
        db.insert_if_absent("http://lmddgtfy.net/?q=rust lifetimes", "ddg", RedirectMethod::Http)
            .unwrap();
        listen(&db, "remove url http://lmddgtfy.net/?q=rust lifetimes\n".as_bytes());
        assert!(matches!(db.lookup("ddg"), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_set_overwrites() {
        let db = Db::in_memory().unwrap();
        listen(&db, "set abc https://example.com/a\nset abc https://example.com/b\n".as_bytes());
        assert_eq!(db.lookup("abc").unwrap().target, "https://example.com/b");
    }

    #[test]
    fn test_remove_missing_is_not_an_error() {
        let db = Db::in_memory().unwrap();
        assert!(Command::RemoveShort("nope".to_string()).execute(&db).is_ok());
        assert!(Command::RemoveUrl("https://nope.example".to_string()).execute(&db).is_ok());
    }
}
