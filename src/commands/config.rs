//! `xeno config` — views and edits the configuration file.
//!
//! Forms: no key prints the whole file; a key alone prints that value; a
//! key and value set it; `--clear` with a key removes it. Clearing without
//! a key is refused (it would wipe the file), as is clearing while also
//! passing a value.

use crate::config::{config_file_path, Config};
use crate::error::{Error, Result};

pub fn run(clear: bool, key: Option<&str>, value: Option<&str>) -> Result<()> {
    let mut config = Config::load()?;

    let Some(key) = key else {
        if clear {
            return Err(Error::Config {
                reason: format!(
                    "refusing to clear the whole configuration; delete {} instead",
                    config_file_path()?.display()
                ),
            });
        }
        print!("{}", config.dump());
        return Ok(());
    };

    let (section, option) = split_key(key)?;

    match (clear, value) {
        (true, Some(_)) => Err(Error::Config {
            reason: "specify either a value or --clear, not both".to_string(),
        }),
        (true, None) => {
            config.clear(section, option);
            config.save()
        }
        (false, None) => match config.get(section, option) {
            Some(value) => {
                println!("{value}");
                Ok(())
            }
            None => Err(Error::Config {
                reason: format!("no value set for {key:?}"),
            }),
        },
        (false, Some(value)) => {
            config.set(section, option, value);
            config.save()
        }
    }
}

/// Splits `section.option`, rejecting anything else.
fn split_key(key: &str) -> Result<(&str, &str)> {
    match key.split_once('.') {
        Some((section, option))
            if !section.is_empty() && !option.is_empty() && !option.contains('.') =>
        {
            Ok((section, option))
        }
        _ => Err(Error::Config {
            reason: format!("invalid configuration key {key:?} (expected section.option)"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_valid_key() {
        assert_eq!(split_key("core.editor").unwrap(), ("core", "editor"));
        assert_eq!(
            split_key("sync.pollForRemoteChanges").unwrap(),
            ("sync", "pollForRemoteChanges")
        );
    }

    #[test]
    fn split_rejects_malformed_keys() {
        for key in ["editor", "core.", ".editor", "a.b.c", ""] {
            assert!(split_key(key).is_err(), "expected rejection for {key:?}");
        }
    }

    #[test]
    fn clear_without_key_is_refused() {
        let err = run(true, None, None).unwrap_err();
        assert!(err.to_string().contains("refusing"));
    }

    #[test]
    fn clear_with_value_is_refused() {
        let err = run(true, Some("core.editor"), Some("vim")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
