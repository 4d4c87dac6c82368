//! Parsing of `[[user@]host:[port:]]path` specifications.
//!
//! Every command that takes a target accepts this form. Parsing is pure
//! string-splitting with no filesystem access: first an optional `user@`
//! prefix, then one to three colon-delimited segments covering the host,
//! an optional port, and the path.

use crate::error::{Error, Result};

/// A parsed (possibly remote) path specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSpec {
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub file_path: String,
}

impl PathSpec {
    /// Parses a specification string.
    ///
    /// Fails on: an empty path, a user without a host, more than one `@`,
    /// more than two colons after the user, or a port that is not a 16-bit
    /// integer.
    pub fn parse(specification: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidSpecification {
            spec: specification.to_string(),
            reason: reason.to_string(),
        };

        // Optional user prefix.
        let parts: Vec<&str> = specification.split('@').collect();
        let (user, remaining) = match parts.as_slice() {
            [rest] => (None, *rest),
            [user, rest] => (Some(user.to_string()), *rest),
            _ => return Err(invalid("more than one '@'")),
        };

        // The remainder is colon-delimited: path; host:path; host:port:path.
        let segments: Vec<&str> = remaining.split(':').collect();
        let (host, port, file_path) = match segments.as_slice() {
            [path] => (None, None, *path),
            [host, path] => (Some(host.to_string()), None, *path),
            [host, port, path] => {
                let port: u16 = port
                    .parse()
                    .map_err(|_| invalid("port is not a 16-bit integer"))?;
                (Some(host.to_string()), Some(port), *path)
            }
            _ => return Err(invalid("too many colons")),
        };

        if file_path.is_empty() {
            return Err(invalid("file path is empty"));
        }
        if host.is_none() && user.is_some() {
            return Err(invalid("user specified without a host"));
        }

        Ok(PathSpec {
            user,
            host,
            port,
            file_path: file_path.to_string(),
        })
    }

    /// Returns whether the path names the local machine (no host given).
    /// This does not imply the path exists.
    pub fn is_local(&self) -> bool {
        self.host.is_none()
    }

    /// The ssh destination string: `user@host` or bare `host`.
    ///
    /// Only meaningful for remote specifications; returns `None` for local
    /// ones.
    pub fn ssh_destination(&self) -> Option<String> {
        let host = self.host.as_deref()?;
        Some(match self.user.as_deref() {
            Some(user) if !user.is_empty() => format!("{user}@{host}"),
            _ => host.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_only() {
        let p = PathSpec::parse("/some/local/path").unwrap();
        assert_eq!(p.user, None);
        assert_eq!(p.host, None);
        assert_eq!(p.port, None);
        assert_eq!(p.file_path, "/some/local/path");
        assert!(p.is_local());
    }

    #[test]
    fn host_and_path() {
        let p = PathSpec::parse("myhost:/the/path").unwrap();
        assert_eq!(p.user, None);
        assert_eq!(p.host.as_deref(), Some("myhost"));
        assert_eq!(p.port, None);
        assert_eq!(p.file_path, "/the/path");
        assert!(!p.is_local());
    }

    #[test]
    fn user_host_and_path() {
        let p = PathSpec::parse("jacob@myhost:/the/path").unwrap();
        assert_eq!(p.user.as_deref(), Some("jacob"));
        assert_eq!(p.host.as_deref(), Some("myhost"));
        assert_eq!(p.port, None);
        assert_eq!(p.file_path, "/the/path");
        assert!(!p.is_local());
    }

    #[test]
    fn user_host_port_and_path() {
        let p = PathSpec::parse("jacob@myhost:25:/the/path").unwrap();
        assert_eq!(p.user.as_deref(), Some("jacob"));
        assert_eq!(p.host.as_deref(), Some("myhost"));
        assert_eq!(p.port, Some(25));
        assert_eq!(p.file_path, "/the/path");
        assert!(!p.is_local());
    }

    #[test]
    fn host_port_and_path() {
        let p = PathSpec::parse("myhost:25:/the/path").unwrap();
        assert_eq!(p.user, None);
        assert_eq!(p.host.as_deref(), Some("myhost"));
        assert_eq!(p.port, Some(25));
        assert_eq!(p.file_path, "/the/path");
    }

    #[test]
    fn relative_local_path() {
        let p = PathSpec::parse("notes.txt").unwrap();
        assert!(p.is_local());
        assert_eq!(p.file_path, "notes.txt");
    }

    #[test]
    fn invalid_port() {
        assert!(PathSpec::parse("jacob@myhost:a:/the/path").is_err());
    }

    #[test]
    fn port_out_of_range() {
        assert!(PathSpec::parse("myhost:65536:/the/path").is_err());
    }

    #[test]
    fn negative_port() {
        assert!(PathSpec::parse("myhost:-1:/the/path").is_err());
    }

    #[test]
    fn too_many_colons() {
        assert!(PathSpec::parse("jacob@myhost:5:10:/the/path").is_err());
    }

    #[test]
    fn user_without_host() {
        assert!(PathSpec::parse("jacob@/the/path").is_err());
    }

    #[test]
    fn multiple_at_signs() {
        assert!(PathSpec::parse("a@b@myhost:/the/path").is_err());
    }

    #[test]
    fn empty_specification() {
        assert!(PathSpec::parse("").is_err());
    }

    #[test]
    fn user_with_empty_path() {
        assert!(PathSpec::parse("jacob@").is_err());
    }

    #[test]
    fn host_with_empty_path() {
        assert!(PathSpec::parse("myhost:").is_err());
    }

    #[test]
    fn errors_are_invalid_specification() {
        for spec in ["", "jacob@/p", "h:x:/p", "a@b@c:/p", "h:1:2:/p"] {
            let err = PathSpec::parse(spec).unwrap_err();
            assert!(
                matches!(err, Error::InvalidSpecification { .. }),
                "expected InvalidSpecification for {spec:?}"
            );
        }
    }

    #[test]
    fn ssh_destination_forms() {
        let p = PathSpec::parse("jacob@myhost:/p").unwrap();
        assert_eq!(p.ssh_destination().as_deref(), Some("jacob@myhost"));

        let p = PathSpec::parse("myhost:/p").unwrap();
        assert_eq!(p.ssh_destination().as_deref(), Some("myhost"));

        let p = PathSpec::parse("/p").unwrap();
        assert_eq!(p.ssh_destination(), None);
    }
}
