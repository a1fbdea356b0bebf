use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Maximum idle connections retained by a pool; `0` disables pooling.
pub(crate) const KEY_POOL_SIZE: &str = "@pool_size";
/// Seconds an idle connection may sit in a pool before eviction.
pub(crate) const KEY_POOL_MAX_IDLE: &str = "@pool_max_idle";
/// Prepared statements cached per connection; `0` or negative disables.
pub(crate) const KEY_STMT_CACHE_SIZE: &str = "@stmt_cache_size";
/// Explicit path to a driver module, bypassing search-path discovery.
pub(crate) const KEY_MODULE: &str = "cppdb_module";

pub(crate) const DEFAULT_POOL_SIZE: i64 = 16;
pub(crate) const DEFAULT_POOL_MAX_IDLE: i64 = 600;
pub(crate) const DEFAULT_STMT_CACHE_SIZE: i64 = 64;

/// A parsed connection string: driver name plus a property map.
///
/// The format is `driver:[key=value;]*`. Keys are trimmed of whitespace;
/// values are either bare trimmed tokens or single-quoted strings where a
/// doubled quote (`''`) escapes a quote. Keys prefixed with `@` are
/// reserved for control properties (`@pool_size`, `@pool_max_idle`,
/// `@stmt_cache_size`); `cppdb_module` names a driver module explicitly.
///
/// Immutable after parsing:
///
/// ```
/// use cppdb_core::ConnectionInfo;
///
/// let info: ConnectionInfo = "mysql:user=root;password='a''b'".parse().unwrap();
/// assert_eq!(info.driver(), "mysql");
/// assert_eq!(info.get("password"), Some("a'b"));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    connection_string: String,
    driver: String,
    properties: BTreeMap<String, String>,
}

impl ConnectionInfo {
    /// The connection string this info was parsed from, verbatim.
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// The driver name (the part before the first `:`).
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Look up a property value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Look up a property value, falling back to `default`.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Look up an integer property, falling back to `default` when absent.
    ///
    /// A present but non-numeric value is a configuration error.
    pub fn get_int(&self, key: &str, default: i64) -> Result<i64> {
        match self.properties.get(key) {
            None => Ok(default),
            Some(value) => value.trim().parse().map_err(|_| {
                Error::config(format!(
                    "property `{key}` expected to be an integer value, got `{value}`"
                ))
            }),
        }
    }

    /// Iterate over all parsed properties in key order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromStr for ConnectionInfo {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse(s)
    }
}

// Byte scanning is safe here: every delimiter the parser splits on is
// ASCII, so slice boundaries always fall on UTF-8 character boundaries.
fn parse(s: &str) -> Result<ConnectionInfo> {
    let bytes = s.as_bytes();

    let colon = s
        .find(':')
        .ok_or_else(|| Error::config("no driver name given"))?;
    let driver = s[..colon].trim().to_owned();
    if driver.is_empty() {
        return Err(Error::config("no driver name given"));
    }

    let mut properties = BTreeMap::new();
    let mut p = colon + 1;

    while p < bytes.len() {
        let eq = s[p..]
            .find('=')
            .map(|n| p + n)
            .ok_or_else(|| Error::config("invalid property, `=` expected"))?;
        let key = s[p..eq].trim().to_owned();
        p = eq + 1;

        while p < bytes.len() && bytes[p].is_ascii_whitespace() {
            p += 1;
        }

        let mut value = String::new();
        if p >= bytes.len() {
            // trailing property with an empty value
        } else if bytes[p] == b'\'' {
            p += 1;
            loop {
                if p >= bytes.len() {
                    return Err(Error::config("unterminated quoted string"));
                }
                if bytes[p] == b'\'' {
                    if p + 1 < bytes.len() && bytes[p + 1] == b'\'' {
                        value.push('\'');
                        p += 2;
                    } else {
                        p += 1;
                        break;
                    }
                } else {
                    let start = p;
                    while p < bytes.len() && bytes[p] != b'\'' {
                        p += 1;
                    }
                    value.push_str(&s[start..p]);
                }
            }
        } else {
            match s[p..].find(';') {
                Some(n) => {
                    value = s[p..p + n].trim().to_owned();
                    p += n;
                }
                None => {
                    value = s[p..].trim().to_owned();
                    p = bytes.len();
                }
            }
        }

        if properties.contains_key(&key) {
            return Err(Error::config(format!("duplicate key `{key}`")));
        }
        properties.insert(key, value);

        while p < bytes.len() {
            let c = bytes[p];
            if c.is_ascii_whitespace() {
                p += 1;
            } else if c == b';' {
                p += 1;
                break;
            } else {
                return Err(Error::config("invalid property, `;` expected"));
            }
        }
    }

    Ok(ConnectionInfo {
        connection_string: s.to_owned(),
        driver,
        properties,
    })
}
