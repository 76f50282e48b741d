//! Anti-forgery token retrieval

use percent_encoding::percent_decode_str;
use tracing::debug;

/// Supplies the token sent with each analysis request
pub trait TokenSource: Send + Sync {
    /// Current token, if any. Requests go without the header when `None`.
    fn token(&self) -> Option<String>;
}

/// A fixed token (or none)
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Reads the token from a `Cookie` header string
#[derive(Debug, Clone)]
pub struct CookieToken {
    cookies: String,
    name: String,
}

impl CookieToken {
    pub fn new(cookies: impl Into<String>, name: &str) -> Self {
        Self {
            cookies: cookies.into(),
            name: name.to_string(),
        }
    }
}

impl TokenSource for CookieToken {
    fn token(&self) -> Option<String> {
        let value = cookie_value(&self.cookies, &self.name);
        if value.is_none() {
            debug!("Cookie {} not present", self.name);
        }
        value
    }
}

/// Value of the named cookie in a `name=value; other=value` string,
/// percent-decoded.
pub fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| percent_decode_str(value).decode_utf8_lossy().into_owned())
        })
}
