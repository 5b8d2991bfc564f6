//! What goes into a symbol, and how scanned text is recognised
//!
//! A symbol carries either the bare token or a verification link with the
//! token in its `id` query parameter, e.g. `https://host/product?id=<token>`.

use std::fmt;

const ID_PARAM: &str = "id";

/// Text carried by a symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpticalPayload {
    /// Bare compact token
    Token(String),
    /// Verification link carrying the token
    Link {
        /// Full link text
        url: String,
        /// Value of the `id` parameter
        token: String,
    },
}

impl OpticalPayload {
    /// Link form: `{base}?id={token}` (or `&id=` when `base` already has a query)
    pub fn link(base_url: &str, token: impl Into<String>) -> Self {
        let token = token.into();
        let separator = if base_url.contains('?') { '&' } else { '?' };
        let url = format!("{base_url}{separator}{ID_PARAM}={token}");
        OpticalPayload::Link { url, token }
    }

    /// The token, whichever form carries it
    pub fn token(&self) -> &str {
        match self {
            OpticalPayload::Token(token) => token,
            OpticalPayload::Link { token, .. } => token,
        }
    }

    /// Take the token out, dropping any link
    pub fn into_token(self) -> String {
        match self {
            OpticalPayload::Token(token) => token,
            OpticalPayload::Link { token, .. } => token,
        }
    }

    /// Exact text to encode
    pub fn as_str(&self) -> &str {
        match self {
            OpticalPayload::Token(token) => token,
            OpticalPayload::Link { url, .. } => url,
        }
    }

    /// Recognise scanned text; anything that is not a token or a link to one is `None`
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if is_compact_token(text) {
            return Some(OpticalPayload::Token(text.to_string()));
        }

        if !text.contains("://") {
            return None;
        }
        let without_fragment = text.split('#').next().unwrap_or(text);
        let (_, query) = without_fragment.split_once('?')?;
        let token = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == ID_PARAM)
            .map(|(_, value)| value)?;

        is_compact_token(token).then(|| OpticalPayload::Link {
            url: text.to_string(),
            token: token.to_string(),
        })
    }
}

impl fmt::Display for OpticalPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which payload form a batch produces
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PayloadFormat {
    /// The token itself
    #[default]
    Token,
    /// `{base_url}?id={token}`
    Link {
        /// Prefix the `id` parameter is appended to
        base_url: String,
    },
}

impl PayloadFormat {
    /// Wrap a freshly issued token
    pub fn build(&self, token: String) -> OpticalPayload {
        match self {
            PayloadFormat::Token => OpticalPayload::Token(token),
            PayloadFormat::Link { base_url } => OpticalPayload::link(base_url, token),
        }
    }
}

/// Five base64url segments with an empty second (encrypted key) segment
pub fn is_compact_token(text: &str) -> bool {
    let segments: Vec<&str> = text.split('.').collect();
    if segments.len() != 5 || !segments[1].is_empty() {
        return false;
    }
    segments
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 1)
        .all(|(_, s)| {
            !s.is_empty()
                && s.bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "eyJhbGciOiJkaXIifQ..aXY.Y3Q.dGFn";

    #[test]
    fn test_token_shape() {
        assert!(is_compact_token(TOKEN));
        assert!(!is_compact_token("a.b.c.d.e"));
        assert!(!is_compact_token("a..c.d"));
        assert!(!is_compact_token("a..c.d+.e"));
        assert!(!is_compact_token("a...d.e"));
        assert!(!is_compact_token(r#"{"sku":"A-100"}"#));
    }

    #[test]
    fn test_parse_bare_token() {
        assert_eq!(
            OpticalPayload::parse(&format!(" {TOKEN}\n")),
            Some(OpticalPayload::Token(TOKEN.to_string()))
        );
    }

    #[test]
    fn test_link_round_trip() {
        let payload = OpticalPayload::link("http://localhost:3000/product", TOKEN);
        assert_eq!(
            payload.as_str(),
            format!("http://localhost:3000/product?id={TOKEN}")
        );
        assert_eq!(OpticalPayload::parse(payload.as_str()), Some(payload.clone()));
        assert_eq!(payload.token(), TOKEN);
    }

    #[test]
    fn test_link_with_existing_query() {
        let payload = OpticalPayload::link("https://x.test/p?lang=en", TOKEN);
        assert_eq!(payload.as_str(), format!("https://x.test/p?lang=en&id={TOKEN}"));
        let parsed = OpticalPayload::parse(&format!("{}#top", payload.as_str())).unwrap();
        assert_eq!(parsed.token(), TOKEN);
    }

    #[test]
    fn test_misses() {
        assert_eq!(OpticalPayload::parse("https://example.com/?q=1"), None);
        assert_eq!(OpticalPayload::parse("https://example.com/?id=not-a-token"), None);
        assert_eq!(OpticalPayload::parse("id=abc"), None);
        assert_eq!(OpticalPayload::parse(""), None);
    }

    #[test]
    fn test_format_build() {
        assert_eq!(
            PayloadFormat::Token.build("t".into()),
            OpticalPayload::Token("t".into())
        );
        let link = PayloadFormat::Link {
            base_url: "https://h/p".into(),
        };
        assert_eq!(link.build("t".into()).as_str(), "https://h/p?id=t");
    }
}
