//! Hypermedia resource identifiers.
//!
//! Text form: `hm://<uid>[/<segment>...][?v=<version>][#<blockRef>]`, or the
//! gateway form `https://<host>/hm/<uid>[/<segment>...]` with the same query
//! and fragment. Parsing is hand-rolled: the uid and path are case-sensitive
//! and must never go through URL normalization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Scheme of the hypermedia protocol.
pub const HM_SCHEME: &str = "hm";

/// Path prefix of the gateway form.
const GATEWAY_PREFIX: &str = "hm";

/// Which text form an identifier was written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    /// `hm://uid/...`
    Hypermedia,
    /// `http(s)://host/hm/uid/...`
    Gateway { secure: bool, host: String },
}

/// Range selection inside a referenced block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockRange {
    /// The block together with its children (`#id+`).
    Expanded,
    /// A character range of the block text (`#id[start:end]`).
    Exact { start: u32, end: u32 },
}

/// Reference to a block inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    pub block_id: String,
    pub range: Option<BlockRange>,
}

impl BlockRef {
    /// A whole-block reference.
    pub fn new(block_id: impl Into<String>) -> Self {
        Self {
            block_id: block_id.into(),
            range: None,
        }
    }

    fn parse(fragment: &str) -> Result<Self> {
        if let Some(id) = fragment.strip_suffix('+') {
            if !id.is_empty() {
                return Ok(Self {
                    block_id: id.to_string(),
                    range: Some(BlockRange::Expanded),
                });
            }
        }
        if let Some(body) = fragment.strip_suffix(']') {
            if let Some((id, range)) = body.split_once('[') {
                if let Some((start, end)) = range.split_once(':') {
                    if let (Ok(start), Ok(end), false) =
                        (start.parse(), end.parse(), id.is_empty())
                    {
                        return Ok(Self {
                            block_id: id.to_string(),
                            range: Some(BlockRange::Exact { start, end }),
                        });
                    }
                }
            }
        }
        Ok(Self::new(fragment))
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.block_id)?;
        match self.range {
            None => Ok(()),
            Some(BlockRange::Expanded) => f.write_str("+"),
            Some(BlockRange::Exact { start, end }) => write!(f, "[{start}:{end}]"),
        }
    }
}

/// A parsed hypermedia resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    uid: String,
    path: Option<Vec<String>>,
    version: Option<String>,
    explicit_latest: bool,
    block_ref: Option<BlockRef>,
    scheme: Scheme,
}

impl ResourceId {
    /// An identifier for the root document of `uid`.
    pub fn new(uid: impl Into<String>) -> Result<Self> {
        let uid = uid.into();
        check_token(&uid, "uid")?;
        Ok(Self {
            uid,
            path: None,
            version: None,
            explicit_latest: false,
            block_ref: None,
            scheme: Scheme::Hypermedia,
        })
    }

    /// Parse any supported text form.
    pub fn parse(text: &str) -> Result<Self> {
        let (scheme, rest) = match text.split_once("://") {
            Some((scheme, rest)) => (scheme, rest),
            None => return Self::parse_bare(text),
        };

        let (rest, fragment) = match rest.split_once('#') {
            Some((head, fragment)) => (head, Some(fragment)),
            None => (rest, None),
        };
        let (path_part, query) = match rest.split_once('?') {
            Some((head, query)) => (head, Some(query)),
            None => (rest, None),
        };
        let mut segments = path_part.split('/');

        let scheme = match scheme {
            HM_SCHEME => Scheme::Hypermedia,
            "https" | "http" => {
                let host = segments.next().unwrap_or_default();
                check_host(host)?;
                if segments.next() != Some(GATEWAY_PREFIX) {
                    return Err(CoreError::InvalidId(format!(
                        "gateway url is not a hypermedia link: {text}"
                    )));
                }
                Scheme::Gateway {
                    secure: scheme == "https",
                    host: host.to_string(),
                }
            }
            other => {
                return Err(CoreError::InvalidId(format!("unsupported scheme {other:?}")));
            }
        };

        let uid = segments.next().unwrap_or_default().to_string();
        let mut id = Self::new(uid)?;
        id.scheme = scheme;
        id = id.with_path(segments.filter(|s| !s.is_empty()).map(String::from))?;

        if let Some(query) = query {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                match pair.split_once('=').unwrap_or((pair, "")) {
                    ("v", version) if !version.is_empty() => {
                        id.version = Some(version.to_string());
                    }
                    ("l", "") => id.explicit_latest = true,
                    _ => {}
                }
            }
        }
        if let Some(version) = &id.version {
            check_token(version, "version")?;
            id.explicit_latest = false;
        }

        if let Some(fragment) = fragment.filter(|f| !f.is_empty()) {
            id = id.with_block_ref(BlockRef::parse(fragment)?)?;
        }

        Ok(id)
    }

    fn parse_bare(text: &str) -> Result<Self> {
        if text.contains(['/', '?', '#']) {
            return Err(CoreError::InvalidId(format!(
                "bare identifier must be a single token: {text}"
            )));
        }
        Self::new(text)
    }

    /// Replace the path. Empty segments are dropped; no segments means no path.
    pub fn with_path<I, S>(mut self, segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments
            .into_iter()
            .map(Into::into)
            .filter(|s| !s.is_empty())
            .collect();
        for segment in &segments {
            check_token(segment, "path segment")?;
        }
        self.path = if segments.is_empty() {
            None
        } else {
            Some(segments)
        };
        Ok(self)
    }

    /// Pin to a version. Clears the explicit latest flag.
    pub fn with_version(mut self, version: impl Into<String>) -> Result<Self> {
        let version = version.into();
        check_token(&version, "version")?;
        self.version = Some(version);
        self.explicit_latest = false;
        Ok(self)
    }

    /// Drop any version and mark the id as explicitly following the latest version.
    pub fn latest(mut self) -> Self {
        self.version = None;
        self.explicit_latest = true;
        self
    }

    /// Point at a block inside the document.
    pub fn with_block_ref(mut self, block_ref: BlockRef) -> Result<Self> {
        check_token(&block_ref.block_id, "block id")?;
        if block_ref.block_id.contains(['+', '[', ']']) {
            return Err(CoreError::InvalidId(format!(
                "invalid block id {:?}",
                block_ref.block_id
            )));
        }
        self.block_ref = Some(block_ref);
        Ok(self)
    }

    /// Use the gateway text form.
    pub fn on_gateway(mut self, host: impl Into<String>, secure: bool) -> Result<Self> {
        let host = host.into();
        check_host(&host)?;
        self.scheme = Scheme::Gateway { secure, host };
        Ok(self)
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn path(&self) -> Option<&[String]> {
        self.path.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn block_ref(&self) -> Option<&BlockRef> {
        self.block_ref.as_ref()
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// True when no version is pinned.
    pub fn is_latest(&self) -> bool {
        self.version.is_none()
    }

    /// True when the text form carried the `l` flag. Never set alongside a version.
    pub fn is_explicit_latest(&self) -> bool {
        self.explicit_latest
    }

    /// Document path as a string: `/a/b`, or empty for the root document.
    pub fn path_string(&self) -> String {
        match &self.path {
            Some(segments) => segments.iter().map(|s| format!("/{s}")).collect(),
            None => String::new(),
        }
    }

    /// `hm://uid/path` without version or block reference.
    pub fn base_id(&self) -> String {
        format!("{HM_SCHEME}://{}{}", self.uid, self.path_string())
    }

    /// Same document, no version, no block reference, hypermedia scheme.
    pub fn document(&self) -> Self {
        Self {
            uid: self.uid.clone(),
            path: self.path.clone(),
            version: None,
            explicit_latest: false,
            block_ref: None,
            scheme: Scheme::Hypermedia,
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scheme {
            Scheme::Hypermedia => write!(f, "{HM_SCHEME}://{}", self.uid)?,
            Scheme::Gateway { secure, host } => {
                let scheme = if *secure { "https" } else { "http" };
                write!(f, "{scheme}://{host}/{GATEWAY_PREFIX}/{}", self.uid)?;
            }
        }
        f.write_str(&self.path_string())?;
        if let Some(version) = &self.version {
            write!(f, "?v={version}")?;
        } else if self.explicit_latest {
            f.write_str("?l")?;
        }
        if let Some(block_ref) = &self.block_ref {
            write!(f, "#{block_ref}")?;
        }
        Ok(())
    }
}

impl FromStr for ResourceId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Hosts may carry a port, so `:` is allowed here.
fn check_host(host: &str) -> Result<()> {
    if host.is_empty() || host.contains(['/', '?', '#']) || host.contains(char::is_whitespace) {
        return Err(CoreError::InvalidId(format!("invalid gateway host {host:?}")));
    }
    Ok(())
}

/// Reject empty tokens and characters that would break the text form.
fn check_token(token: &str, what: &str) -> Result<()> {
    if token.is_empty() {
        return Err(CoreError::InvalidId(format!("empty {what}")));
    }
    if let Some(c) = token
        .chars()
        .find(|c| matches!(c, '/' | '?' | '#' | '&' | ':') || c.is_whitespace())
    {
        return Err(CoreError::InvalidId(format!(
            "{what} {token:?} contains {c:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const UID: &str = "z6MkqqiSjqcT9NasDUXiymyB8kpgz6h3CNQaghGAoXsaYJ2f";

    #[test]
    fn test_bare_token() {
        let id = ResourceId::parse(UID).unwrap();
        assert_eq!(id.uid(), UID);
        assert_eq!(id.path(), None);
        assert!(id.is_latest());
        assert_eq!(id.to_string(), format!("hm://{UID}"));
    }

    #[test]
    fn test_full_form() {
        let text = format!("hm://{UID}/docs/Intro?v=bafyabc.bafydef#Xy_9-AbC[3:10]");
        let id = ResourceId::parse(&text).unwrap();
        assert_eq!(id.path().unwrap(), &["docs".to_string(), "Intro".to_string()]);
        assert_eq!(id.version(), Some("bafyabc.bafydef"));
        assert!(!id.is_latest());
        let block = id.block_ref().unwrap();
        assert_eq!(block.block_id, "Xy_9-AbC");
        assert_eq!(block.range, Some(BlockRange::Exact { start: 3, end: 10 }));
        assert_eq!(id.to_string(), text);
    }

    #[test]
    fn test_case_preserved() {
        let id = ResourceId::parse("hm://AbCdEf/Some/PATH").unwrap();
        assert_eq!(id.uid(), "AbCdEf");
        assert_eq!(id.path_string(), "/Some/PATH");
    }

    #[test]
    fn test_expanded_fragment() {
        let id = ResourceId::parse(&format!("hm://{UID}#blockAbc+")).unwrap();
        let block = id.block_ref().unwrap();
        assert_eq!(block.block_id, "blockAbc");
        assert_eq!(block.range, Some(BlockRange::Expanded));
    }

    #[test]
    fn test_latest_flag() {
        let id = ResourceId::parse(&format!("hm://{UID}?l")).unwrap();
        assert!(id.is_latest());
        assert!(id.is_explicit_latest());
        assert_eq!(id.to_string(), format!("hm://{UID}?l"));

        // A pinned version wins over the flag.
        let id = ResourceId::parse(&format!("hm://{UID}?v=bafyx&l")).unwrap();
        assert!(!id.is_latest());
        assert!(!id.is_explicit_latest());
    }

    #[test]
    fn test_unknown_query_ignored() {
        let id = ResourceId::parse(&format!("hm://{UID}/a?foo=bar&v=bafyx")).unwrap();
        assert_eq!(id.version(), Some("bafyx"));
        assert_eq!(id.to_string(), format!("hm://{UID}/a?v=bafyx"));
    }

    #[test]
    fn test_empty_segments_dropped() {
        let id = ResourceId::parse(&format!("hm://{UID}/")).unwrap();
        assert_eq!(id.path(), None);
        let id = ResourceId::parse(&format!("hm://{UID}//a//b")).unwrap();
        assert_eq!(id.path_string(), "/a/b");
    }

    #[test]
    fn test_gateway_form() {
        let text = format!("https://example.com/hm/{UID}/notes?v=bafyx#abcdefgh");
        let id = ResourceId::parse(&text).unwrap();
        assert_eq!(id.uid(), UID);
        assert_eq!(
            id.scheme(),
            &Scheme::Gateway {
                secure: true,
                host: "example.com".to_string()
            }
        );
        assert_eq!(id.to_string(), text);
        assert_eq!(id.base_id(), format!("hm://{UID}/notes"));

        let local = ResourceId::parse(&format!("http://localhost:3000/hm/{UID}")).unwrap();
        assert_eq!(local.to_string(), format!("http://localhost:3000/hm/{UID}"));
    }

    #[test]
    fn test_invalid_ids() {
        for text in [
            "",
            "hm://",
            "ftp://abc",
            "https://example.com/docs/abc",
            "a/b",
            "has space",
            "hm://uid/a b",
        ] {
            assert!(
                matches!(ResourceId::parse(text), Err(CoreError::InvalidId(_))),
                "expected InvalidId for {text:?}"
            );
        }
    }

    #[test]
    fn test_builder_roundtrip() {
        let id = ResourceId::new(UID)
            .unwrap()
            .with_path(["a", "b"])
            .unwrap()
            .with_version("bafyx")
            .unwrap()
            .with_block_ref(BlockRef {
                block_id: "abcdefgh".into(),
                range: Some(BlockRange::Expanded),
            })
            .unwrap();
        assert_eq!(ResourceId::parse(&id.to_string()).unwrap(), id);
        assert_eq!(id.document().to_string(), format!("hm://{UID}/a/b"));
    }
}
