use crate::{ConfigError, EVENTING_TAG};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// How a function behind an endpoint is triggered.
///
/// Both modes perform the same remote call; the mode only affects how the invocation is
/// labelled in logs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum EndpointMode {
    #[default]
    Serving,
    Eventing,
}

impl fmt::Display for EndpointMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointMode::Serving => write!(f, "serving"),
            EndpointMode::Eventing => write!(f, "eventing"),
        }
    }
}

/// A single call target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
    mode: EndpointMode,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, mode: EndpointMode) -> Self {
        Self {
            url: url.into(),
            mode,
        }
    }

    pub fn serving(url: impl Into<String>) -> Self {
        Self::new(url, EndpointMode::Serving)
    }

    pub fn eventing(url: impl Into<String>) -> Self {
        Self::new(url, EndpointMode::Eventing)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mode(&self) -> EndpointMode {
        self.mode
    }

    /// Address to dial with the run's port override applied.
    ///
    /// Urls without a scheme are dialed over plaintext HTTP/2.
    pub fn address(&self, port: u16) -> String {
        if self.url.contains("://") {
            format!("{}:{port}", self.url)
        } else {
            format!("http://{}:{port}", self.url)
        }
    }

    fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.split('\t');
        let url = fields.next().filter(|url| !url.is_empty())?;

        let mode = match fields.next() {
            None => EndpointMode::Serving,
            Some(EVENTING_TAG) => EndpointMode::Eventing,
            Some(_) => return None,
        };

        if fields.next().is_some() {
            return None;
        }

        Some(Self::new(url, mode))
    }
}

/// Ordered, non-empty collection of endpoints. Selection is round-robin over the load order.
#[derive(Clone, Debug)]
pub struct EndpointSet {
    endpoints: Vec<Endpoint>,
}

impl EndpointSet {
    pub fn new(endpoints: Vec<Endpoint>) -> Result<Self, ConfigError> {
        if endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }
        Ok(Self { endpoints })
    }

    /// Load endpoints from a file with one endpoint per line: `<url>` or `<url>\teventing`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let unreadable = |source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(unreadable)?;
        Self::from_reader(BufReader::new(file)).map_err(|err| match err {
            ConfigError::Read(source) => unreadable(source),
            err => err,
        })
    }

    pub fn from_reader(reader: impl BufRead) -> Result<Self, ConfigError> {
        let mut endpoints = vec![];
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(ConfigError::Read)?;
            let line = line.strip_suffix('\r').unwrap_or(&line);

            if line.trim().is_empty() {
                continue;
            }

            let endpoint = Endpoint::parse_line(line).ok_or_else(|| ConfigError::Malformed {
                line: idx + 1,
                content: line.to_string(),
            })?;
            endpoints.push(endpoint);
        }

        Self::new(endpoints)
    }

    /// Endpoint for the `n`th dispatch.
    pub fn select(&self, n: usize) -> &Endpoint {
        &self.endpoints[n % self.endpoints.len()]
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter()
    }
}
