//! Reading a validated target into memory.
//!
//! Files are read with `std::fs`; URLs with a blocking `reqwest` client
//! configured with connect and read timeouts. Every handle is an owned
//! value dropped before [`Fetcher::open`] returns, on success and on error.

use once_cell::unsync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::io::Read;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::ExtractionError;
use crate::models::{InputType, Target};

/// Default HTTP connect/read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw bytes of one resource plus the hints available about it.
#[derive(Debug, Clone, Default)]
pub struct SourceBytes {
    pub bytes: Vec<u8>,
    /// File name or last URL path segment.
    pub resource_name: Option<String>,
    /// Media type declared by the transport (HTTP `Content-Type`).
    pub declared_type: Option<String>,
}

/// Opens file and HTTP targets.
///
/// The HTTP client is built on first use, so runs over local files never
/// initialise TLS.
pub struct Fetcher {
    timeout: Duration,
    client: OnceCell<Client>,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            client: OnceCell::new(),
        }
    }

    pub fn open(&self, target: &Target) -> Result<SourceBytes, ExtractionError> {
        match target.input_type() {
            InputType::File => read_file(target.as_str()),
            InputType::Http => self.get_url(target.as_str()),
        }
    }

    fn client(&self) -> Result<&Client, ExtractionError> {
        self.client.get_or_try_init(|| {
            Client::builder()
                .connect_timeout(self.timeout)
                .timeout(self.timeout)
                .user_agent(concat!("rika/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| ExtractionError::io_with_source("could not build HTTP client", e))
        })
    }

    fn get_url(&self, raw: &str) -> Result<SourceBytes, ExtractionError> {
        let url = Url::parse(raw).map_err(|e| ExtractionError::InvalidInput(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ExtractionError::InvalidInput(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }
        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => return Err(ExtractionError::InvalidInput(format!("no host in {}", raw))),
        };

        // Behind a proxy only the proxy resolves names; a local lookup
        // would misreport hosts it can reach.
        if !proxy_configured(url.scheme(), |name| std::env::var(name).ok()) {
            match url.socket_addrs(|| None) {
                Ok(addrs) if !addrs.is_empty() => {}
                _ => return Err(ExtractionError::UnknownHost { host }),
            }
        }

        debug!(url = %url, "fetching");
        let response = self
            .client()?
            .get(url.clone())
            .send()
            .map_err(|e| map_request_error(e, &host))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::io(format!("HTTP status {} for {}", status, raw)));
        }

        let declared_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .map_err(|e| ExtractionError::io_with_source(format!("reading body of {}", raw), e))?
            .to_vec();

        Ok(SourceBytes {
            bytes,
            resource_name: url_resource_name(&url),
            declared_type,
        })
    }
}

fn read_file(path: &str) -> Result<SourceBytes, ExtractionError> {
    let mut file = std::fs::File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    let resource_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string());
    Ok(SourceBytes {
        bytes,
        resource_name,
        declared_type: None,
    })
}

fn url_resource_name(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn map_request_error(err: reqwest::Error, host: &str) -> ExtractionError {
    if is_dns_failure(&err) {
        return ExtractionError::UnknownHost {
            host: host.to_string(),
        };
    }
    let message = if err.is_timeout() {
        format!("timed out connecting to {}", host)
    } else if err.is_connect() {
        format!("could not connect to {}", host)
    } else {
        format!("request to {} failed", host)
    };
    ExtractionError::io_with_source(message, err)
}

/// Whether reqwest will route `scheme` requests through a proxy taken
/// from the environment. `NO_PROXY` exclusions are not consulted, so an
/// excluded host merely skips the local pre-check.
fn proxy_configured(scheme: &str, var: impl Fn(&str) -> Option<String>) -> bool {
    let scheme_var = format!("{}_proxy", scheme.to_ascii_lowercase());
    [
        scheme_var.clone(),
        scheme_var.to_ascii_uppercase(),
        "all_proxy".to_string(),
        "ALL_PROXY".to_string(),
    ]
    .iter()
    .any(|name| var(name).is_some_and(|value| !value.trim().is_empty()))
}

/// Best-effort: reqwest exposes no DNS error kind, so this matches the
/// resolver's message text anywhere in the source chain. Anything it
/// misses is reported as an I/O failure.
fn is_dns_failure(err: &reqwest::Error) -> bool {
    let mut source: Option<&dyn std::error::Error> = Some(err);
    while let Some(e) = source {
        let text = e.to_string();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return true;
        }
        source = e.source();
    }
    false
}
