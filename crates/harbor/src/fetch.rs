// ABOUTME: Static HTTP fetching with spoofed browser headers, charset decoding, and a private-network guard.
// ABOUTME: Non-2xx responses become Fetch errors carrying the upstream status, never panics.

use std::collections::HashMap;
use std::net::IpAddr;

use bytes::Bytes;
use ipnet::{Ipv4Net, Ipv6Net};

use crate::error::HarborError;
use crate::sources::FetchStrategy;

/// Several upstreams reject or alter behavior for non-browser clients, so
/// every static fetch presents a realistic desktop browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str = "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7";

/// Options for one static fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub headers: HashMap<String, String>,
    pub allow_private_networks: bool,
}

/// Result of a successful static fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResult {
    /// Decode the body to text, honoring the content-type charset and
    /// falling back to detection (the Korean upstreams serve EUC-KR).
    pub fn text(&self) -> String {
        decode_body(&self.body, self.content_type.as_deref())
    }
}

/// Check if an IP address is in a private/reserved range.
fn is_private_ip(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(ip) => {
            // RFC1918 private ranges
            let private_10: Ipv4Net = "10.0.0.0/8".parse().unwrap();
            let private_172: Ipv4Net = "172.16.0.0/12".parse().unwrap();
            let private_192: Ipv4Net = "192.168.0.0/16".parse().unwrap();
            // Loopback
            let loopback: Ipv4Net = "127.0.0.0/8".parse().unwrap();
            // Link-local
            let link_local: Ipv4Net = "169.254.0.0/16".parse().unwrap();

            private_10.contains(ip)
                || private_172.contains(ip)
                || private_192.contains(ip)
                || loopback.contains(ip)
                || link_local.contains(ip)
        }
        IpAddr::V6(ip) => {
            if ip.is_loopback() {
                return true;
            }
            let unique_local: Ipv6Net = "fc00::/7".parse().unwrap();
            let link_local: Ipv6Net = "fe80::/10".parse().unwrap();

            unique_local.contains(ip) || link_local.contains(ip)
        }
    }
}

/// Decode body bytes to a String using the content-type charset or detection.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(ct) = content_type {
        if let Some(charset) = extract_charset(ct) {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = encoding.decode(body);
                return decoded.into_owned();
            }
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract charset value from a Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    let lower = content_type.to_lowercase();
    for part in lower.split(';') {
        let trimmed = part.trim();
        if let Some(charset) = trimmed.strip_prefix("charset=") {
            let charset = charset.trim_matches('"').trim_matches('\'');
            return Some(charset.to_string());
        }
    }
    None
}

/// Validates the target URL and refuses private addresses unless allowed.
async fn guard_url(url: &str, opts: &FetchOptions) -> Result<url::Url, HarborError> {
    if url.is_empty() {
        return Err(HarborError::invalid_url(url, "FetchStatic", None));
    }

    let parsed = url::Url::parse(url).map_err(|e| {
        HarborError::invalid_url(url, "FetchStatic", Some(anyhow::anyhow!("invalid URL: {}", e)))
    })?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(HarborError::invalid_url(
            url,
            "FetchStatic",
            Some(anyhow::anyhow!("scheme must be http or https")),
        ));
    }

    if !opts.allow_private_networks {
        if let Some(host) = parsed.host_str() {
            if let Ok(ip) = host.parse::<IpAddr>() {
                if is_private_ip(&ip) {
                    return Err(HarborError::ssrf(
                        url,
                        "FetchStatic",
                        Some(anyhow::anyhow!("private IP addresses are not allowed")),
                    ));
                }
            } else {
                let port = parsed
                    .port()
                    .unwrap_or(if scheme == "https" { 443 } else { 80 });
                let addrs = tokio::net::lookup_host((host, port)).await.map_err(|e| {
                    HarborError::fetch(
                        url,
                        "FetchStatic",
                        Some(anyhow::anyhow!("DNS lookup failed: {}", e)),
                    )
                })?;
                for socket_addr in addrs {
                    if is_private_ip(&socket_addr.ip()) {
                        return Err(HarborError::ssrf(
                            url,
                            "FetchStatic",
                            Some(anyhow::anyhow!("private IP addresses are not allowed")),
                        ));
                    }
                }
            }
        }
    }

    Ok(parsed)
}

/// Fetch a static source document.
///
/// Issues a GET or form POST per the strategy, injecting the
/// STARTDATE/ENDDATE pair where the source accepts a range. A non-2xx
/// response converts to a Fetch error carrying the status so the caller
/// can report and skip just this source.
pub async fn fetch_static(
    client: &reqwest::Client,
    strategy: &FetchStrategy,
    dates: (&str, &str),
    opts: &FetchOptions,
) -> Result<FetchResult, HarborError> {
    let url = strategy.url();
    guard_url(url, opts).await?;

    let (start, end) = dates;
    let mut request = match strategy {
        FetchStrategy::StaticGet { url, date_params } => {
            let mut req = client.get(url);
            if *date_params {
                req = req.query(&[("STARTDATE", start), ("ENDDATE", end)]);
            }
            req
        }
        FetchStrategy::StaticPost {
            url,
            form,
            date_params,
        } => {
            let mut fields: Vec<(String, String)> = form
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            fields.sort();
            if *date_params {
                fields.push(("STARTDATE".to_string(), start.to_string()));
                fields.push(("ENDDATE".to_string(), end.to_string()));
            }
            client.post(url).form(&fields)
        }
        FetchStrategy::Browser { .. } => {
            return Err(HarborError::invalid_url(
                url,
                "FetchStatic",
                Some(anyhow::anyhow!("browser strategy is not a static fetch")),
            ));
        }
    };

    request = request
        .header("Accept", BROWSER_ACCEPT)
        .header("Accept-Language", BROWSER_ACCEPT_LANGUAGE)
        .header("Cache-Control", "no-cache")
        .header("Pragma", "no-cache");
    for (key, value) in &opts.headers {
        request = request.header(key, value);
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            HarborError::timeout(url, "FetchStatic", Some(anyhow::anyhow!("{}", e)))
        } else {
            HarborError::fetch(url, "FetchStatic", Some(anyhow::anyhow!("request failed: {}", e)))
        }
    })?;

    // Re-check the landing host after redirects.
    if !opts.allow_private_networks {
        if let Some(host) = response.url().host_str() {
            if let Ok(ip) = host.parse::<IpAddr>() {
                if is_private_ip(&ip) {
                    return Err(HarborError::ssrf(
                        url,
                        "FetchStatic",
                        Some(anyhow::anyhow!("redirect to private IP is not allowed")),
                    ));
                }
            }
        }
    }

    let status = response.status();
    let final_url = response.url().to_string();
    if !status.is_success() {
        return Err(HarborError::fetch_status(url, "FetchStatic", status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let body = response.bytes().await.map_err(|e| {
        HarborError::fetch(
            url,
            "FetchStatic",
            Some(anyhow::anyhow!("failed to read body: {}", e)),
        )
    })?;

    Ok(FetchResult {
        status: status.as_u16(),
        final_url,
        content_type,
        body,
    })
}
