use reqwest::header::{HeaderMap, ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Response};
use tracing::{debug, warn};

use crate::error::{GrabError, Result};
use crate::mime::get_file_extension;
use crate::transfer::Transfer;
use crate::utils::{filename_from_content_disposition, split_last_dot};

/// Learns size, name, type and range support of a resource.
#[derive(Clone)]
pub struct Prober {
    client: Client,
}

impl Prober {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Probes `url` with HEAD, retrying as a plain GET for servers that reject HEAD.
    ///
    /// A transfer flagged as not range capable is still returned; callers check
    /// [`Transfer::range_support`].
    pub async fn probe(&self, url: &str) -> Result<Transfer> {
        let response = self.head_or_get(url).await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(GrabError::status(url, status));
        }

        let transfer = transfer_from_headers(url, response.headers());
        debug!(
            url,
            size = transfer.size,
            file = %transfer.file_name(),
            accepts_ranges = transfer.accepts_ranges,
            "probed"
        );
        if let Err(e) = transfer.range_support() {
            warn!(url, "{}", e);
        }

        Ok(transfer)
    }

    async fn head_or_get(&self, url: &str) -> Result<Response> {
        match self.client.head(url).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(resp),
            Ok(resp) => debug!(url, status = %resp.status(), "HEAD rejected, retrying with GET"),
            Err(e) => debug!(url, error = %e, "HEAD failed, retrying with GET"),
        }

        // The body is never read; dropping the response closes the connection.
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| GrabError::request(url, e))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: impl reqwest::header::AsHeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Builds a transfer descriptor out of response headers.
pub fn transfer_from_headers(url: &str, headers: &HeaderMap) -> Transfer {
    let mut transfer = Transfer::new(url);

    let mut disposition_ext = None;
    if let Some(filename) = header_str(headers, CONTENT_DISPOSITION).and_then(filename_from_content_disposition) {
        let (stem, ext) = split_last_dot(&filename);
        transfer.name = stem.to_string();
        disposition_ext = ext.map(str::to_string);
    }

    let type_ext = header_str(headers, CONTENT_TYPE)
        .filter(|ct| !ct.trim().is_empty())
        .map(|ct| get_file_extension(ct).to_string());
    // The content type decides; the suggested name's extension only fills in when it is absent.
    transfer.ext = type_ext.or(disposition_ext);

    // The header is read directly: for HEAD responses the body size hint is always 0.
    transfer.size = header_str(headers, CONTENT_LENGTH)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);

    transfer.accepts_ranges = header_str(headers, ACCEPT_RANGES) == Some("bytes");

    transfer
}
