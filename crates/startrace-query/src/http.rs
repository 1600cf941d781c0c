//! Blocking HTTP transport for a bitmap index server's JSON API.
//!
//! Endpoints used:
//! - `POST /index/{index}/query` with the PQL text as body
//! - `GET /schema`

use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use url::Url;

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::query::Query;
use crate::response::{QueryResponse, QueryResponseWire};
use crate::schema::{Schema, SchemaInfo};
use crate::transport::{QueryOptions, Transport};

pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        let base = Url::parse(&config.uri.normalize())?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn query_url(&self, index: &str, options: &QueryOptions) -> Result<Url, TransportError> {
        let mut url = self.base.join(&format!("index/{index}/query"))?;
        let flags = [
            ("columnAttrs", options.column_attrs),
            ("excludeAttrs", options.exclude_attrs),
            ("excludeBits", options.exclude_bits),
        ];
        if flags.iter().any(|(_, on)| *on) {
            let mut pairs = url.query_pairs_mut();
            for (name, on) in flags {
                if on {
                    pairs.append_pair(name, "true");
                }
            }
        }
        Ok(url)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Read the body of a response, turning non-2xx statuses into `Server` errors.
fn read_body(resp: Response) -> Result<String, TransportError> {
    let status = resp.status();
    let text = resp.text()?;
    if status.is_success() {
        return Ok(text);
    }
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or_else(|_| text.trim().to_string());
    tracing::warn!(status = status.as_u16(), error = %message, "server rejected request");
    Err(TransportError::Server {
        status: status.as_u16(),
        message,
    })
}

impl Transport for HttpTransport {
    fn query(
        &self,
        index: &str,
        query: &Query,
        options: &QueryOptions,
    ) -> Result<QueryResponse, TransportError> {
        let url = self.query_url(index, options)?;
        let resp = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "text/plain")
            .body(query.to_pql())
            .send()?;
        let body = read_body(resp)?;
        let wire: QueryResponseWire = serde_json::from_str(&body)
            .map_err(|e| TransportError::InvalidResponse(format!("query response: {e}")))?;
        wire.into_response(query.result_kind())
    }

    fn schema(&self) -> Result<Schema, TransportError> {
        let url = self.base.join("schema")?;
        let resp = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()?;
        let body = read_body(resp)?;
        let info: SchemaInfo = serde_json::from_str(&body)
            .map_err(|e| TransportError::InvalidResponse(format!("schema response: {e}")))?;
        Ok(Schema::from(info))
    }
}
