//! Conversion between chain requests and the transport's wire form.

use http::StatusCode;
use url::Url;

use crate::http::error::{ErrorCode, HttpError, HttpResult};
use crate::http::request::{header_key, Request};
use crate::http::response::Response;
use crate::transport::{ResponseHead, TransportOutcome, WireRequest};

impl Request {
    /// Assemble the absolute URL from scheme, host, port, path and query.
    ///
    /// Fails with `invalidRequest` when the host is missing or the parts do
    /// not form a valid URL.
    pub fn url(&self) -> Result<Url, HttpError> {
        let invalid = || HttpError::new(ErrorCode::InvalidRequest, self.clone());

        let host = self
            .host()
            .filter(|host| !host.is_empty())
            .ok_or_else(invalid)?;

        let mut url = Url::parse(&format!("{}://{}", self.scheme(), host))
            .map_err(|e| invalid().with_underlying(e))?;
        if url.cannot_be_a_base() {
            return Err(invalid());
        }
        if let Some(port) = self.port() {
            url.set_port(Some(port)).map_err(|()| invalid())?;
        }

        url.set_path(self.path());
        if !self.query().is_empty() {
            url.query_pairs_mut().extend_pairs(self.query());
        }

        Ok(url)
    }

    /// Produce the wire request handed to the transport.
    ///
    /// Body headers are merged only when the body is non-empty. An encoding
    /// failure is reported as `invalidRequest` with the encoder's error attached.
    pub fn to_wire(&self) -> Result<WireRequest, HttpError> {
        let url = self.url()?;
        let mut headers = self.headers().clone();

        let body = if self.body().is_empty() {
            None
        } else {
            headers.extend(
                self.body()
                    .headers()
                    .into_iter()
                    .map(|(name, value)| (header_key(&name), value)),
            );
            let bytes = self.body().encode().map_err(|e| {
                HttpError::new(ErrorCode::InvalidRequest, self.clone()).with_underlying(e)
            })?;
            Some(bytes)
        };

        Ok(WireRequest {
            method: self.method().clone(),
            url,
            headers,
            body,
        })
    }
}

/// Translate a transport outcome for `request` into a result.
///
/// An error wins over any response metadata, but the metadata is kept on the
/// error. With neither error nor metadata the response is unusable.
pub fn translate_outcome(request: Request, outcome: TransportOutcome) -> HttpResult {
    let TransportOutcome {
        data,
        response,
        error,
    } = outcome;

    if let Some(error) = error {
        let captured = response.and_then(|head| build_response(&request, head, data));
        return Err(HttpError::new(error.code(), request)
            .with_response(captured)
            .with_underlying(error));
    }

    match response {
        Some(head) => build_response(&request, head, data)
            .ok_or_else(|| HttpError::new(ErrorCode::InvalidResponse, request)),
        None => Err(HttpError::new(ErrorCode::InvalidResponse, request)),
    }
}

fn build_response(request: &Request, head: ResponseHead, data: Option<Vec<u8>>) -> Option<Response> {
    let status = StatusCode::from_u16(head.status).ok()?;
    Some(Response::new(request.clone(), status, head.headers, data))
}
