//! Minimal HTTP/1 GET over a fresh TCP connection.

use std::time::Duration;

use bytes::Bytes;
use http::header::{HOST, USER_AGENT};
use http::{Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Empty};
use tracing::debug;

use crate::error::{FetchError, FetchResult};

const AGENT: &str = concat!("lake-supervisor/", env!("CARGO_PKG_VERSION"));

/// A fully-read response.
#[derive(Debug)]
pub(crate) struct Response {
    pub status: StatusCode,
    pub body: Bytes,
}

/// GET `uri`, bounded by `timeout` end to end (connect, headers, body).
pub(crate) async fn get(uri: &Uri, timeout: Duration) -> FetchResult<Response> {
    let url = uri.to_string();
    let authority = uri
        .authority()
        .ok_or_else(|| FetchError::InvalidUrl {
            url: url.clone(),
            reason: "missing host".to_string(),
        })?
        .clone();
    let host = authority
        .host()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = authority.port_u16().unwrap_or(80);
    let path = uri.path_and_query().map_or("/", |p| p.as_str()).to_string();

    let result = tokio::time::timeout(timeout, async {
        let stream = tokio::net::TcpStream::connect((host.as_str(), port))
            .await
            .map_err(|source| FetchError::Connect {
                address: authority.to_string(),
                source,
            })?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|source| FetchError::Http {
                url: url.clone(),
                source,
            })?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "metrics connection closed with error");
            }
        });

        let req = Request::builder()
            .method(Method::GET)
            .uri(path.as_str())
            .header(HOST, authority.as_str())
            .header(USER_AGENT, AGENT)
            .body(Empty::<Bytes>::new())?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|source| FetchError::Http {
                url: url.clone(),
                source,
            })?;
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|source| FetchError::Http {
                url: url.clone(),
                source,
            })?
            .to_bytes();

        Ok::<_, FetchError>(Response { status, body })
    })
    .await;

    match result {
        Ok(resp) => resp,
        Err(_) => Err(FetchError::Timeout {
            url,
            after: timeout,
        }),
    }
}
