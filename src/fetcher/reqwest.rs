use super::{fetcher::*, transport::*};

use {
    bytes::*,
    futures::future::BoxFuture,
    http::response::Response,
    std::{mem, result::Result, sync::*, task::*},
    tower::*,
};

//
// ReqwestTransport
//

/// [Transport] backed by [reqwest::Client].
///
/// The body is read chunk by chunk. If reading breaks off midway (e.g. the connection is closed
/// early) then the bytes received so far are returned rather than an error, so that a payload
/// that is shorter than its declared `Content-Length` is reported as such.
///
/// Cloning is cheap and clones share the same connection pool.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Constructor.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Service<TransportRequest> for ReqwestTransport {
    type Response = TransportResponse;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _context: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: TransportRequest) -> Self::Future {
        let client = self.client.clone();

        Box::pin(async move {
            let (parts, ()) = request.into_parts();

            let mut response = client
                .request(parts.method, parts.uri.to_string())
                .headers(parts.headers)
                .send()
                .await?;

            let status = response.status();
            let headers = mem::take(response.headers_mut());

            let mut body = BytesMut::new();
            loop {
                match response.chunk().await {
                    Ok(Some(chunk)) => body.extend_from_slice(&chunk),
                    Ok(None) => break,

                    Err(error) if error.is_body() || error.is_decode() => {
                        tracing::debug!("body broke off after {} bytes: {}", body.len(), error);
                        break;
                    }

                    Err(error) => return Err(error.into()),
                }
            }

            let mut transport_response = Response::new(Some(body.freeze()));
            *transport_response.status_mut() = status;
            *transport_response.headers_mut() = headers;
            Ok(transport_response)
        })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        Self::Failed(Arc::new(error))
    }
}

impl Default for NetworkFetcher<ReqwestTransport> {
    fn default() -> Self {
        Self::new(ReqwestTransport::default())
    }
}
