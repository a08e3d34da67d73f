use super::{
    super::{cache::*, promise::*},
    transport::*,
};

use {
    bytes::*,
    http::{StatusCode, header::*},
    std::result::Result,
};

/// Turn a transport result into an outcome.
///
/// Checks, in order, stopping at the first that applies:
///
/// 1. Cancelled by the transport: [Cancelled](Outcome::Cancelled).
/// 2. Transport failure: [Transport](CacheError::Transport).
/// 3. Status is not 200: [InvalidStatusCode](CacheError::InvalidStatusCode).
/// 4. Payload shorter than its declared `Content-Length`:
///    [InvalidPayloadLength](CacheError::InvalidPayloadLength).
/// 5. No payload: [EmptyResponse](CacheError::EmptyResponse).
///
/// Otherwise succeeds with the payload.
pub fn validate_response(
    result: Result<TransportResponse, TransportError>,
) -> Outcome<Bytes, CacheError> {
    let response = match result {
        Ok(response) => response,
        Err(TransportError::Cancelled) => return Outcome::Cancelled,
        Err(TransportError::Failed(error)) => {
            return Outcome::Failure(CacheError::Transport(error));
        }
    };

    let status = response.status();
    if status != StatusCode::OK {
        return Outcome::Failure(CacheError::InvalidStatusCode(status));
    }

    let declared = declared_length(response.headers());
    let payload = response.into_body();

    if let (Some(declared), Some(payload)) = (declared, &payload) {
        if (payload.len() as u64) < declared {
            return Outcome::Failure(CacheError::InvalidPayloadLength {
                declared,
                received: payload.len(),
            });
        }
    }

    match payload {
        Some(payload) => Outcome::Success(payload),
        None => Outcome::Failure(CacheError::EmptyResponse),
    }
}

// Unparsable values count as undeclared.
fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
