//! The request handler: frames one logical message out of a raw read
//! buffer, decodes and dispatches it, and writes exactly one response.
//!
//! Grounded on the original `TokenizeHandler::handle`: a read burst can
//! contain more than one `\n`-terminated message (the client is free to
//! pipeline writes faster than the server drains them), and the
//! contract is "latest wins" — only the last complete message in the
//! buffer is ever answered; anything older is silently discarded, not
//! queued.

use tracing::{debug, warn};

use hl_protocol::{decode_request, encode_response, RequestMessage, ResponseMessage};
use hl_tokenizers::Registry;

use crate::error::HandleOutcome;

pub const DELIMITER: u8 = b'\n';

/// Try to produce one response from `request_bytes`.
///
/// If the buffer doesn't yet end with [`DELIMITER`], nothing can be
/// decoded: returns `PartialData` with the offset of the last stale,
/// superseded delimiter (`0` if none was found, meaning keep everything).
///
/// Otherwise the buffer holds one or more complete messages. Only the
/// last one is decoded and dispatched; a response is always appended to
/// `response_sink` followed by one delimiter byte, and `Complete` is
/// returned — the caller clears its whole request buffer in that case,
/// even though only a suffix of it was actually used.
pub fn handle(registry: &Registry, request_bytes: &[u8], response_sink: &mut Vec<u8>) -> HandleOutcome {
    if request_bytes.last() != Some(&DELIMITER) {
        let ignore_length = request_bytes
            .iter()
            .rposition(|&b| b == DELIMITER)
            .map(|pos| pos + 1)
            .unwrap_or(0);
        return HandleOutcome::PartialData { ignore_length };
    }

    let segments: Vec<&[u8]> = request_bytes
        .split(|&b| b == DELIMITER)
        .filter(|segment| !segment.is_empty())
        .collect();

    let discarded = segments.len().saturating_sub(1);
    if discarded > 0 {
        warn!(discarded, "collapsing stale requests found in one read burst");
    }

    let latest = segments.last().copied().unwrap_or(&[]);

    let response = match decode_request(latest) {
        Ok(request) => dispatch(registry, &request),
        Err(e) => {
            debug!(error = %e, "request failed to decode");
            ResponseMessage::decode_failure(e.to_string())
        }
    };

    encode_response(&response, response_sink);
    response_sink.push(DELIMITER);

    HandleOutcome::Complete
}

fn dispatch(registry: &Registry, request: &RequestMessage) -> ResponseMessage {
    let Some(tokenizer) = registry.get(&request.buf_type) else {
        return ResponseMessage::echo_failure(
            request,
            format!("couldn't get tokenizer for buffer type: {}", request.buf_type),
        );
    };

    match tokenizer.tokenize(&request.buf_type, &request.buf_body, &request.additional_info) {
        Ok(tokens) => ResponseMessage::success(request, tokens),
        Err(e) => ResponseMessage::echo_failure(request, e.to_string()),
    }
}
