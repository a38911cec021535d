//! Stream chunk decoder
//!
//! Turns an open [`StreamHandle`] into a lazy stream of text fragments:
//!
//! - each pull reads exactly one [`RawStreamUnit`] and discards it before the
//!   next pull, so memory does not grow with stream length
//! - the configured sentinel ends the stream; nothing after it is read
//! - malformed units are logged and skipped
//! - the handle is closed exactly once on every exit path, including when the
//!   caller drops the stream early

mod decoder;
mod guard;

pub use decoder::{decode_unit, DecodeError, DecodedChunk, StreamFraming};
pub use guard::HandleGuard;

use crate::http::StreamHandle;
use crate::providers::ProviderResult;
use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

/// Lazy, single-pass sequence of text fragments
pub type ChatStream = Pin<Box<dyn Stream<Item = ProviderResult<String>> + Send>>;

struct DecoderState {
    guard: HandleGuard,
    framing: Arc<StreamFraming>,
    fragments: usize,
    skipped: usize,
}

impl DecoderState {
    fn finish(&mut self, reason: &'static str) {
        debug!(
            reason,
            fragments = self.fragments,
            skipped = self.skipped,
            "stream finished"
        );
        self.guard.release();
    }
}

/// Decode a stream handle into text fragments.
///
/// The returned stream owns the handle. Transport errors are yielded once and
/// end the stream.
pub fn decode_stream(handle: Box<dyn StreamHandle>, framing: Arc<StreamFraming>) -> ChatStream {
    let state = DecoderState {
        guard: HandleGuard::new(handle),
        framing,
        fragments: 0,
        skipped: 0,
    };

    let fragments = stream::unfold(state, |mut state| async move {
        loop {
            let next = match state.guard.handle_mut() {
                Some(handle) => handle.next_unit().await,
                None => return None,
            };

            let unit = match next {
                None => {
                    state.finish("exhausted");
                    return None;
                }
                Some(Err(e)) => {
                    warn!(code = "STREAM_TRANSPORT_ERROR", "stream aborted: {}", e);
                    state.finish("transport_error");
                    return Some((Err(e), state));
                }
                Some(Ok(unit)) => unit,
            };

            match decode_unit(&state.framing, &unit) {
                None => continue,
                Some(DecodedChunk::End) => {
                    state.finish("sentinel");
                    return None;
                }
                Some(DecodedChunk::DecodeError(err)) => {
                    state.skipped += 1;
                    warn!(code = "STREAM_DECODE_ERROR", raw = %err.raw, "skipping unit: {}", err.reason);
                    continue;
                }
                Some(DecodedChunk::Text(text)) => {
                    state.fragments += 1;
                    return Some((Ok(text), state));
                }
            }
        }
    });

    Box::pin(fragments.fuse())
}
