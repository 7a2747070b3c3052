//! Scoped open → call → close

use crate::envelope::Envelope;
use crate::outcome::CallResult;
use crate::transport::Session;
use tracing::{info, warn, Instrument};

/// Perform exactly one call on `session`
///
/// The session is closed on every path once `open` has been attempted. A
/// failed close after a successful call is logged and does not turn the
/// result into a failure; the remote side already completed the request.
pub async fn run_once<S>(session: &mut S, envelope: &Envelope) -> CallResult
where
    S: Session + ?Sized,
{
    let span = crate::call_span!(
        session = session.name(),
        destination = %envelope.destination,
        envelope_id = %envelope.id
    );

    async move {
        if let Err(e) = session.open().await {
            warn!("Failed to open {} session: {}", session.name(), e);
            if let Err(close_err) = session.close().await {
                warn!("Close after failed open also failed: {}", close_err);
            }
            return CallResult::from(e);
        }

        let result = session.call(envelope).await;

        if let Err(close_err) = session.close().await {
            warn!("Failed to close {} session: {}", session.name(), close_err);
        }

        let outcome = CallResult::from(result);
        info!(success = outcome.is_success(), "Call finished");
        outcome
    }
    .instrument(span)
    .await
}
