use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::warn;

/// Receive the next value, logging any values lost to lag on the way.
/// `None` once every sender is gone.
pub async fn recv_logging_lag<T: Clone>(rx: &mut Receiver<T>, what: &str) -> Option<T> {
    loop {
        match rx.recv().await {
            Ok(value) => return Some(value),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Fell behind and lost {} {}.", skipped, what);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}
