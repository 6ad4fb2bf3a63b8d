//! Crypto module for FHE operations

mod codec;
mod keys;
#[cfg(test)]
pub(crate) mod test_helpers;
mod values;

pub use codec::*;
pub use keys::*;
pub use values::*;

use tokio::sync::Semaphore;

use crate::error::FhevmError;

/// Run FHE work on the blocking pool, holding a permit from `permits` when
/// one is configured.
pub async fn run_cpu_bound<T, F>(permits: Option<&Semaphore>, task: F) -> Result<T, FhevmError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, FhevmError> + Send + 'static,
{
    let _permit = match permits {
        Some(semaphore) => Some(
            semaphore
                .acquire()
                .await
                .map_err(|_| FhevmError::Internal("CPU limiter closed".to_string()))?,
        ),
        None => None,
    };
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|error| FhevmError::Internal(format!("blocking task failed: {error}")))?
}
