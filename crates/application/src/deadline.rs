use std::future::Future;
use std::time::Duration;

use ipa_notify_core::{AppError, AppResult};

/// Bounds one directory or mail call, mapping an elapsed deadline to `AppError::Timeout`.
pub(crate) async fn with_deadline<T, F>(timeout: Duration, operation: &str, call: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(format!(
            "{operation} did not complete within {timeout:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ipa_notify_core::AppError;

    use super::with_deadline;

    #[tokio::test]
    async fn completed_call_passes_through() {
        let result = with_deadline(Duration::from_secs(1), "lookup", async { Ok(7_u8) }).await;
        assert!(matches!(result, Ok(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out() {
        let result: Result<(), AppError> =
            with_deadline(Duration::from_millis(50), "user lookup", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(
            result,
            Err(AppError::Timeout(message)) if message.contains("user lookup")
        ));
    }
}
