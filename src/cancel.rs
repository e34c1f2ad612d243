use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Runs `fut` to completion unless `cancel` fires first, in which case the
/// future is dropped and `cancelled()` supplies the error.
pub(crate) async fn run_cancellable<T, E, F>(
    cancel: &CancellationToken,
    fut: F,
    cancelled: impl FnOnce() -> E,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(cancelled()),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn returns_inner_result_when_not_cancelled() {
        let cancel = CancellationToken::new();
        let result: Result<u8, &str> =
            run_cancellable(&cancel, async { Ok(7) }, || "cancelled").await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn cancelled_token_wins_over_pending_future() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<u8, &str> = run_cancellable(
            &cancel,
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(1)
            },
            || "cancelled",
        )
        .await;
        assert_eq!(result, Err("cancelled"));
    }
}
