//! AWS Lambda adapter.
//!
//! Feeds runtime invocations into a shared [`Function`].

use std::sync::Arc;
use std::time::Duration;

use lambda_runtime::{service_fn, Error as LambdaError, LambdaEvent};
use serde_json::Value;
use tracing::debug;

use crate::function::Function;

/// Time kept back from the runtime deadline so the 504 reaches the caller.
const DEADLINE_MARGIN_MS: u64 = 250;

/// Runs the Lambda event loop until the runtime shuts the environment down.
pub async fn run(function: Arc<Function>) -> Result<(), LambdaError> {
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let function = Arc::clone(&function);
        async move {
            let now_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
            let budget = budget_for(function.budget(), event.context.deadline, now_ms);
            debug!(
                request_id = %event.context.request_id,
                budget_ms = budget.as_millis() as u64,
                "invocation received"
            );
            Ok::<Value, LambdaError>(function.handle_within(event.payload, budget).await)
        }
    }))
    .await
}

/// The configured budget, capped by what remains before the runtime deadline.
pub fn budget_for(configured: Duration, deadline_ms: u64, now_ms: u64) -> Duration {
    let remaining = deadline_ms
        .saturating_sub(now_ms)
        .saturating_sub(DEADLINE_MARGIN_MS);
    configured.min(Duration::from_millis(remaining))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_uses_configured_when_deadline_is_far() {
        let budget = budget_for(Duration::from_secs(10), 1_000_000, 0);
        assert_eq!(budget, Duration::from_secs(10));
    }

    #[test]
    fn test_budget_is_capped_by_deadline() {
        let budget = budget_for(Duration::from_secs(10), 5_000, 2_000);
        assert_eq!(budget, Duration::from_millis(2_750));
    }

    #[test]
    fn test_budget_past_deadline_is_zero() {
        assert_eq!(budget_for(Duration::from_secs(10), 1_000, 5_000), Duration::ZERO);
    }
}
