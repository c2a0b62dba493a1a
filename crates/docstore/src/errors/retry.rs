/// Classification for retry policy.
///
/// Used by [`RetryPolicy`](crate::retry::RetryPolicy) to decide whether a
/// failed remote call is attempted again.
///
/// | Class | Retried? | Backoff before next attempt? |
/// |-------|----------|------------------------------|
/// | `Never` | No | - |
/// | `WithBackoff` | Yes, until attempts run out | Random, up to the configured maximum |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - missing workspace/document, bad credentials, malformed
    /// request or response. Another attempt would fail the same way.
    Never,

    /// Communication or server-side failure (connect error, timeout, 5xx,
    /// 429, revision conflict). Wait a random interval and try again.
    WithBackoff,
}
