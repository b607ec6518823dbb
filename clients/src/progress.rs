/// Fire-and-forget progress reporting. Implementations must never influence
/// pipeline control flow.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, stage: &str, detail: &str);
}

/// Default sink that forwards progress to the log stream.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_progress(&self, stage: &str, detail: &str) {
        tracing::info!(stage, detail, "progress");
    }
}
