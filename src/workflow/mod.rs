pub mod apply_ctx;
pub mod apply_flow;
pub mod progress;
pub mod session;

pub use apply_ctx::ApplyCtx;
pub use apply_flow::{ApplyFlow, ApplyOutcome, REASON_ALREADY_APPLIED, REASON_NO_EASY_APPLY};
pub use progress::{ProgressEvent, ProgressSink};
pub use session::{ApplySession, BrowserApplySession};
