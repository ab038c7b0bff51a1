pub mod action_executor;
pub mod answer_resolver;
pub mod detail_extractor;
pub mod event_log;
pub mod fallback_rules;
pub mod form_inspector;
pub mod listing_extractor;
pub mod llm_service;
pub mod page_classifier;
pub mod page_fetcher;

pub use action_executor::{ActionExecutor, ContainerProbe};
pub use answer_resolver::{AnswerResolver, RetryPolicy};
pub use detail_extractor::DetailExtractor;
pub use event_log::EventLog;
pub use fallback_rules::fallback_answers;
pub use form_inspector::{FormInspector, OptionLabelStrategy};
pub use listing_extractor::ListingExtractor;
pub use llm_service::{InferenceClient, InferenceError, LlmService};
pub use page_classifier::{ClassifierMarkers, PageClassifier};
pub use page_fetcher::{PageFetcher, RenderedPage};
