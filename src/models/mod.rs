pub mod form;
pub mod job;
pub mod job_posting;
pub mod loaders;
pub mod page_state;
pub mod profile;

pub use form::{
    Answer, AnswerSource, Dropdown, FieldKind, FormAnswers, FormField, FormInventory, RadioGroup,
    ResolvedAnswers,
};
pub use job::{
    JobHandle, JobParams, JobRecord, JobStatus, JobType, LogEntry, LogLevel, QueueStatus,
    ScrapeSummary,
};
pub use job_posting::{ApplyType, JobPosting, ListingCandidate, WorkplaceType};
pub use loaders::{load_profile, parse_profile};
pub use page_state::{ContainerSnapshot, PageState};
pub use profile::{ApplicantProfile, Education, Experience, Language, ProficiencyLevel};
