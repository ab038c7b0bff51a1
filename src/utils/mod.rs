pub mod logging;
pub mod text;

pub use logging::truncate_text;
pub use text::{collapse_whitespace, normalize, truncate_chars};
