pub mod asr;
pub mod docs;

pub use asr::{detect_language, transcribe_audio};
pub use docs::{docs_redirect, openapi_spec, swagger_ui};
