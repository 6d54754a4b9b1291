//! # Audio Ingestion Module
//!
//! Turns uploaded payloads into the 16 kHz mono f32 PCM the inference
//! pipeline expects.
//!
//! ## Two ingestion paths:
//! - **`encode=true`** (default): the payload is piped through the external
//!   ffmpeg binary, which handles every container/codec ffmpeg knows about
//!   (`ffmpeg` module)
//! - **`encode=false`**: the payload must be a WAV file; it is parsed,
//!   downmixed and resampled in-process (`decoder` module)
//!
//! Sample-level conversion and validation helpers live in `processor`.

pub mod decoder;
pub mod ffmpeg;
pub mod processor;
