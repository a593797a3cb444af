//! Turning a photo into an [`IdentificationResult`].
//!
//! [`InferenceAdapter`] owns the single engine session and produces raw text;
//! [`normalize`] turns that text into a fully typed result.

mod adapter;
mod normalize;
mod photo;
mod pipeline;
mod prompt;
mod result;

pub use adapter::{AdapterError, InferenceAdapter};
pub use normalize::{
    coerce, fallback_result, normalize, parse_raw, RawParse, ENGINE_FALLBACK_CONFIDENCE,
    PIPELINE_FALLBACK_CONFIDENCE,
};
pub use photo::{ContentResolver, ImageError, ImageLoader, ImageProperties, ImageSource};
pub use pipeline::{fill_empty_fields, pipeline_fallback};
pub use prompt::{build_identification_prompt, DEFAULT_PROMPT};
pub use result::{Edibility, IdentificationResult};
