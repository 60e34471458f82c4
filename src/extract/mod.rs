//! Extract stage: bilayer shorthand stripping and per-contrast layer
//! extraction.

pub mod model_extractor;
pub mod stack_tokens;

pub use model_extractor::{infer_bulk_name, normalize_layer, ModelExtractor, KNOWN_BULKS};
pub use stack_tokens::{extract_bilayers, strip_bilayer_tokens};
