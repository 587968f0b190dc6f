//! Wire types of the generation service.

pub mod gemini;
