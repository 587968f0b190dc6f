//! trip_core - Core types for the trip planner generation pipeline
//!
//! This crate is free of I/O and provides:
//! - `models` - Itinerary, constraint and result types
//! - `task` - TaskKind and the per-task request payloads
//! - `schema` - the schema table shared by prompting and validation
//! - `prompt` - deterministic prompt construction
//! - `validate` - decoding raw model output into validated results

pub mod models;
pub mod prompt;
pub mod schema;
pub mod task;
pub mod validate;

pub use models::{
    Activity, Checklist, CommCard, Day, GenerationResult, Itinerary, PersistedTrip,
    ReshuffleSuggestion, SensoryProfile, SocialScript, UserConstraints,
};
pub use prompt::{build_prompt, Prompt};
pub use schema::{schema_for, Field, FieldType, Schema};
pub use task::{Task, TaskKind};
pub use validate::{RawOutput, ValidationError};
