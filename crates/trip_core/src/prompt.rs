//! Deterministic prompt construction.
//!
//! Layout of every prompt:
//! 1. persona and the JSON-only output contract
//! 2. task instruction
//! 3. literal example of the expected shape (from the schema table)
//! 4. accessibility block, only when constraints carry a non-blank field
//! 5. the task payload

use crate::models::UserConstraints;
use crate::schema::{schema_for, Schema};
use crate::task::{Task, TaskKind};
use serde_json::Value;
use std::fmt::Write;

const OUTPUT_CONTRACT: &str =
    "Your only output format is JSON. Do not include any text before or after the JSON object.";

/// Prompt text bound to the schema its answer is validated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    kind: TaskKind,
    text: String,
}

impl Prompt {
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn schema(&self) -> &'static Schema {
        schema_for(self.kind)
    }
}

fn persona(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Itinerary => {
            "You are a world-class travel planning API for travelers with accessibility needs."
        }
        TaskKind::Checklist => "You are a meticulous accessible-travel preparation assistant.",
        TaskKind::CommCard => {
            "You are a travel communication assistant who writes clear, polite cards for restaurant staff."
        }
        TaskKind::SensoryProfile => {
            "You are an accessibility analyst who rates how demanding places are for noise, light and crowd sensitive travelers."
        }
        TaskKind::Reshuffle => "You are an energy-aware travel pacing assistant.",
        TaskKind::Script => {
            "You are a social coach who prepares travelers for everyday conversations abroad."
        }
    }
}

fn instruction(task: &Task) -> String {
    match task {
        Task::Itinerary { .. } => "Based on the user's request, generate a travel itinerary. \
             Give every activity the real latitude and longitude of the place for its map pin."
            .to_string(),
        Task::Checklist { .. } => "Create a packing and preparation checklist for the trip below. \
             Each entry is one short, actionable item."
            .to_string(),
        Task::CommCard { language, .. } => format!(
            "Write a short card the traveler can show at the place below explaining their dietary needs. \
             Put the English text in \"en\" and the same text translated into {language} in \"jp\"."
        ),
        Task::SensoryProfile { .. } => {
            "Estimate the sensory load a visitor experiences at the location below.".to_string()
        }
        Task::Reshuffle { .. } => "The traveler is following the itinerary below and needs to adjust today's plan. \
             Pick the one activity that fits the constraint worst and propose a gentler alternative. \
             Put the activity to drop in \"replace\" and the alternative in \"suggestion\"."
            .to_string(),
        Task::Script { .. } => "Write a short dialogue script for the situation below: lines the traveler can say in \"user\", \
             likely replies from staff in \"staff\", and one practical tip in \"tips\"."
            .to_string(),
    }
}

fn render_json(value: &Value) -> String {
    match value {
        Value::Null => "none specified".to_string(),
        other => other.to_string(),
    }
}

fn payload(task: &Task) -> String {
    match task {
        Task::Itinerary { idea } => format!("User's request: \"{idea}\""),
        Task::Checklist {
            destination,
            trip_title,
            accessibility,
        } => format!(
            "Trip: \"{trip_title}\" to {destination}\nAccessibility: {}",
            render_json(accessibility)
        ),
        Task::CommCard {
            place,
            dietary,
            language,
        } => format!("Place: {place}\nDietary needs: {dietary}\nLanguage: {language}"),
        Task::SensoryProfile { location } => format!("Location: {location}"),
        Task::Reshuffle {
            itinerary,
            constraint,
        } => format!(
            "Constraint: {constraint}\nItinerary: {}",
            render_json(itinerary)
        ),
        Task::Script { context } => format!("Situation: {context}"),
    }
}

/// Builds the prompt for `task`.
///
/// `constraints` adds the accessibility block; passing `None` or a record
/// without any non-blank field leaves the block out entirely.
pub fn build_prompt(task: &Task, constraints: Option<&UserConstraints>) -> Prompt {
    let kind = task.kind();
    let schema = schema_for(kind);
    let mut text = String::new();

    let _ = writeln!(text, "{} {}", persona(kind), OUTPUT_CONTRACT);
    let _ = writeln!(text, "{}", instruction(task));
    for (name, min, max) in schema.score_fields() {
        let _ = writeln!(text, "\"{name}\" is a number from {min} to {max}.");
    }
    let _ = writeln!(text, "The JSON object must follow this exact structure:");
    let _ = writeln!(text, "{}", schema.example);

    if let Some(entries) = constraints.map(UserConstraints::entries) {
        if !entries.is_empty() {
            let _ = writeln!(
                text,
                "\nThe traveler has these accessibility needs. Every suggestion must respect them:"
            );
            for (label, value) in entries {
                let _ = writeln!(text, "- {label}: {value}");
            }
        }
    }

    let _ = write!(text, "\n{}", payload(task));

    Prompt { kind, text }
}
