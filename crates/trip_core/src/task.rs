use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The fixed set of generation operations. Each kind selects one prompt
/// template and one output schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    Itinerary,
    Checklist,
    CommCard,
    SensoryProfile,
    Reshuffle,
    Script,
}

impl TaskKind {
    pub const ALL: [TaskKind; 6] = [
        TaskKind::Itinerary,
        TaskKind::Checklist,
        TaskKind::CommCard,
        TaskKind::SensoryProfile,
        TaskKind::Reshuffle,
        TaskKind::Script,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Itinerary => "itinerary",
            TaskKind::Checklist => "checklist",
            TaskKind::CommCard => "comm_card",
            TaskKind::SensoryProfile => "sensory_profile",
            TaskKind::Reshuffle => "reshuffle",
            TaskKind::Script => "script",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generation request payload, one variant per task kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    /// Free-form trip idea, e.g. "3 days in Kyoto, love temples".
    Itinerary { idea: String },
    Checklist {
        destination: String,
        trip_title: String,
        /// Accessibility flags of the trip, passed through as given.
        accessibility: Value,
    },
    CommCard {
        place: String,
        dietary: String,
        language: String,
    },
    SensoryProfile { location: String },
    Reshuffle {
        /// Partially structured itinerary as held by the caller.
        itinerary: Value,
        constraint: String,
    },
    Script { context: String },
}

impl Task {
    pub fn kind(&self) -> TaskKind {
        match self {
            Task::Itinerary { .. } => TaskKind::Itinerary,
            Task::Checklist { .. } => TaskKind::Checklist,
            Task::CommCard { .. } => TaskKind::CommCard,
            Task::SensoryProfile { .. } => TaskKind::SensoryProfile,
            Task::Reshuffle { .. } => TaskKind::Reshuffle,
            Task::Script { .. } => TaskKind::Script,
        }
    }
}
