//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trip_core::{PersistedTrip, Task, UserConstraints};

/// The generate body is the trip idea as raw text. A JSON string literal is
/// unquoted first.
pub fn trip_idea_from_body(body: &str) -> String {
    match serde_json::from_str::<String>(body) {
        Ok(unquoted) => unquoted,
        Err(_) => body.to_string(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTripRequest {
    pub itinerary: Value,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Deserialize)]
pub struct MockPricesRequest {
    #[serde(default)]
    pub destination: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistRequest {
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub trip_title: String,
    /// `{mobility?, sensory?, dietary?: bool}` as sent by the client.
    #[serde(default)]
    pub accessibility: Value,
}

impl From<ChecklistRequest> for Task {
    fn from(req: ChecklistRequest) -> Self {
        Task::Checklist {
            destination: req.destination,
            trip_title: req.trip_title,
            accessibility: req.accessibility,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommCardRequest {
    #[serde(default)]
    pub place: String,
    #[serde(default)]
    pub dietary: String,
    #[serde(default)]
    pub language: String,
}

impl From<CommCardRequest> for Task {
    fn from(req: CommCardRequest) -> Self {
        Task::CommCard {
            place: req.place,
            dietary: req.dietary,
            language: req.language,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SensoryProfileRequest {
    #[serde(default)]
    pub location: String,
}

impl From<SensoryProfileRequest> for Task {
    fn from(req: SensoryProfileRequest) -> Self {
        Task::SensoryProfile {
            location: req.location,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReshuffleDayRequest {
    #[serde(default)]
    pub itinerary: Value,
    #[serde(default)]
    pub constraint: String,
}

impl From<ReshuffleDayRequest> for Task {
    fn from(req: ReshuffleDayRequest) -> Self {
        Task::Reshuffle {
            itinerary: req.itinerary,
            constraint: req.constraint,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScriptRequest {
    #[serde(default)]
    pub context: String,
}

impl From<ScriptRequest> for Task {
    fn from(req: ScriptRequest) -> Self {
        Task::Script {
            context: req.context,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobilityForm {
    #[serde(default)]
    pub wheelchair: bool,
    #[serde(default)]
    pub avoid_stairs: bool,
    #[serde(default)]
    pub frequent_rests: bool,
}

/// 0-100 sliders: 0 prefers quiet and calm, 100 handles crowds and bright
/// surroundings.
#[derive(Debug, Default, Deserialize)]
pub struct SensoryForm {
    #[serde(default)]
    pub noise: f64,
    #[serde(default)]
    pub visual: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MobilityField {
    Text(String),
    Form(MobilityForm),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SensoryField {
    Text(String),
    Form(SensoryForm),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DietaryField {
    Text(String),
    Tags(Vec<String>),
}

/// Onboarding answers. Each field is either free text or the structured form
/// the onboarding dialog sends.
#[derive(Debug, Default, Deserialize)]
pub struct SaveProfileRequest {
    #[serde(default)]
    pub mobility: Option<MobilityField>,
    #[serde(default)]
    pub sensory: Option<SensoryField>,
    #[serde(default)]
    pub dietary: Option<DietaryField>,
}

fn non_blank(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn join_parts(parts: Vec<String>) -> Option<String> {
    non_blank(parts.join(", "))
}

impl MobilityField {
    fn describe(self) -> Option<String> {
        match self {
            MobilityField::Text(text) => non_blank(text),
            MobilityField::Form(form) => {
                let mut parts = Vec::new();
                if form.wheelchair {
                    parts.push("wheelchair user".to_string());
                }
                if form.avoid_stairs {
                    parts.push("avoids stairs".to_string());
                }
                if form.frequent_rests {
                    parts.push("needs frequent rests".to_string());
                }
                join_parts(parts)
            }
        }
    }
}

impl SensoryField {
    fn describe(self) -> Option<String> {
        match self {
            SensoryField::Text(text) => non_blank(text),
            SensoryField::Form(form) => Some(format!(
                "noise tolerance {}/100, visual stimulation tolerance {}/100",
                form.noise.clamp(0.0, 100.0),
                form.visual.clamp(0.0, 100.0)
            )),
        }
    }
}

impl DietaryField {
    fn describe(self) -> Option<String> {
        match self {
            DietaryField::Text(text) => non_blank(text),
            DietaryField::Tags(tags) => join_parts(
                tags.into_iter()
                    .filter_map(non_blank)
                    .collect(),
            ),
        }
    }
}

impl SaveProfileRequest {
    pub fn into_constraints(self) -> UserConstraints {
        UserConstraints {
            mobility: self.mobility.and_then(MobilityField::describe),
            sensory: self.sensory.and_then(SensoryField::describe),
            dietary: self.dietary.and_then(DietaryField::describe),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OnboardingStatus {
    pub onboarded: bool,
}

#[derive(Debug, Serialize)]
pub struct TripsResponse {
    pub trips: Vec<PersistedTrip>,
}
