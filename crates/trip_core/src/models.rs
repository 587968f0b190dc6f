use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single stop on a day of the trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub time: String,
    pub description: String,
    /// Open-ended, e.g. "Food", "Sightseeing", "Adventure".
    pub category: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    pub day: u32,
    pub title: String,
    /// Itinerary order as generated, never re-sorted.
    pub activities: Vec<Activity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    pub trip_title: String,
    pub destination: String,
    pub itinerary: Vec<Day>,
}

/// Stored accessibility profile of a traveler.
///
/// Blank values count as absent: they are skipped when prompting and never
/// replaced by a default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary: Option<String>,
}

impl UserConstraints {
    /// Present fields in their stable prompt order: Mobility, Sensory, Dietary.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("Mobility", self.mobility.as_deref()),
            ("Sensory", self.sensory.as_deref()),
            ("Dietary", self.dietary.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            let value = value?.trim();
            (!value.is_empty()).then_some((label, value))
        })
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    pub checklist: Vec<String>,
}

/// Phrase card shown to restaurant staff. `jp` holds the translation into the
/// requested language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommCard {
    pub en: String,
    pub jp: String,
}

/// Sensory load of a place, each score on a 1-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensoryProfile {
    pub audio: f64,
    pub visual: f64,
    pub crowds: f64,
    pub summary: String,
}

impl SensoryProfile {
    /// Names of scores that fall outside the declared 1-100 range.
    pub fn out_of_range_scores(&self) -> Vec<&'static str> {
        [
            ("audio", self.audio),
            ("visual", self.visual),
            ("crowds", self.crowds),
        ]
        .into_iter()
        .filter(|(_, score)| !(1.0..=100.0).contains(score))
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReshuffleSuggestion {
    pub replace: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialScript {
    pub user: Vec<String>,
    pub staff: Vec<String>,
    pub tips: String,
}

/// A validated generation result. Serializes as the bare payload of its kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GenerationResult {
    Itinerary(Itinerary),
    Checklist(Checklist),
    CommCard(CommCard),
    SensoryProfile(SensoryProfile),
    Reshuffle(ReshuffleSuggestion),
    Script(SocialScript),
}

impl GenerationResult {
    pub fn as_itinerary(&self) -> Option<&Itinerary> {
        match self {
            GenerationResult::Itinerary(itinerary) => Some(itinerary),
            _ => None,
        }
    }
}

/// A trip as stored in the document store. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTrip {
    pub id: String,
    pub user_id: String,
    /// A validated itinerary, or whatever JSON the caller chose to save.
    pub itinerary: Value,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}
