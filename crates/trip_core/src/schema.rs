//! Output schemas, one per task kind.
//!
//! The prompt builder embeds `Schema::example` and the score ranges into the
//! prompt, the LLM layer turns `Schema::root` into a structured-output hint,
//! and the validator checks model output against the same `root`. Keeping all
//! three on this table is what stops prompting and validation from drifting.

use crate::task::TaskKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldType {
    String,
    Integer,
    /// An integer of at least 1.
    PositiveInteger,
    Number,
    /// A number with a range announced to the model. The range is not
    /// enforced when decoding.
    Score { min: u32, max: u32 },
    Array(&'static FieldType),
    Object(&'static [Field]),
}

impl FieldType {
    pub fn describe(&self) -> &'static str {
        match self {
            FieldType::String => "a string",
            FieldType::Integer => "an integer",
            FieldType::PositiveInteger => "a positive integer",
            FieldType::Number | FieldType::Score { .. } => "a number",
            FieldType::Array(_) => "an array",
            FieldType::Object(_) => "an object",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
}

impl Field {
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty }
    }
}

#[derive(Debug, PartialEq)]
pub struct Schema {
    pub kind: TaskKind,
    /// Top-level object fields. Every field is required.
    pub root: &'static [Field],
    /// Literal instance of the shape, shown to the model.
    pub example: &'static str,
}

impl Schema {
    /// Top-level score fields with their declared ranges.
    pub fn score_fields(&self) -> Vec<(&'static str, u32, u32)> {
        self.root
            .iter()
            .filter_map(|field| match field.ty {
                FieldType::Score { min, max } => Some((field.name, min, max)),
                _ => None,
            })
            .collect()
    }
}

const ACTIVITY: &[Field] = &[
    Field::new("time", FieldType::String),
    Field::new("description", FieldType::String),
    Field::new("category", FieldType::String),
    Field::new("lat", FieldType::Number),
    Field::new("lng", FieldType::Number),
];

const DAY: &[Field] = &[
    Field::new("day", FieldType::PositiveInteger),
    Field::new("title", FieldType::String),
    Field::new("activities", FieldType::Array(&FieldType::Object(ACTIVITY))),
];

static ITINERARY: Schema = Schema {
    kind: TaskKind::Itinerary,
    root: &[
        Field::new("tripTitle", FieldType::String),
        Field::new("destination", FieldType::String),
        Field::new("itinerary", FieldType::Array(&FieldType::Object(DAY))),
    ],
    example: r#"{"tripTitle": "A Catchy Title", "destination": "City, Country", "itinerary": [{"day": 1, "title": "Arrival and Exploration", "activities": [{"time": "9:00 AM", "description": "Visit a famous landmark.", "category": "Sightseeing", "lat": 12.345, "lng": 67.890}]}]}"#,
};

static CHECKLIST: Schema = Schema {
    kind: TaskKind::Checklist,
    root: &[Field::new("checklist", FieldType::Array(&FieldType::String))],
    example: r#"{"checklist": ["Pack a foldable travel cane", "Confirm the hotel has a step-free entrance"]}"#,
};

static COMM_CARD: Schema = Schema {
    kind: TaskKind::CommCard,
    root: &[
        Field::new("en", FieldType::String),
        Field::new("jp", FieldType::String),
    ],
    example: r#"{"en": "I cannot eat peanuts. Please make sure my meal contains no peanuts.", "jp": "ピーナッツが食べられません。料理にピーナッツが入っていないか確認してください。"}"#,
};

static SENSORY_PROFILE: Schema = Schema {
    kind: TaskKind::SensoryProfile,
    root: &[
        Field::new("audio", FieldType::Score { min: 1, max: 100 }),
        Field::new("visual", FieldType::Score { min: 1, max: 100 }),
        Field::new("crowds", FieldType::Score { min: 1, max: 100 }),
        Field::new("summary", FieldType::String),
    ],
    example: r#"{"audio": 45, "visual": 60, "crowds": 80, "summary": "Busy at midday with announcements over speakers; quieter early in the morning."}"#,
};

static RESHUFFLE: Schema = Schema {
    kind: TaskKind::Reshuffle,
    root: &[
        Field::new("replace", FieldType::String),
        Field::new("suggestion", FieldType::String),
    ],
    example: r#"{"replace": "Afternoon hike up Mount Inari", "suggestion": "A seated tea ceremony in a quiet machiya nearby."}"#,
};

static SCRIPT: Schema = Schema {
    kind: TaskKind::Script,
    root: &[
        Field::new("user", FieldType::Array(&FieldType::String)),
        Field::new("staff", FieldType::Array(&FieldType::String)),
        Field::new("tips", FieldType::String),
    ],
    example: r#"{"user": ["Hello, I have a reservation under Tanaka.", "Could we have a table away from the speakers?"], "staff": ["Welcome! Let me check.", "Of course, please follow me."], "tips": "Showing the booking on your phone saves having to spell your name."}"#,
};

pub fn schema_for(kind: TaskKind) -> &'static Schema {
    match kind {
        TaskKind::Itinerary => &ITINERARY,
        TaskKind::Checklist => &CHECKLIST,
        TaskKind::CommCard => &COMM_CARD,
        TaskKind::SensoryProfile => &SENSORY_PROFILE,
        TaskKind::Reshuffle => &RESHUFFLE,
        TaskKind::Script => &SCRIPT,
    }
}
