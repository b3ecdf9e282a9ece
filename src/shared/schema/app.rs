//! Application (widget) documents
//!
//! An app is a widget placed on a board. Its envelope fields (position, size,
//! owner) are common to every app; its `state` depends on the app type and is
//! checked against the [`AppTypeRegistry`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::shared::entity::{Entity, EntityKind};
use crate::shared::error::SharedError;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub depth: f64,
}

impl Default for Size {
    fn default() -> Self {
        Self {
            width: 400.0,
            height: 400.0,
            depth: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Rotation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Payload of an app document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct App {
    #[serde(default)]
    pub title: String,
    pub room_id: String,
    pub board_id: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub size: Size,
    #[serde(default)]
    pub rotation: Rotation,
    /// Registered app type name, e.g. `Stickie`
    #[serde(rename = "type")]
    pub app_type: String,
    #[serde(default)]
    pub state: Value,
    #[serde(default)]
    pub minimized: bool,
    #[serde(default)]
    pub raised: bool,
}

impl App {
    /// New app of `app_type` with the type's initial state
    pub fn new(
        app_type: &str,
        room_id: impl Into<String>,
        board_id: impl Into<String>,
    ) -> Result<Self, SharedError> {
        let definition = AppTypeRegistry::lookup(app_type)?;
        Ok(Self {
            title: String::new(),
            room_id: room_id.into(),
            board_id: board_id.into(),
            owner_id: String::new(),
            position: Position::default(),
            size: Size::default(),
            rotation: Rotation::default(),
            app_type: definition.name.to_string(),
            state: definition.initial_state(),
            minimized: false,
            raised: false,
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y, z: 0.0 };
        self
    }
}

impl Entity for App {
    const KIND: EntityKind = EntityKind::Apps;
    const ROUTE: &'static str = "/api/apps";
    const SCOPE_FIELD: Option<&'static str> = Some("boardId");

    fn scope_resource() -> &'static str {
        "boards"
    }

    fn validate(&self) -> Result<(), SharedError> {
        if self.board_id.is_empty() {
            return Err(SharedError::validation("boardId", "must not be empty"));
        }
        if self.size.width <= 0.0 || self.size.height <= 0.0 {
            return Err(SharedError::validation("size", "width and height must be positive"));
        }
        AppTypeRegistry::lookup(&self.app_type)?.check(&self.state, false)
    }
}

/// JSON shape expected for one state field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Bool,
    Array,
    Object,
}

impl FieldType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    fn default_value(&self) -> Value {
        match self {
            Self::String => json!(""),
            Self::Number => json!(0),
            Self::Bool => json!(false),
            Self::Array => json!([]),
            Self::Object => json!({}),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Number => "a number",
            Self::Bool => "a boolean",
            Self::Array => "an array",
            Self::Object => "an object",
        }
    }
}

/// State schema of one app type
#[derive(Debug)]
pub struct AppType {
    pub name: &'static str,
    fields: &'static [(&'static str, FieldType)],
}

impl AppType {
    /// Initial state: every declared field at its type's zero value
    pub fn initial_state(&self) -> Value {
        let state: Map<String, Value> = self
            .fields
            .iter()
            .map(|(field, ty)| (field.to_string(), ty.default_value()))
            .collect();
        Value::Object(state)
    }

    /// Check `state` against the declared fields.
    ///
    /// A partial state (as sent by a state update) only has its present
    /// fields checked; a full state must carry every declared field.
    pub fn check(&self, state: &Value, partial: bool) -> Result<(), SharedError> {
        let object = state
            .as_object()
            .ok_or_else(|| SharedError::validation("state", "must be an object"))?;
        for (field, ty) in self.fields {
            match object.get(*field) {
                Some(value) if !ty.matches(value) => {
                    return Err(SharedError::validation(
                        format!("state.{}", field),
                        format!("expected {} for {}", ty.name(), self.name),
                    ));
                }
                None if !partial => {
                    return Err(SharedError::validation(
                        format!("state.{}", field),
                        format!("missing for {}", self.name),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

static APP_TYPES: &[AppType] = &[
    AppType {
        name: "Note",
        fields: &[("text", FieldType::String), ("fontSize", FieldType::Number), ("color", FieldType::String)],
    },
    AppType {
        name: "Stickie",
        fields: &[("text", FieldType::String), ("fontSize", FieldType::Number), ("color", FieldType::String)],
    },
    AppType {
        name: "Counter",
        fields: &[("count", FieldType::Number)],
    },
    AppType {
        name: "ImageViewer",
        fields: &[("assetid", FieldType::String), ("annotations", FieldType::Bool)],
    },
    AppType {
        name: "PDFViewer",
        fields: &[
            ("filename", FieldType::String),
            ("currentPage", FieldType::Number),
            ("numPages", FieldType::Number),
        ],
    },
    AppType {
        name: "Notepad",
        fields: &[],
    },
    AppType {
        name: "SageCell",
        fields: &[
            ("code", FieldType::String),
            ("kernel", FieldType::String),
            ("output", FieldType::String),
            ("language", FieldType::String),
            ("fontSize", FieldType::Number),
            ("theme", FieldType::String),
        ],
    },
    AppType {
        name: "Webview",
        fields: &[("webviewurl", FieldType::String)],
    },
    AppType {
        name: "LeafLet",
        fields: &[("location", FieldType::Array), ("zoom", FieldType::Number), ("baseLayer", FieldType::String)],
    },
];

/// Lookup table from app type name to its state schema
pub struct AppTypeRegistry;

impl AppTypeRegistry {
    pub fn lookup(name: &str) -> Result<&'static AppType, SharedError> {
        APP_TYPES
            .iter()
            .find(|ty| ty.name == name)
            .ok_or_else(|| SharedError::unknown("app type", name))
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        APP_TYPES.iter().map(|ty| ty.name)
    }
}
