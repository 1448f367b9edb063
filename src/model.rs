//! Application model
//!
//! Read-only description of the app being built: metadata, theme, and an ordered list of
//! screens whose components form a tree through `children`. The model is supplied by the
//! editor as a JSON document and never mutated by the build.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Application being built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppModel {
    pub id: String,
    pub name: String,
    /// Dotted identifier, e.g. `com.example.app`
    pub package: String,
    #[serde(default = "default_version_code")]
    pub version_code: u32,
    #[serde(default = "default_version_name")]
    pub version_name: String,
    #[serde(default = "default_min_sdk")]
    pub min_sdk: u32,
    #[serde(default)]
    pub theme: ThemeColors,
    #[serde(default)]
    pub screens: Vec<Screen>,
}

fn default_version_code() -> u32 {
    1
}

fn default_version_name() -> String {
    "1.0".to_string()
}

fn default_min_sdk() -> u32 {
    24
}

/// Theme colors written to `colors.xml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeColors {
    #[serde(default = "default_primary")]
    pub primary: String,
    #[serde(default = "default_primary_dark")]
    pub primary_dark: String,
    #[serde(default = "default_accent")]
    pub accent: String,
}

fn default_primary() -> String {
    "#6200EE".to_string()
}

fn default_primary_dark() -> String {
    "#3700B3".to_string()
}

fn default_accent() -> String {
    "#03DAC5".to_string()
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            primary_dark: default_primary_dark(),
            accent: default_accent(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub components: Vec<Component>,
}

impl Screen {
    /// Depth-first walk over every component on the screen, parents before children.
    pub fn walk(&self) -> Vec<&Component> {
        let mut out = Vec::new();
        let mut stack: Vec<&Component> = self.components.iter().rev().collect();
        while let Some(component) = stack.pop() {
            out.push(component);
            stack.extend(component.children.iter().rev());
        }
        out
    }
}

/// Closed set of widget and layout kinds the editor can place.
///
/// Unrecognized tags deserialize to `Unknown` so a model from a newer editor still generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Button,
    TextView,
    EditText,
    ImageView,
    CheckBox,
    Switch,
    ProgressBar,
    LinearLayout,
    FrameLayout,
    ScrollView,
    Spacer,
    #[serde(other)]
    Unknown,
}

impl ComponentKind {
    pub fn is_container(self) -> bool {
        matches!(
            self,
            ComponentKind::LinearLayout | ComponentKind::FrameLayout | ComponentKind::ScrollView
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub children: Vec<Component>,
}

/// Property bag: position, size, style, and type-specific fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    pub x: Option<i32>,
    pub y: Option<i32>,
    /// Width in dp; `None` wraps content, a negative value matches the parent
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub text: Option<String>,
    pub text_size: Option<f32>,
    pub text_color: Option<String>,
    pub background_color: Option<String>,
    pub padding: Option<i32>,
    pub hint: Option<String>,
    pub checked: Option<bool>,
    pub orientation: Option<String>,
    /// Name of the screen a button opens
    pub navigate_to: Option<String>,
    /// Remaining type-specific fields, preserved as-is
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl AppModel {
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}
