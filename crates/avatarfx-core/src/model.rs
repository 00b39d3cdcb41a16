//! The declarative input model: properties, their states, and the fixed
//! behavioral rule inputs. The model is fully materialized and read-only for
//! the duration of a build.

use serde::{Deserialize, Serialize};

use crate::graph::ClipHandle;

/// Animation payload reference for a property state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClipRef {
    /// Pre-authored clip looked up in the rig's clip library.
    Library(String),
    /// Clip generated earlier in the same build. Only synthesized properties
    /// (breathing) use this.
    Generated(ClipHandle),
}

/// A state-authoring action, applied when the state's clip is generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Flip an object's active flag relative to its authored value.
    ToggleObject { path: String },
    /// Drive a named blend shape to full weight.
    SetBlendShape { name: String },
}

/// Either a reference to a pre-authored clip or a list of actions to bake
/// into a generated clip. May be empty, which compiles to the no-op clip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSpec {
    #[serde(default)]
    pub clip: Option<ClipRef>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl StateSpec {
    pub fn from_clip(name: impl Into<String>) -> Self {
        Self {
            clip: Some(ClipRef::Library(name.into())),
            actions: Vec::new(),
        }
    }

    pub fn from_actions(actions: Vec<Action>) -> Self {
        Self {
            clip: None,
            actions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clip.is_none() && self.actions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuppetStop {
    pub x: f32,
    pub y: f32,
    pub state: StateSpec,
}

impl PuppetStop {
    pub fn new(x: f32, y: f32, state: StateSpec) -> Self {
        Self { x, y, state }
    }
}

/// Kind-specific payload of a property, resolved once at model-load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PropPayload {
    /// On/off switch. With `slider` set it compiles to a radial-slider-driven
    /// blend instead of a two-state automaton.
    Toggle {
        state: StateSpec,
        #[serde(default)]
        slider: bool,
        #[serde(default)]
        default_on: bool,
    },
    /// Mutually exclusive modes sharing one integer parameter.
    Modes { modes: Vec<StateSpec> },
    /// Two-axis blend over positioned stops.
    Puppet { stops: Vec<PuppetStop> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prop {
    /// Unique among properties; generated parameter and layer names derive
    /// deterministically from it.
    pub name: String,
    /// Persist the property's synced parameter between sessions.
    #[serde(default)]
    pub saved: bool,
    /// Gate activation behind the lock mechanism's sync bool.
    #[serde(default)]
    pub lewd_gated: bool,
    /// Objects whose physics should be reset with a one-shot pulse whenever
    /// the property changes state.
    #[serde(default)]
    pub reset_phys_bones: Vec<String>,
    #[serde(flatten)]
    pub payload: PropPayload,
}

/// Properties contributed by a nested model instance. Authored clips are
/// copied with every curve path rebased under `root` so they address the
/// host rig correctly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubModel {
    pub root: String,
    #[serde(default)]
    pub props: Vec<Prop>,
}

/// The full input model: authored properties plus the inputs of the fixed
/// behavioral rules (gaze, mouth, ears, blinking, talk indicator, toes,
/// breathing).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxModel {
    pub props: Vec<Prop>,
    pub instances: Vec<SubModel>,

    /// Folder in the rig clip library holding `Viseme-<name>` clips. Empty
    /// disables the viseme layer.
    pub viseme_folder: String,

    pub gaze_closed: StateSpec,
    pub gaze_happy: StateSpec,
    pub gaze_sad: StateSpec,
    pub gaze_angry: StateSpec,

    pub mouth_blep: StateSpec,
    pub mouth_suck: StateSpec,
    pub mouth_sad: StateSpec,
    pub mouth_angry: StateSpec,
    pub mouth_happy: StateSpec,

    pub ears_back: StateSpec,

    pub blink: StateSpec,
    pub talk_glow: StateSpec,

    pub toes_down: StateSpec,
    pub toes_up: StateSpec,
    pub toes_splay: StateSpec,

    pub breathe_object: Option<String>,
    pub breathe_blendshape: String,
    pub breathe_scale_min: f32,
    pub breathe_scale_max: f32,
}

impl FxModel {
    /// Load a model from its JSON representation.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
