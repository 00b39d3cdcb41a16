//! Layered state-machine graph artifacts and their builder surface.
//!
//! Layers are independent parallel automata evaluated every tick; layer order
//! is significant because later layers override earlier ones' output. States
//! carry an optional motion payload, parameter-driving effects fired on
//! entry, and a placement hint kept only for layout fidelity.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::clips::Clip;
use crate::error::BuildError;
use crate::params::{BoolParam, Condition, GraphParam, NumParam};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateId(pub usize);

/// Name handle for a controller-owned generated clip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipHandle(pub String);

/// Name handle for a controller-owned blend tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeHandle(pub String);

/// Motion payload of a state or blend-tree child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MotionRef {
    /// Generated clip owned by the controller.
    Clip(ClipHandle),
    /// Generated blend tree owned by the controller.
    Tree(TreeHandle),
    /// Pre-authored clip resolved from the rig's library.
    External(String),
}

/// Parameter-driving side effect fired when a state is entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Drive {
    Set { param: String, value: f32 },
    Delta { param: String, amount: f32 },
    Random { param: String, min: f32, max: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransSrc {
    Entry,
    Any,
    State(StateId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransDst {
    State(StateId),
    Exit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub src: TransSrc,
    pub dst: TransDst,
    pub when: Condition,
    /// Crossfade duration; zero means instantaneous.
    pub duration: f32,
    /// Whether an any-state transition may re-enter its own destination.
    pub to_self: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub name: String,
    /// Layout hint only; no runtime meaning.
    pub pos: (f32, f32),
    pub motion: Option<MotionRef>,
    /// Float parameter scrubbing the state's motion time.
    pub motion_time: Option<String>,
    pub drives: Vec<Drive>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub states: Vec<State>,
    pub transitions: Vec<Transition>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Add a state. The first state of a layer is its default state.
    pub fn new_state(&mut self, name: &str) -> StateId {
        let id = StateId(self.states.len());
        self.states.push(State {
            name: name.to_string(),
            pos: (0.0, self.states.len() as f32),
            motion: None,
            motion_time: None,
            drives: Vec::new(),
        });
        id
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id.0]
    }

    pub fn state_mut(&mut self, id: StateId) -> &mut State {
        &mut self.states[id.0]
    }

    pub fn place(&mut self, id: StateId, x: f32, y: f32) {
        self.states[id.0].pos = (x, y);
    }

    /// Place a state offset from another state's position.
    pub fn place_beside(&mut self, id: StateId, base: StateId, dx: f32, dy: f32) {
        let (bx, by) = self.states[base.0].pos;
        self.states[id.0].pos = (bx + dx, by + dy);
    }

    pub fn with_animation(&mut self, id: StateId, motion: MotionRef) {
        self.states[id.0].motion = Some(motion);
    }

    pub fn motion_time(&mut self, id: StateId, param: &NumParam) {
        self.states[id.0].motion_time = Some(param.name().to_string());
    }

    pub fn drive_bool(&mut self, id: StateId, param: &BoolParam, value: bool) {
        self.states[id.0].drives.push(Drive::Set {
            param: param.name().to_string(),
            value: if value { 1.0 } else { 0.0 },
        });
    }

    pub fn drive_num(&mut self, id: StateId, param: &NumParam, value: f32) {
        self.states[id.0].drives.push(Drive::Set {
            param: param.name().to_string(),
            value,
        });
    }

    pub fn drive_delta(&mut self, id: StateId, param: &NumParam, amount: f32) {
        self.states[id.0].drives.push(Drive::Delta {
            param: param.name().to_string(),
            amount,
        });
    }

    pub fn drive_random(&mut self, id: StateId, param: &NumParam, min: f32, max: f32) {
        self.states[id.0].drives.push(Drive::Random {
            param: param.name().to_string(),
            min,
            max,
        });
    }

    pub fn transition(&mut self, from: StateId, to: StateId) -> TransitionBuilder<'_> {
        TransitionBuilder::new(self, TransSrc::State(from), TransDst::State(to))
    }

    pub fn transition_from_entry(&mut self, to: StateId) -> TransitionBuilder<'_> {
        TransitionBuilder::new(self, TransSrc::Entry, TransDst::State(to))
    }

    pub fn transition_from_any(&mut self, to: StateId) -> TransitionBuilder<'_> {
        TransitionBuilder::new(self, TransSrc::Any, TransDst::State(to))
    }

    pub fn transition_to_exit(&mut self, from: StateId) -> TransitionBuilder<'_> {
        TransitionBuilder::new(self, TransSrc::State(from), TransDst::Exit)
    }

    pub fn find_state(&self, name: &str) -> Option<&State> {
        self.states.iter().find(|s| s.name == name)
    }
}

/// Builds one transition; [`TransitionBuilder::when`] finalizes it.
pub struct TransitionBuilder<'a> {
    layer: &'a mut Layer,
    trans: Transition,
}

impl<'a> TransitionBuilder<'a> {
    fn new(layer: &'a mut Layer, src: TransSrc, dst: TransDst) -> Self {
        Self {
            layer,
            trans: Transition {
                src,
                dst,
                when: Condition(Vec::new()),
                duration: 0.0,
                to_self: false,
            },
        }
    }

    pub fn duration(mut self, seconds: f32) -> Self {
        self.trans.duration = seconds;
        self
    }

    pub fn to_self(mut self) -> Self {
        self.trans.to_self = true;
        self
    }

    /// Attach the guard and commit the transition to the layer.
    pub fn when(mut self, cond: Condition) {
        self.trans.when = cond;
        self.layer.transitions.push(self.trans);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendKind {
    /// 2D free-form directional interpolation over child positions.
    FreeformDirectional2D,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendChild {
    pub pos: (f32, f32),
    pub motion: MotionRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendTree {
    pub name: String,
    pub kind: BlendKind,
    pub param_x: String,
    pub param_y: String,
    pub children: Vec<BlendChild>,
}

impl BlendTree {
    pub fn add_child(&mut self, motion: MotionRef, x: f32, y: f32) {
        self.children.push(BlendChild {
            pos: (x, y),
            motion,
        });
    }
}

/// The compiled state-machine controller: parameter table, ordered layers,
/// and the generated clip/tree assets parented under it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Controller {
    pub parameters: Vec<GraphParam>,
    pub layers: Vec<Layer>,
    pub clips: IndexMap<String, Clip>,
    pub trees: IndexMap<String, BlendTree>,
}

impl Controller {
    /// Append a parameter. No deduplication happens here; a duplicate name is
    /// a driver bug surfaced by [`Controller::validate_unique_names`].
    pub fn add_param(&mut self, param: GraphParam) {
        self.parameters.push(param);
    }

    pub fn layer(&self, id: LayerId) -> &Layer {
        &self.layers[id.0]
    }

    pub fn layer_mut(&mut self, id: LayerId) -> &mut Layer {
        &mut self.layers[id.0]
    }

    pub fn find_layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn clip(&self, handle: &ClipHandle) -> Option<&Clip> {
        self.clips.get(&handle.0)
    }

    pub fn clip_mut(&mut self, handle: &ClipHandle) -> &mut Clip {
        self.clips
            .get_mut(&handle.0)
            .expect("clip handles are only minted by the namespace")
    }

    pub fn tree_mut(&mut self, handle: &TreeHandle) -> &mut BlendTree {
        self.trees
            .get_mut(&handle.0)
            .expect("tree handles are only minted by the namespace")
    }

    /// Commit-time uniqueness check over every generated-name namespace.
    /// A correct driver never trips this; it exists so a naming collision is
    /// caught as an internal bug instead of silently corrupting output.
    pub fn validate_unique_names(&self) -> Result<(), BuildError> {
        let mut seen = hashbrown::HashSet::new();
        for param in &self.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(BuildError::DuplicateName(param.name.clone()));
            }
        }
        seen.clear();
        for layer in &self.layers {
            if !seen.insert(layer.name.as_str()) {
                return Err(BuildError::DuplicateName(layer.name.clone()));
            }
        }
        seen.clear();
        for name in self.clips.keys().chain(self.trees.keys()) {
            if !seen.insert(name.as_str()) {
                return Err(BuildError::DuplicateName(name.clone()));
            }
        }
        Ok(())
    }
}
