//! avatarfx-core (engine-agnostic)
//!
//! Compiles a declarative avatar property model plus a fixed behavioral rule
//! set into three coupled artifacts: a layered state-machine controller with
//! guarded transitions and parameter-driving effects, a flat registry of
//! typed network-synchronized parameters, and a paginated menu tree. Every
//! generated artifact carries a reserved name prefix; each build purges the
//! previous generation by that tag before regenerating, so repeated builds
//! are idempotent and never disturb user-authored content.

pub mod builder;
pub mod clips;
pub mod error;
pub mod graph;
pub mod menu;
pub mod model;
pub mod names;
pub mod params;
pub mod rig;

// Re-exports for consumers (hosts and tests)
pub use builder::{BuildTarget, FxCompiler};
pub use clips::{Clip, Curve, CurveBinding, CurveTarget, Keyframe};
pub use error::BuildError;
pub use graph::{
    BlendTree, ClipHandle, Controller, Drive, Layer, LayerId, MotionRef, State, StateId, TransDst,
    TransSrc, Transition, TreeHandle,
};
pub use menu::{MenuControl, MenuControlKind, MenuNode, MenuStore, MAX_CONTROLS};
pub use model::{Action, ClipRef, FxModel, Prop, PropPayload, PuppetStop, StateSpec, SubModel};
pub use names::{FxNamespace, ParamOpts};
pub use params::{
    BoolParam, Cmp, CmpOp, Condition, GraphParam, NumParam, ParamType, SyncType, SyncedParam,
    SyncedParams,
};
pub use rig::{Rig, RigObject, Skin, ROOT_PATH};
