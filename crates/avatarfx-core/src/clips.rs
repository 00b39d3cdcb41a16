//! Animation clip artifacts: float curves keyed on rig-relative bindings.

use serde::{Deserialize, Serialize};

/// Duration of one frame for frame-addressed curves.
pub const FRAME: f32 = 1.0 / 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
}

impl Keyframe {
    pub fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

/// The animated property of a curve.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveTarget {
    /// Object active flag (0 = disabled, anything else = enabled).
    Active,
    /// Uniform local scale.
    Scale,
    /// Named blend-shape weight (0..100).
    BlendShape(String),
}

/// Addresses one animated property on the rig: an object path plus a target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurveBinding {
    pub path: String,
    pub target: CurveTarget,
}

impl CurveBinding {
    pub fn new(path: impl Into<String>, target: CurveTarget) -> Self {
        Self {
            path: path.into(),
            target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub binding: CurveBinding,
    pub keys: Vec<Keyframe>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub name: String,
    pub curves: Vec<Curve>,
}

impl Clip {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            curves: Vec::new(),
        }
    }

    /// Set the curve for a binding, replacing any existing curve on it.
    pub fn set_curve(&mut self, binding: CurveBinding, keys: Vec<Keyframe>) {
        if let Some(curve) = self.curves.iter_mut().find(|c| c.binding == binding) {
            curve.keys = keys;
        } else {
            self.curves.push(Curve { binding, keys });
        }
    }

    /// One-frame curve enabling or disabling an object.
    pub fn enable(&mut self, path: &str, on: bool) {
        self.set_curve(
            CurveBinding::new(path, CurveTarget::Active),
            one_frame(if on { 1.0 } else { 0.0 }),
        );
    }

    pub fn blend_shape(&mut self, path: &str, shape: &str, keys: Vec<Keyframe>) {
        self.set_curve(
            CurveBinding::new(path, CurveTarget::BlendShape(shape.to_string())),
            keys,
        );
    }

    pub fn scale(&mut self, path: &str, keys: Vec<Keyframe>) {
        self.set_curve(CurveBinding::new(path, CurveTarget::Scale), keys);
    }

    pub fn bindings(&self) -> impl Iterator<Item = &CurveBinding> {
        self.curves.iter().map(|c| &c.binding)
    }
}

/// Single keyframe at t=0, used to pin a property's authored value.
pub fn one_frame(value: f32) -> Vec<Keyframe> {
    vec![Keyframe::new(0.0, value)]
}

/// Constant value over a duration.
pub fn constant(duration: f32, value: f32) -> Vec<Keyframe> {
    vec![Keyframe::new(0.0, value), Keyframe::new(duration, value)]
}

/// Keyframes addressed in frames (60 per time unit).
pub fn from_frames(keys: &[(f32, f32)]) -> Vec<Keyframe> {
    keys.iter()
        .map(|&(frame, value)| Keyframe::new(frame * FRAME, value))
        .collect()
}

/// Keyframes addressed in seconds.
pub fn from_seconds(keys: &[(f32, f32)]) -> Vec<Keyframe> {
    keys.iter()
        .map(|&(time, value)| Keyframe::new(time, value))
        .collect()
}
