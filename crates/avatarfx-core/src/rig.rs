//! Read-only stand-in for the host scene a build targets: the object tree,
//! skinned meshes with their blend shapes, and the library of pre-authored
//! clips the model may reference.

use hashbrown::HashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::clips::{Clip, CurveBinding, CurveTarget};

/// Path of the rig root object.
pub const ROOT_PATH: &str = "";

/// A skinned mesh with its authored blend-shape weights.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skin {
    pub blend_shapes: IndexMap<String, f32>,
}

impl Skin {
    pub fn has_shape(&self, name: &str) -> bool {
        self.blend_shapes.contains_key(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigObject {
    pub active: bool,
    pub scale: f32,
    pub skin: Option<Skin>,
}

impl Default for RigObject {
    fn default() -> Self {
        Self {
            active: true,
            scale: 1.0,
            skin: None,
        }
    }
}

/// The target scene. Objects are keyed by their path relative to the rig
/// root; the root itself lives at [`ROOT_PATH`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rig {
    pub objects: IndexMap<String, RigObject>,
    /// Pre-authored clips addressable from the model by name.
    pub clips: HashMap<String, Clip>,
}

impl Rig {
    pub fn object(&self, path: &str) -> Option<&RigObject> {
        self.objects.get(path)
    }

    pub fn clip(&self, name: &str) -> Option<&Clip> {
        self.clips.get(name)
    }

    /// All skinned meshes on the rig, in declaration order.
    pub fn skins(&self) -> impl Iterator<Item = (&str, &Skin)> {
        self.objects
            .iter()
            .filter_map(|(path, obj)| obj.skin.as_ref().map(|s| (path.as_str(), s)))
    }

    /// The current authored value behind a curve binding, used to seed the
    /// defaults clip. `None` when the rig has nothing at that binding.
    pub fn sample(&self, binding: &CurveBinding) -> Option<f32> {
        let obj = self.objects.get(&binding.path)?;
        match &binding.target {
            CurveTarget::Active => Some(if obj.active { 1.0 } else { 0.0 }),
            CurveTarget::Scale => Some(obj.scale),
            CurveTarget::BlendShape(name) => obj.skin.as_ref()?.blend_shapes.get(name).copied(),
        }
    }
}
