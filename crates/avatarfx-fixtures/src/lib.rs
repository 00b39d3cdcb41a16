//! Shared rigs and property models used by the avatarfx integration tests.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;

use avatarfx_core::builder::BuildTarget;
use avatarfx_core::clips::Clip;
use avatarfx_core::model::{FxModel, Prop, PropPayload, PuppetStop, StateSpec};
use avatarfx_core::rig::{Rig, RigObject, Skin, ROOT_PATH};

static HORNS_MODEL: Lazy<FxModel> = Lazy::new(|| {
    serde_json::from_str(include_str!("../fixtures/horns_model.json"))
        .expect("horns fixture should parse")
});

/// One Toggle property "Horns" bound to the authored `horns_on` clip.
pub fn horns_model() -> FxModel {
    HORNS_MODEL.clone()
}

/// Parse a model from inline JSON with a readable error.
pub fn model_from_json(text: &str) -> Result<FxModel> {
    FxModel::from_json(text).context("failed to parse model fixture")
}

/// A small rig: root, a skinned body with a few blend shapes, a couple of
/// toggleable objects, and the authored clips the fixture models reference.
pub fn basic_rig() -> Rig {
    let mut rig = Rig::default();
    rig.objects.insert(ROOT_PATH.to_string(), RigObject::default());

    let mut body = Skin::default();
    body.blend_shapes.insert("Smile".to_string(), 0.0);
    body.blend_shapes.insert("Breathe".to_string(), 10.0);
    rig.objects.insert(
        "Body".to_string(),
        RigObject {
            skin: Some(body),
            ..Default::default()
        },
    );

    rig.objects.insert(
        "Horns".to_string(),
        RigObject {
            active: false,
            ..Default::default()
        },
    );
    rig.objects.insert("Tail".to_string(), RigObject::default());
    rig.objects.insert("TailBone".to_string(), RigObject::default());

    let mut horns_on = Clip::new("horns_on");
    horns_on.enable("Horns", true);
    rig.clips.insert("horns_on".to_string(), horns_on);

    rig
}

/// An empty output triple, as a fresh host would present it.
pub fn empty_target() -> BuildTarget {
    BuildTarget::default()
}

fn bare_prop(name: &str, payload: PropPayload) -> Prop {
    Prop {
        name: name.to_string(),
        saved: false,
        lewd_gated: false,
        reset_phys_bones: Vec::new(),
        payload,
    }
}

/// A MultiMode property "Party" with `modes` empty (no-op) mode states.
pub fn modes_model(modes: usize) -> FxModel {
    FxModel {
        props: vec![bare_prop(
            "Party",
            PropPayload::Modes {
                modes: vec![StateSpec::default(); modes],
            },
        )],
        ..Default::default()
    }
}

/// A Puppet property "Ears" whose stops all sit on x=0, so the X axis is
/// expected to stay unsynced and off the menu.
pub fn puppet_x0_model() -> FxModel {
    FxModel {
        props: vec![bare_prop(
            "Ears",
            PropPayload::Puppet {
                stops: vec![
                    PuppetStop::new(0.0, -1.0, StateSpec::default()),
                    PuppetStop::new(0.0, 1.0, StateSpec::default()),
                ],
            },
        )],
        ..Default::default()
    }
}
