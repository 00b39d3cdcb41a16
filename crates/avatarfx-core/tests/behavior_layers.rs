use avatarfx_core::{
    BuildError, BuildTarget, Clip, CmpOp, CurveBinding, CurveTarget, Drive, FxCompiler, FxModel,
    Keyframe, Layer, MenuControlKind, StateId, StateSpec, TransDst, TransSrc,
};
use avatarfx_fixtures as fixtures;

fn compile(model: &FxModel) -> BuildTarget {
    FxCompiler::new("FX")
        .compile(model, &fixtures::basic_rig(), fixtures::empty_target())
        .expect("build should succeed")
}

fn state_id(layer: &Layer, name: &str) -> StateId {
    StateId(
        layer
            .states
            .iter()
            .position(|s| s.name == name)
            .unwrap_or_else(|| panic!("state {} should exist", name)),
    )
}

fn sets(layer: &Layer, state: &str, param: &str) -> Vec<f32> {
    layer
        .find_state(state)
        .unwrap()
        .drives
        .iter()
        .filter_map(|d| match d {
            Drive::Set { param: p, value } if p == param => Some(*value),
            _ => None,
        })
        .collect()
}

#[test]
fn viseme_layer_mirrors_the_host_viseme_index() {
    let mut rig = fixtures::basic_rig();
    let visemes = [
        "sil", "PP", "FF", "TH", "DD", "kk", "CH", "SS", "nn", "RR", "aa", "E", "I", "O", "U",
    ];
    for name in visemes {
        let key = format!("Mouth/Viseme-{}", name);
        rig.clips.insert(key.clone(), Clip::new(key));
    }
    let model = FxModel {
        viseme_folder: "Mouth".to_string(),
        ..Default::default()
    };
    let out = FxCompiler::new("FX")
        .compile(&model, &rig, fixtures::empty_target())
        .unwrap();

    let layer = out.controller.find_layer("FX/Visemes").unwrap();
    assert_eq!(layer.states.len(), 15);
    assert_eq!(layer.find_state("sil").unwrap().pos, (3.0, -8.0));
    assert_eq!(layer.transitions.len(), 30);

    // every state is entered on its index and left on anything else
    let aa = state_id(layer, "aa");
    assert!(layer.transitions.iter().any(|t| {
        t.src == TransSrc::Entry
            && t.dst == TransDst::State(aa)
            && t.when.0[0].param == "Viseme"
            && t.when.0[0].op == CmpOp::Eq
            && t.when.0[0].value == 10.0
    }));
    assert!(layer.transitions.iter().any(|t| {
        t.src == TransSrc::State(aa)
            && t.dst == TransDst::Exit
            && t.when.0[0].op == CmpOp::Ne
            && t.when.0[0].value == 10.0
    }));
}

#[test]
fn viseme_layer_requires_every_clip() {
    let model = FxModel {
        viseme_folder: "Mouth".to_string(),
        ..Default::default()
    };
    let err = FxCompiler::new("FX")
        .compile(&model, &fixtures::basic_rig(), fixtures::empty_target())
        .unwrap_err();
    assert!(matches!(err, BuildError::MissingClip(key) if key == "Mouth/Viseme-sil"));
}

#[test]
fn gaze_layer_suppresses_blinking_outside_idle() {
    let out = compile(&FxModel::default());
    let layer = out.controller.find_layer("FX/Eyes").unwrap();
    assert_eq!(layer.states.len(), 5);

    assert_eq!(sets(layer, "Idle", "FX__BlinkActive"), vec![1.0]);
    for state in ["Closed", "Happy", "Sad", "Angry"] {
        assert_eq!(sets(layer, state, "FX__BlinkActive"), vec![0.0]);
    }

    // expression switching is from-any with self re-entry and a short crossfade
    assert_eq!(layer.transitions.len(), 6);
    for t in &layer.transitions {
        assert_eq!(t.src, TransSrc::Any);
        assert!(t.to_self);
        assert!((t.duration - 0.1).abs() < 1e-6);
    }
}

#[test]
fn gesture_latch_drives_the_emote_both_ways() {
    let out = compile(&FxModel::default());
    let layer = out.controller.find_layer("FX/Gesture - Happy").unwrap();
    let off = state_id(layer, "Off");
    let on = state_id(layer, "On");

    // three independent ways in: the lock, or gesture 7 on either hand
    let entries: Vec<_> = layer
        .transitions
        .iter()
        .filter(|t| t.src == TransSrc::State(off) && t.dst == TransDst::State(on))
        .collect();
    assert_eq!(entries.len(), 3);
    assert!(entries
        .iter()
        .any(|t| t.when.0[0].param == "FX__EmoteHappyLock" && t.when.0[0].op == CmpOp::IsTrue));
    assert!(entries
        .iter()
        .any(|t| t.when.0[0].param == "GestureLeft" && t.when.0[0].value == 7.0));
    assert!(entries
        .iter()
        .any(|t| t.when.0[0].param == "GestureRight" && t.when.0[0].value == 7.0));

    // one way out: lock released and neither hand holds the gesture
    let exits: Vec<_> = layer
        .transitions
        .iter()
        .filter(|t| t.src == TransSrc::State(on) && t.dst == TransDst::State(off))
        .collect();
    assert_eq!(exits.len(), 1);
    assert_eq!(exits[0].when.0.len(), 3);

    assert_eq!(sets(layer, "Off", "FX__EmoteHappy"), vec![0.0]);
    assert_eq!(sets(layer, "On", "FX__EmoteHappy"), vec![1.0]);
}

#[test]
fn blink_generator_counts_down_and_rerandomizes() {
    let out = compile(&FxModel::default());
    let layer = out.controller.find_layer("FX/Blink - Generator").unwrap();
    assert_eq!(layer.states.len(), 5);

    let randomize = layer.find_state("Randomize").unwrap();
    assert!(randomize.drives.iter().any(|d| matches!(
        d,
        Drive::Random { param, min, max }
            if param == "FX__BlinkCounter" && *min == 2.0 && *max == 10.0
    )));

    let subtract = layer.find_state("Subtract").unwrap();
    assert!(subtract.drives.iter().any(|d| matches!(
        d,
        Drive::Delta { param, amount } if param == "FX__BlinkCounter" && *amount == -1.0
    )));

    // the countdown tick is the 1-second crossfade into Subtract
    let idle = state_id(layer, "Idle");
    let sub = state_id(layer, "Subtract");
    let tick = layer
        .transitions
        .iter()
        .find(|t| t.src == TransSrc::State(idle) && t.dst == TransDst::State(sub))
        .unwrap();
    assert!((tick.duration - 1.0).abs() < 1e-6);

    // firing requires the counter to have run out
    let trigger0 = state_id(layer, "Trigger 0");
    let fire = layer
        .transitions
        .iter()
        .find(|t| t.src == TransSrc::State(idle) && t.dst == TransDst::State(trigger0))
        .unwrap();
    assert_eq!(fire.when.0[0].param, "FX__BlinkCounter");
    assert_eq!(fire.when.0[0].op, CmpOp::Lt);
    assert_eq!(fire.when.0[0].value, 1.0);

    // the counter never syncs; only the toggle crosses the wire
    assert!(out
        .synced
        .params
        .iter()
        .all(|p| p.name != "FX__BlinkCounter"));
    assert!(out
        .synced
        .params
        .iter()
        .any(|p| p.name == "FX__BlinkTriggerSynced"));
}

#[test]
fn blink_receiver_pulses_on_either_edge() {
    let out = compile(&FxModel::default());
    let layer = out.controller.find_layer("FX/Blink - Receiver").unwrap();
    assert_eq!(layer.states.len(), 2);
    for state in &layer.states {
        assert!(state.drives.iter().any(|d| matches!(
            d,
            Drive::Set { param, value } if param == "FX__BlinkTrigger" && *value == 1.0
        )));
    }
}

#[test]
fn blink_animator_honors_the_suppression_flag() {
    let out = compile(&FxModel::default());
    let layer = out.controller.find_layer("FX/Blink - Animate").unwrap();
    let check = state_id(layer, "Check Active");
    let blink = state_id(layer, "Blink");

    let play = layer
        .transitions
        .iter()
        .find(|t| t.src == TransSrc::State(check) && t.dst == TransDst::State(blink))
        .unwrap();
    assert_eq!(play.when.0[0].param, "FX__BlinkActive");
    assert_eq!(play.when.0[0].op, CmpOp::IsTrue);
    assert!((play.duration - 0.07).abs() < 1e-6);
}

#[test]
fn scale_layer_scrubs_the_ramp_with_the_synced_float() {
    let out = compile(&FxModel::default());

    let layer = out.controller.find_layer("FX/Scale").unwrap();
    let state = layer.find_state("Scale").unwrap();
    assert_eq!(state.motion_time.as_deref(), Some("FX__Scale"));

    let clip = out.controller.clips.get("FX/Scale").unwrap();
    let curve = &clip.curves[0];
    assert_eq!(curve.binding, CurveBinding::new("", CurveTarget::Scale));
    let values: Vec<f32> = curve.keys.iter().map(|k| k.value).collect();
    assert_eq!(values, vec![0.1, 1.0, 2.0, 10.0]);

    let synced = out
        .synced
        .params
        .iter()
        .find(|p| p.name == "FX__Scale")
        .unwrap();
    assert_eq!(synced.default, 0.5);

    assert!(out.menu.pages.values().any(|page| page.controls.iter().any(
        |c| c.kind
            == MenuControlKind::Slider {
                param: "FX__Scale".to_string(),
            }
    )));
}

#[test]
fn lock_unlocks_only_on_the_two_handed_gesture() {
    let out = compile(&FxModel::default());
    let layer = out.controller.find_layer("FX/LewdLock").unwrap();
    let check = state_id(layer, "Check");
    let unlocked = state_id(layer, "Unlocked");

    let unlock = layer
        .transitions
        .iter()
        .find(|t| t.src == TransSrc::State(check) && t.dst == TransDst::State(unlocked))
        .unwrap();
    assert_eq!(unlock.when.0.len(), 2);
    assert_eq!(unlock.when.0[0].param, "GestureLeft");
    assert_eq!(unlock.when.0[0].value, 4.0);
    assert_eq!(unlock.when.0[1].param, "GestureRight");
    assert_eq!(unlock.when.0[1].value, 4.0);

    assert_eq!(sets(layer, "Unlocked", "FX__LewdLockSync"), vec![1.0]);
    // locking clears both the sync and the menu toggle
    assert_eq!(sets(layer, "Locked", "FX__LewdLockSync"), vec![0.0]);
    assert_eq!(sets(layer, "Locked", "FX__LewdLockMenu"), vec![0.0]);
}

#[test]
fn talk_glow_follows_the_viseme_threshold() {
    let mut rig = fixtures::basic_rig();
    rig.clips.insert("glow".to_string(), Clip::new("glow"));
    let model = FxModel {
        talk_glow: StateSpec::from_clip("glow"),
        ..Default::default()
    };
    let out = FxCompiler::new("FX")
        .compile(&model, &rig, fixtures::empty_target())
        .unwrap();

    let layer = out.controller.find_layer("FX/Talk Glow").unwrap();
    let off = state_id(layer, "Off");
    let on = state_id(layer, "On");
    let lit = layer
        .transitions
        .iter()
        .find(|t| t.src == TransSrc::State(off) && t.dst == TransDst::State(on))
        .unwrap();
    assert_eq!(lit.when.0[0].op, CmpOp::Gt);
    assert_eq!(lit.when.0[0].value, 9.0);
    let dark = layer
        .transitions
        .iter()
        .find(|t| t.src == TransSrc::State(on) && t.dst == TransDst::State(off))
        .unwrap();
    assert_eq!(dark.when.0[0].op, CmpOp::Lt);
    assert_eq!(dark.when.0[0].value, 10.0);
}

#[test]
fn talk_glow_is_skipped_when_unconfigured() {
    let out = compile(&FxModel::default());
    assert!(out.controller.find_layer("FX/Talk Glow").is_none());
}

#[test]
fn toes_are_synthesized_as_a_two_axis_puppet() {
    let mut rig = fixtures::basic_rig();
    for name in ["toes_down", "toes_up", "toes_splay"] {
        rig.clips.insert(name.to_string(), Clip::new(name));
    }
    let model = FxModel {
        toes_down: StateSpec::from_clip("toes_down"),
        toes_up: StateSpec::from_clip("toes_up"),
        toes_splay: StateSpec::from_clip("toes_splay"),
        ..Default::default()
    };
    let out = FxCompiler::new("FX")
        .compile(&model, &rig, fixtures::empty_target())
        .unwrap();

    assert!(out.controller.find_layer("FX/Prop - Toes").is_some());
    let tree = out.controller.trees.get("FX/prop_Toes").unwrap();
    // neutral origin child, down, up, and splay mirrored onto both x stops
    assert_eq!(tree.children.len(), 5);
    let positions: Vec<(f32, f32)> = tree.children.iter().map(|c| c.pos).collect();
    assert!(positions.contains(&(0.0, -1.0)));
    assert!(positions.contains(&(0.0, 1.0)));
    assert!(positions.contains(&(-1.0, 0.0)));
    assert!(positions.contains(&(1.0, 0.0)));

    assert!(out.synced.params.iter().any(|p| p.name == "FX__Prop_Toes_x"));
    assert!(out.synced.params.iter().any(|p| p.name == "FX__Prop_Toes_y"));
}

#[test]
fn breathing_builds_the_loop_and_a_default_on_toggle() {
    let model = FxModel {
        breathe_object: Some("Tail".to_string()),
        breathe_blendshape: "Breathe".to_string(),
        breathe_scale_min: 1.0,
        breathe_scale_max: 1.1,
        ..Default::default()
    };
    let out = compile(&model);

    let clip = out.controller.clips.get("FX/Breathing").unwrap();
    let scale_curve = clip
        .curves
        .iter()
        .find(|c| c.binding == CurveBinding::new("Tail", CurveTarget::Scale))
        .expect("scale loop on the breathe object");
    assert_eq!(
        scale_curve.keys,
        vec![
            Keyframe::new(0.0, 1.0),
            Keyframe::new(2.3, 1.1),
            Keyframe::new(2.7, 1.1),
            Keyframe::new(5.0, 1.0),
        ]
    );
    // the blend shape loop lands on every skin carrying the shape
    assert!(clip.curves.iter().any(|c| c.binding
        == CurveBinding::new("Body", CurveTarget::BlendShape("Breathe".to_string()))));

    assert!(out.controller.find_layer("FX/Breathing").is_some());
    assert!(out.controller.find_layer("FX/Prop - Breathing").is_some());

    let synced = out
        .synced
        .params
        .iter()
        .find(|p| p.name == "FX__Prop_Breathing")
        .expect("breathing toggle should sync");
    assert_eq!(synced.default, 1.0);
}

#[test]
fn breathing_with_a_missing_object_fails() {
    let model = FxModel {
        breathe_object: Some("Nope".to_string()),
        ..Default::default()
    };
    let err = FxCompiler::new("FX")
        .compile(&model, &fixtures::basic_rig(), fixtures::empty_target())
        .unwrap_err();
    assert!(matches!(err, BuildError::MissingObject(path) if path == "Nope"));
}

#[test]
fn action_states_bake_clips_and_seed_the_defaults() {
    let model = fixtures::model_from_json(
        r#"{
            "props": [
                { "name": "Grin", "kind": "toggle",
                  "state": { "actions": [{ "SetBlendShape": { "name": "Smile" } }] } }
            ]
        }"#,
    )
    .unwrap();
    let out = compile(&model);

    let clip = out.controller.clips.get("FX/prop_Grin").unwrap();
    let binding = CurveBinding::new("Body", CurveTarget::BlendShape("Smile".to_string()));
    let curve = clip.curves.iter().find(|c| c.binding == binding).unwrap();
    assert_eq!(curve.keys, vec![Keyframe::new(0.0, 100.0)]);

    // the defaults clip pins the authored weight
    let defaults = out.controller.clips.get("FX/Defaults").unwrap();
    let pinned = defaults.curves.iter().find(|c| c.binding == binding).unwrap();
    assert_eq!(pinned.keys, vec![Keyframe::new(0.0, 0.0)]);
}

#[test]
fn missing_default_samples_warn_instead_of_failing() {
    let mut rig = fixtures::basic_rig();
    let mut ghost = Clip::new("ghost");
    ghost.enable("DoesNotExist", true);
    rig.clips.insert("ghost".to_string(), ghost);
    let model = FxModel {
        blink: StateSpec::from_clip("ghost"),
        ..Default::default()
    };

    let out = FxCompiler::new("FX")
        .compile(&model, &rig, fixtures::empty_target())
        .expect("an unsampleable binding is a warning, not an error");

    // the defaults clip simply gains no curve for the unresolvable binding
    let defaults = out.controller.clips.get("FX/Defaults").unwrap();
    let binding = CurveBinding::new("DoesNotExist", CurveTarget::Active);
    assert!(defaults.curves.iter().all(|c| c.binding != binding));
}

#[test]
fn library_clip_states_capture_defaults_for_their_bindings() {
    let out = compile(&fixtures::horns_model());
    let defaults = out.controller.clips.get("FX/Defaults").unwrap();
    let binding = CurveBinding::new("Horns", CurveTarget::Active);
    let pinned = defaults.curves.iter().find(|c| c.binding == binding).unwrap();
    // the rig authors Horns inactive
    assert_eq!(pinned.keys, vec![Keyframe::new(0.0, 0.0)]);
}

#[test]
fn unknown_action_targets_are_fatal() {
    let model = fixtures::model_from_json(
        r#"{
            "props": [
                { "name": "Broken", "kind": "toggle",
                  "state": { "actions": [{ "ToggleObject": { "path": "Nope" } }] } }
            ]
        }"#,
    )
    .unwrap();
    let err = FxCompiler::new("FX")
        .compile(&model, &fixtures::basic_rig(), fixtures::empty_target())
        .unwrap_err();
    assert!(matches!(err, BuildError::MissingObject(path) if path == "Nope"));

    let model = fixtures::model_from_json(
        r#"{
            "props": [
                { "name": "Broken", "kind": "toggle",
                  "state": { "actions": [{ "SetBlendShape": { "name": "Nope" } }] } }
            ]
        }"#,
    )
    .unwrap();
    let err = FxCompiler::new("FX")
        .compile(&model, &fixtures::basic_rig(), fixtures::empty_target())
        .unwrap_err();
    assert!(matches!(err, BuildError::MissingBlendShape(name) if name == "Nope"));
}

#[test]
fn instance_props_rebase_their_clip_paths() {
    let model = fixtures::model_from_json(
        r#"{
            "instances": [
                { "root": "Tail",
                  "props": [
                    { "name": "TailHorns", "kind": "toggle",
                      "state": { "clip": { "Library": "horns_on" } } }
                  ] }
            ]
        }"#,
    )
    .unwrap();
    let out = compile(&model);

    let clip = out.controller.clips.get("FX/prop_TailHorns").unwrap();
    assert_eq!(clip.curves[0].binding.path, "Tail/Horns");
}

#[test]
fn empty_states_fall_back_to_the_noop_clip() {
    let out = compile(&fixtures::modes_model(1));
    let noop = out.controller.clips.get("FX/noop").unwrap();
    assert_eq!(noop.curves.len(), 1);
    assert_eq!(noop.curves[0].binding.path, "_ignored");

    let layer = out.controller.find_layer("FX/Prop - Party").unwrap();
    let state = layer.find_state("1").unwrap();
    assert!(state.motion.is_some());
}
