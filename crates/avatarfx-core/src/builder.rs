//! Compilation driver.
//!
//! Sequences the fixed behavioral layers (visemes, gaze, mouth, ears,
//! gesture triggers, blinking, scale, lock, talk indicator) and then the
//! property layers in input order, followed by the synthesized toe-puppet
//! and breathing properties. The whole build is one synchronous pass with
//! exclusive access to the output triple; a fatal error aborts without
//! rollback and the next build's purge is the cleanup path.

use log::warn;

use crate::clips::{from_frames, from_seconds, one_frame, CurveBinding};
use crate::error::BuildError;
use crate::graph::{ClipHandle, Controller, LayerId, MotionRef};
use crate::menu::MenuStore;
use crate::model::{Action, ClipRef, FxModel, Prop, PropPayload, PuppetStop, StateSpec};
use crate::names::{FxNamespace, ParamOpts};
use crate::params::{BoolParam, Condition, NumParam, SyncedParams};
use crate::rig::{Rig, ROOT_PATH};

/// The shared output container: controller graph, menu tree, synced
/// parameter list. A build consumes one and returns the regenerated one.
#[derive(Debug, Clone, Default)]
pub struct BuildTarget {
    pub controller: Controller,
    pub menu: MenuStore,
    pub synced: SyncedParams,
}

/// Single-use compiler for one build pass. [`FxCompiler::compile`] consumes
/// the value, so one instance can drive at most one build; concurrent builds
/// against the same target must be serialized by the caller.
#[derive(Debug)]
pub struct FxCompiler {
    prefix: String,
}

impl FxCompiler {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Purge previously generated artifacts from `target`, then regenerate
    /// the full triple from `model` against `rig`. On error the partially
    /// built target is dropped; no partial state is exposed.
    pub fn compile(
        self,
        model: &FxModel,
        rig: &Rig,
        target: BuildTarget,
    ) -> Result<BuildTarget, BuildError> {
        let mut ns = FxNamespace::new(self.prefix, target.controller, target.menu, target.synced);
        ns.purge();

        let noop = ns.noop_clip();
        let defaults = ns.new_clip("Defaults");
        let lid = ns.new_layer("Defaults");
        let layer = ns.layer(lid);
        let state = layer.new_state("Defaults");
        layer.with_animation(state, MotionRef::Clip(defaults.clone()));

        let build = Build {
            ns,
            model,
            rig,
            noop,
            defaults,
        };
        build.run()
    }
}

struct Build<'a> {
    ns: FxNamespace,
    model: &'a FxModel,
    rig: &'a Rig,
    noop: ClipHandle,
    defaults: ClipHandle,
}

const VISEMES: [&str; 15] = [
    "sil", "PP", "FF", "TH", "DD", "kk", "CH", "SS", "nn", "RR", "aa", "E", "I", "O", "U",
];

const BLINK_CROSSFADE: f32 = 0.07;
const EXPRESSION_CROSSFADE: f32 = 0.1;

impl<'a> Build<'a> {
    fn run(mut self) -> Result<BuildTarget, BuildError> {
        let model = self.model;

        // Host-owned inputs: declared once, unprefixed, invisible to purge.
        let gesture_left = self.ns.new_int("GestureLeft", ParamOpts::new().no_prefix());
        let gesture_right = self.ns.new_int("GestureRight", ParamOpts::new().no_prefix());
        let viseme = self.ns.new_int("Viseme", ParamOpts::new().no_prefix());

        // Constant-true bool standing in for unconditional transitions.
        let always = self
            .ns
            .new_bool("True", ParamOpts::new().default_value(1.0))
            .is_true();

        let mouth_ring = self.ns.new_bool("ContactMouthRing", ParamOpts::new().synced());
        let mouth_hole = self.ns.new_bool("ContactMouthHole", ParamOpts::new().synced());
        let emote_happy = self.ns.new_bool("EmoteHappy", ParamOpts::new().synced());
        let emote_sad = self.ns.new_bool("EmoteSad", ParamOpts::new().synced());
        let emote_angry = self.ns.new_bool("EmoteAngry", ParamOpts::new().synced());
        let emote_tongue = self.ns.new_bool("EmoteTongue", ParamOpts::new().synced());

        // The locks don't need to sync, but the host control surface rejects
        // menu controls bound to unsynced parameters.
        let lock_happy = self.ns.new_bool("EmoteHappyLock", ParamOpts::new().synced());
        self.ns.menu_toggle("Lock Happy", &lock_happy)?;
        let lock_sad = self.ns.new_bool("EmoteSadLock", ParamOpts::new().synced());
        self.ns.menu_toggle("Lock Sad", &lock_sad)?;
        let lock_angry = self.ns.new_bool("EmoteAngryLock", ParamOpts::new().synced());
        self.ns.menu_toggle("Lock Angry", &lock_angry)?;
        let lock_tongue = self.ns.new_bool("EmoteTongueLock", ParamOpts::new().synced());
        self.ns.menu_toggle("Lock Tongue", &lock_tongue)?;

        let blink_trigger_synced = self
            .ns
            .new_bool("BlinkTriggerSynced", ParamOpts::new().synced());
        let blink_trigger = self.ns.new_trigger("BlinkTrigger");
        let blink_active = self.ns.new_bool("BlinkActive", ParamOpts::new().default_value(1.0));
        let scale = self
            .ns
            .new_float("Scale", ParamOpts::new().synced().default_value(0.5));
        self.ns.menu_slider("Scale", &scale)?;

        // VISEMES
        if !model.viseme_folder.is_empty() {
            let lid = self.ns.new_layer("Visemes");
            for (index, text) in VISEMES.iter().enumerate() {
                let key = format!("{}/Viseme-{}", model.viseme_folder, text);
                if self.rig.clip(&key).is_none() {
                    return Err(BuildError::MissingClip(key));
                }
                let layer = self.ns.layer(lid);
                let state = layer.new_state(text);
                layer.with_animation(state, MotionRef::External(key));
                if *text == "sil" {
                    layer.place(state, 3.0, -8.0);
                }
                layer
                    .transition_from_entry(state)
                    .when(viseme.equals(index as f32));
                layer
                    .transition_to_exit(state)
                    .when(viseme.not_equals(index as f32));
            }
        }

        // GAZE
        {
            let closed_motion = self.load_clip("eyesClosed", &model.gaze_closed, None)?;
            let happy_motion = self.load_clip("eyesHappy", &model.gaze_happy, None)?;
            let sad_motion = self.load_clip("eyesSad", &model.gaze_sad, None)?;
            let angry_motion = self.load_clip("eyesAngry", &model.gaze_angry, None)?;

            let lid = self.ns.new_layer("Eyes");
            let layer = self.ns.layer(lid);
            let idle = layer.new_state("Idle");
            layer.drive_bool(idle, &blink_active, true);
            let closed = layer.new_state("Closed");
            layer.with_animation(closed, closed_motion);
            layer.drive_bool(closed, &blink_active, false);
            let happy = layer.new_state("Happy");
            layer.with_animation(happy, happy_motion);
            layer.drive_bool(happy, &blink_active, false);
            let sad = layer.new_state("Sad");
            layer.with_animation(sad, sad_motion);
            layer.drive_bool(sad, &blink_active, false);
            let angry = layer.new_state("Angry");
            layer.with_animation(angry, angry_motion);
            layer.drive_bool(angry, &blink_active, false);

            let cases = [
                (closed, mouth_ring.is_true()),
                (closed, mouth_hole.is_true()),
                (happy, emote_happy.is_true()),
                (sad, emote_sad.is_true()),
                (angry, emote_angry.is_true()),
                (idle, always.clone()),
            ];
            for (state, cond) in cases {
                layer
                    .transition_from_any(state)
                    .to_self()
                    .duration(EXPRESSION_CROSSFADE)
                    .when(cond);
            }
        }

        // MOUTH
        {
            let blep_motion = self.load_clip("mouthBlep", &model.mouth_blep, None)?;
            let suck_motion = self.load_clip("mouthSuck", &model.mouth_suck, None)?;
            let sad_motion = self.load_clip("mouthSad", &model.mouth_sad, None)?;
            let angry_motion = self.load_clip("mouthAngry", &model.mouth_angry, None)?;
            let happy_motion = self.load_clip("mouthHappy", &model.mouth_happy, None)?;

            let lid = self.ns.new_layer("Mouth");
            let layer = self.ns.layer(lid);
            let idle = layer.new_state("Idle");
            let blep = layer.new_state("Blep");
            layer.with_animation(blep, blep_motion);
            let suck = layer.new_state("Suck");
            layer.with_animation(suck, suck_motion);
            let sad = layer.new_state("Sad");
            layer.with_animation(sad, sad_motion);
            let angry = layer.new_state("Angry");
            layer.with_animation(angry, angry_motion);
            let happy = layer.new_state("Happy");
            layer.with_animation(happy, happy_motion);

            let cases = [
                (suck, mouth_ring.is_true()),
                (suck, mouth_hole.is_true()),
                (blep, emote_tongue.is_true()),
                (happy, emote_happy.is_true()),
                (sad, emote_sad.is_true()),
                (angry, emote_angry.is_true()),
                (idle, always.clone()),
            ];
            for (state, cond) in cases {
                layer
                    .transition_from_any(state)
                    .to_self()
                    .duration(EXPRESSION_CROSSFADE)
                    .when(cond);
            }
        }

        // EARS
        {
            let back_motion = self.load_clip("earsBack", &model.ears_back, None)?;
            let lid = self.ns.new_layer("Ears");
            let layer = self.ns.layer(lid);
            let idle = layer.new_state("Idle");
            let back = layer.new_state("Back");
            layer.with_animation(back, back_motion);

            let cases = [
                (back, emote_sad.is_true()),
                (back, emote_angry.is_true()),
                (idle, always.clone()),
            ];
            for (state, cond) in cases {
                layer
                    .transition_from_any(state)
                    .to_self()
                    .duration(EXPRESSION_CROSSFADE)
                    .when(cond);
            }
        }

        // GESTURE TRIGGERS
        let hands = (&gesture_left, &gesture_right);
        self.gesture_trigger_layer("Tongue", &lock_tongue, &emote_tongue, 4.0, hands);
        self.gesture_trigger_layer("Happy", &lock_happy, &emote_happy, 7.0, hands);
        self.gesture_trigger_layer("Sad", &lock_sad, &emote_sad, 6.0, hands);
        self.gesture_trigger_layer("Angry", &lock_angry, &emote_angry, 5.0, hands);

        // BLINK GENERATOR
        //
        // Counter-driven timer: every time unit the counter drops by one;
        // when it runs out the synced toggle flips and the counter is
        // re-randomized. The bounds are load-bearing for blink cadence.
        {
            let blink_counter = self.ns.new_int("BlinkCounter", ParamOpts::new());
            let lid = self.ns.new_layer("Blink - Generator");
            let layer = self.ns.layer(lid);
            let idle = layer.new_state("Idle");
            let subtract = layer.new_state("Subtract");
            let trigger0 = layer.new_state("Trigger 0");
            layer.place_beside(trigger0, subtract, 1.0, 0.0);
            let trigger1 = layer.new_state("Trigger 1");
            layer.place_beside(trigger1, trigger0, 1.0, 0.0);
            let randomize = layer.new_state("Randomize");
            layer.place_beside(randomize, idle, 1.0, 0.0);

            layer
                .transition(idle, trigger0)
                .when(blink_counter.less_than(1.0).and(blink_trigger_synced.is_true()));
            layer.drive_bool(trigger0, &blink_trigger_synced, false);
            layer.transition(trigger0, randomize).when(always.clone());

            layer
                .transition(idle, trigger1)
                .when(blink_counter.less_than(1.0).and(blink_trigger_synced.is_false()));
            layer.drive_bool(trigger1, &blink_trigger_synced, true);
            layer.transition(trigger1, randomize).when(always.clone());

            layer.drive_random(randomize, &blink_counter, 2.0, 10.0);
            layer.transition(randomize, idle).when(always.clone());

            layer.transition(idle, subtract).duration(1.0).when(always.clone());
            layer.drive_delta(subtract, &blink_counter, -1.0);
            layer.transition(subtract, idle).when(always.clone());
        }

        // BLINK RECEIVER
        //
        // Edge-triggers a local pulse each time the synced toggle flips, so
        // the randomized timing lives only in the generator.
        {
            let lid = self.ns.new_layer("Blink - Receiver");
            let layer = self.ns.layer(lid);
            let low = layer.new_state("Trigger == false");
            let high = layer.new_state("Trigger == true");

            layer.transition(low, high).when(blink_trigger_synced.is_true());
            layer.drive_bool(low, &blink_trigger, true);
            layer.transition(high, low).when(blink_trigger_synced.is_false());
            layer.drive_bool(high, &blink_trigger, true);
        }

        // BLINK ANIMATOR
        {
            let blink_motion = self.load_clip("blink", &model.blink, None)?;
            let lid = self.ns.new_layer("Blink - Animate");
            let layer = self.ns.layer(lid);
            let idle = layer.new_state("Idle");
            let check_active = layer.new_state("Check Active");
            let blink = layer.new_state("Blink");
            layer.with_animation(blink, blink_motion);

            layer.transition(idle, check_active).when(blink_trigger.is_true());
            layer
                .transition(check_active, blink)
                .duration(BLINK_CROSSFADE)
                .when(blink_active.is_true());
            layer.transition(check_active, idle).when(always.clone());
            layer
                .transition(blink, idle)
                .duration(BLINK_CROSSFADE)
                .when(always.clone());
        }

        // SCALE
        {
            let scale_clip = self.ns.new_clip("Scale");
            self.ns.controller.clip_mut(&scale_clip).scale(
                ROOT_PATH,
                from_frames(&[(0.0, 0.1), (2.0, 1.0), (3.0, 2.0), (4.0, 10.0)]),
            );
            let lid = self.ns.new_layer("Scale");
            let layer = self.ns.layer(lid);
            let main = layer.new_state("Scale");
            layer.with_animation(main, MotionRef::Clip(scale_clip));
            layer.motion_time(main, &scale);
        }

        // LOCK
        let lewd_sync = self.ns.new_bool("LewdLockSync", ParamOpts::new().synced());
        {
            // Synced for the same menu-binding reason as the emote locks.
            let lewd_menu = self.ns.new_bool("LewdLockMenu", ParamOpts::new().synced());
            self.ns.menu_toggle("Lewd Lock", &lewd_menu)?;
            let lid = self.ns.new_layer("LewdLock");
            let layer = self.ns.layer(lid);
            let locked = layer.new_state("Locked");
            let check = layer.new_state("Check");
            let unlocked = layer.new_state("Unlocked");
            layer.place_beside(unlocked, check, 1.0, 0.0);

            layer.drive_bool(locked, &lewd_menu, false);
            layer.drive_bool(locked, &lewd_sync, false);
            layer.transition(locked, check).when(lewd_menu.is_true());

            layer
                .transition(check, unlocked)
                .when(gesture_left.equals(4.0).and(gesture_right.equals(4.0)));
            layer.transition(check, locked).when(always.clone());

            layer.drive_bool(unlocked, &lewd_sync, true);
            layer.transition(unlocked, locked).when(lewd_menu.is_false());
        }

        // TALK INDICATOR
        if !model.talk_glow.is_empty() {
            let glow_motion = self.load_clip("TalkGlow", &model.talk_glow, None)?;
            let lid = self.ns.new_layer("Talk Glow");
            let layer = self.ns.layer(lid);
            let off = layer.new_state("Off");
            let on = layer.new_state("On");
            layer.with_animation(on, glow_motion);

            layer.transition(off, on).when(viseme.greater_than(9.0));
            layer.transition(on, off).when(viseme.less_than(10.0));
        }

        // PROPERTIES: authored, then nested instances, then synthesized.
        let mut jobs: Vec<(Prop, Option<String>)> = Vec::new();
        for prop in &model.props {
            jobs.push((prop.clone(), None));
        }
        for instance in &model.instances {
            for prop in &instance.props {
                jobs.push((prop.clone(), Some(instance.root.clone())));
            }
        }
        if let Some(toes) = self.synthesize_toes() {
            jobs.push((toes, None));
        }
        if let Some(breathing) = self.synthesize_breathing()? {
            jobs.push((breathing, None));
        }
        for (prop, rebase) in &jobs {
            self.build_prop(prop, rebase.as_deref(), &always, &lewd_sync)?;
        }

        self.ns.controller.validate_unique_names()?;
        let (controller, menu, synced) = self.ns.into_parts();
        Ok(BuildTarget {
            controller,
            menu,
            synced,
        })
    }

    /// 2-state latch: on while the lock is held or either hand shows the
    /// gesture, driving the emote bool both ways.
    fn gesture_trigger_layer(
        &mut self,
        name: &str,
        lock: &BoolParam,
        emote: &BoolParam,
        gesture: f32,
        (left, right): (&NumParam, &NumParam),
    ) {
        let lid = self.ns.new_layer(&format!("Gesture - {}", name));
        let layer = self.ns.layer(lid);
        let off = layer.new_state("Off");
        let on = layer.new_state("On");

        layer.transition(off, on).when(lock.is_true());
        layer.transition(off, on).when(left.equals(gesture));
        layer.transition(off, on).when(right.equals(gesture));
        layer.transition(on, off).when(
            lock.is_false()
                .and(left.not_equals(gesture))
                .and(right.not_equals(gesture)),
        );

        layer.drive_bool(off, emote, false);
        layer.drive_bool(on, emote, true);
    }

    /// One-shot pulse automaton driving the reset targets inactive for two
    /// transit states, so the reset is observed for at least one full
    /// evaluation tick before re-enabling.
    fn physbone_resetter(
        &mut self,
        layer_name: &str,
        bones: &[String],
        always: &Condition,
    ) -> Result<BoolParam, BuildError> {
        let name = format!("{}_PhysBoneReset", layer_name);
        let lid = self.ns.new_layer(&name);
        let param = self.ns.new_trigger(&name);
        let layer = self.ns.layer(lid);
        let idle = layer.new_state("Idle");
        let pause = layer.new_state("Pause");
        let reset1 = layer.new_state("Reset");
        layer.place_beside(reset1, pause, 1.0, 0.0);
        let reset2 = layer.new_state("Reset");
        layer.place_beside(reset2, idle, 1.0, 0.0);
        layer.transition(idle, pause).when(param.is_true());
        layer.transition(pause, reset1).when(always.clone());
        layer.transition(reset1, reset2).when(always.clone());
        layer.transition(reset2, idle).when(always.clone());

        let clip = self.ns.new_clip(&name);
        for bone in bones {
            let obj = self
                .rig
                .object(bone)
                .ok_or_else(|| BuildError::MissingObject(bone.clone()))?;
            let active = obj.active;
            self.ns.controller.clip_mut(&clip).enable(bone, false);
            self.ns
                .controller
                .clip_mut(&self.defaults)
                .enable(bone, active);
        }

        let layer = self.ns.layer(lid);
        layer.with_animation(reset1, MotionRef::Clip(clip.clone()));
        layer.with_animation(reset2, MotionRef::Clip(clip));

        Ok(param)
    }

    fn build_prop(
        &mut self,
        prop: &Prop,
        rebase: Option<&str>,
        always: &Condition,
        lewd_sync: &BoolParam,
    ) -> Result<(), BuildError> {
        let layer_name = format!("Prop - {}", prop.name);
        let lid = self.ns.new_layer(&layer_name);

        let resetter = if prop.reset_phys_bones.is_empty() {
            None
        } else {
            Some(self.physbone_resetter(&layer_name, &prop.reset_phys_bones, always)?)
        };

        match &prop.payload {
            PropPayload::Puppet { stops } => {
                self.build_blend_prop(&prop.name, lid, stops, true, rebase)?;
            }
            PropPayload::Toggle {
                state,
                slider: true,
                ..
            } => {
                let stops = [PuppetStop::new(1.0, 0.0, state.clone())];
                self.build_blend_prop(&prop.name, lid, &stops, false, rebase)?;
            }
            PropPayload::Modes { modes } => {
                let layer = self.ns.layer(lid);
                let off = layer.new_state("Off");
                let param = self.ns.new_int(
                    &format!("Prop_{}", prop.name),
                    ParamOpts::new().synced().saved(prop.saved),
                );
                self.ns
                    .menu_toggle_value(&format!("{} - Off", prop.name), &param, 0.0)?;
                if let Some(reset) = &resetter {
                    self.ns.layer(lid).drive_bool(off, reset, true);
                }
                for (index, mode) in modes.iter().enumerate() {
                    let num = (index + 1) as f32;
                    let motion =
                        self.load_clip(&format!("prop_{}_{}", prop.name, index + 1), mode, rebase)?;
                    let layer = self.ns.layer(lid);
                    let state = layer.new_state(&format!("{}", index + 1));
                    layer.with_animation(state, motion);
                    if let Some(reset) = &resetter {
                        layer.drive_bool(state, reset, true);
                    }
                    if prop.lewd_gated {
                        layer
                            .transition_from_any(state)
                            .when(param.equals(num).and(lewd_sync.is_true()));
                        layer.transition_to_exit(state).when(param.not_equals(num));
                        layer.transition_to_exit(state).when(lewd_sync.is_false());
                    } else {
                        layer.transition_from_any(state).when(param.equals(num));
                        layer.transition_to_exit(state).when(param.not_equals(num));
                    }
                    self.ns
                        .menu_toggle_value(&format!("{} - {}", prop.name, index + 1), &param, num)?;
                }
            }
            PropPayload::Toggle {
                state,
                slider: false,
                default_on,
            } => {
                let motion = self.load_clip(&format!("prop_{}", prop.name), state, rebase)?;
                let param = self.ns.new_bool(
                    &format!("Prop_{}", prop.name),
                    ParamOpts::new()
                        .synced()
                        .saved(prop.saved)
                        .default_value(if *default_on { 1.0 } else { 0.0 }),
                );
                let layer = self.ns.layer(lid);
                let off = layer.new_state("Off");
                let on = layer.new_state("On");
                layer.with_animation(on, motion);
                if prop.lewd_gated {
                    layer
                        .transition(off, on)
                        .when(param.is_true().and(lewd_sync.is_true()));
                    layer.transition(on, off).when(param.is_false());
                    layer.transition(on, off).when(lewd_sync.is_false());
                } else {
                    layer.transition(off, on).when(param.is_true());
                    layer.transition(on, off).when(param.is_false());
                }
                if let Some(reset) = &resetter {
                    layer.drive_bool(off, reset, true);
                    layer.drive_bool(on, reset, true);
                }
                self.ns.menu_toggle(&prop.name, &param)?;
            }
        }
        Ok(())
    }

    /// Blend-tree compilation shared by puppet properties and slider
    /// toggles: a 2D free-form tree seeded with the neutral no-op child at
    /// the origin, one child per stop. An axis no stop moves along is left
    /// unsynced and off the menu.
    fn build_blend_prop(
        &mut self,
        name: &str,
        lid: LayerId,
        stops: &[PuppetStop],
        is_puppet: bool,
        rebase: Option<&str>,
    ) -> Result<(), BuildError> {
        let tree = self.ns.new_tree(&format!("prop_{}", name));
        let noop = MotionRef::Clip(self.noop.clone());
        self.ns.controller.tree_mut(&tree).add_child(noop, 0.0, 0.0);

        let mut uses_x = false;
        let mut uses_y = false;
        for (index, stop) in stops.iter().enumerate() {
            if stop.x != 0.0 {
                uses_x = true;
            }
            if stop.y != 0.0 {
                uses_y = true;
            }
            let motion =
                self.load_clip(&format!("prop_{}_{}", name, index), &stop.state, rebase)?;
            self.ns
                .controller
                .tree_mut(&tree)
                .add_child(motion, stop.x, stop.y);
        }

        let layer = self.ns.layer(lid);
        let blend = layer.new_state("Blend");
        layer.with_animation(blend, MotionRef::Tree(tree.clone()));

        let x_opts = if uses_x {
            ParamOpts::new().synced()
        } else {
            ParamOpts::new()
        };
        let x = self.ns.new_float(&format!("Prop_{}_x", name), x_opts);
        self.ns.controller.tree_mut(&tree).param_x = x.name().to_string();
        let y_opts = if uses_y {
            ParamOpts::new().synced()
        } else {
            ParamOpts::new()
        };
        let y = self.ns.new_float(&format!("Prop_{}_y", name), y_opts);
        self.ns.controller.tree_mut(&tree).param_y = y.name().to_string();

        if is_puppet {
            self.ns
                .menu_puppet(name, uses_x.then_some(&x), uses_y.then_some(&y))?;
        } else if uses_x {
            self.ns.menu_slider(name, &x)?;
        }
        Ok(())
    }

    /// Puppet property assembled from the configured toe pose slots.
    fn synthesize_toes(&self) -> Option<Prop> {
        let model = self.model;
        let mut stops = Vec::new();
        if !model.toes_down.is_empty() {
            stops.push(PuppetStop::new(0.0, -1.0, model.toes_down.clone()));
        }
        if !model.toes_up.is_empty() {
            stops.push(PuppetStop::new(0.0, 1.0, model.toes_up.clone()));
        }
        if !model.toes_splay.is_empty() {
            stops.push(PuppetStop::new(-1.0, 0.0, model.toes_splay.clone()));
            stops.push(PuppetStop::new(1.0, 0.0, model.toes_splay.clone()));
        }
        if stops.is_empty() {
            return None;
        }
        Some(Prop {
            name: "Toes".to_string(),
            saved: false,
            lewd_gated: false,
            reset_phys_bones: Vec::new(),
            payload: PropPayload::Puppet { stops },
        })
    }

    /// Default-on toggle property around a generated 5-second breathing
    /// loop, plus an always-on layer playing it.
    fn synthesize_breathing(&mut self) -> Result<Option<Prop>, BuildError> {
        let model = self.model;
        if model.breathe_object.is_none() && model.breathe_blendshape.is_empty() {
            return Ok(None);
        }

        let clip = self.ns.new_clip("Breathing");
        if let Some(path) = &model.breathe_object {
            if self.rig.object(path).is_none() {
                return Err(BuildError::MissingObject(path.clone()));
            }
            self.ns.controller.clip_mut(&clip).scale(
                path,
                from_seconds(&[
                    (0.0, model.breathe_scale_min),
                    (2.3, model.breathe_scale_max),
                    (2.7, model.breathe_scale_max),
                    (5.0, model.breathe_scale_min),
                ]),
            );
        }
        if !model.breathe_blendshape.is_empty() {
            let shape = &model.breathe_blendshape;
            let paths: Vec<String> = self
                .rig
                .skins()
                .filter(|(_, skin)| skin.has_shape(shape))
                .map(|(path, _)| path.to_string())
                .collect();
            for path in &paths {
                self.ns.controller.clip_mut(&clip).blend_shape(
                    path,
                    shape,
                    from_seconds(&[(0.0, 0.0), (2.3, 100.0), (2.7, 100.0), (5.0, 0.0)]),
                );
            }
        }

        let lid = self.ns.new_layer("Breathing");
        let layer = self.ns.layer(lid);
        let state = layer.new_state("Breathe");
        layer.with_animation(state, MotionRef::Clip(clip.clone()));

        Ok(Some(Prop {
            name: "Breathing".to_string(),
            saved: false,
            lewd_gated: false,
            reset_phys_bones: Vec::new(),
            payload: PropPayload::Toggle {
                state: StateSpec {
                    clip: Some(ClipRef::Generated(clip)),
                    actions: Vec::new(),
                },
                slider: false,
                default_on: true,
            },
        }))
    }

    /// Resolve a state spec to a motion, generating a clip when the spec is
    /// action-based and capturing the rig's current value for every touched
    /// binding into the shared defaults clip.
    fn load_clip(
        &mut self,
        name: &str,
        spec: &StateSpec,
        rebase: Option<&str>,
    ) -> Result<MotionRef, BuildError> {
        if let Some(clip_ref) = &spec.clip {
            return match clip_ref {
                ClipRef::Generated(handle) => {
                    let handle = handle.clone();
                    self.capture_defaults_from_clip(&handle);
                    Ok(MotionRef::Clip(handle))
                }
                ClipRef::Library(key) => {
                    let authored = self
                        .rig
                        .clip(key)
                        .ok_or_else(|| BuildError::MissingClip(key.clone()))?;
                    if let Some(root) = rebase {
                        // Copy the clip with every curve path rebased under
                        // the instance root so it addresses the host rig.
                        let mut curves = authored.curves.clone();
                        for curve in &mut curves {
                            curve.binding.path = rebase_path(root, &curve.binding.path);
                        }
                        let handle = self.ns.new_clip(name);
                        self.ns.controller.clip_mut(&handle).curves = curves;
                        self.capture_defaults_from_clip(&handle);
                        Ok(MotionRef::Clip(handle))
                    } else {
                        let bindings: Vec<CurveBinding> = authored.bindings().cloned().collect();
                        self.capture_defaults(&bindings);
                        Ok(MotionRef::External(key.clone()))
                    }
                }
            };
        }

        if spec.actions.is_empty() {
            return Ok(MotionRef::Clip(self.noop.clone()));
        }

        let rig = self.rig;
        let handle = self.ns.new_clip(name);
        for action in &spec.actions {
            match action {
                Action::ToggleObject { path } => {
                    let obj = rig
                        .object(path)
                        .ok_or_else(|| BuildError::MissingObject(path.clone()))?;
                    let active = obj.active;
                    self.ns.controller.clip_mut(&handle).enable(path, !active);
                    self.ns
                        .controller
                        .clip_mut(&self.defaults)
                        .enable(path, active);
                }
                Action::SetBlendShape { name: shape } => {
                    let matches: Vec<(String, f32)> = rig
                        .skins()
                        .filter_map(|(path, skin)| {
                            skin.blend_shapes
                                .get(shape)
                                .map(|weight| (path.to_string(), *weight))
                        })
                        .collect();
                    if matches.is_empty() {
                        return Err(BuildError::MissingBlendShape(shape.clone()));
                    }
                    for (path, weight) in matches {
                        self.ns.controller.clip_mut(&handle).blend_shape(
                            &path,
                            shape,
                            one_frame(100.0),
                        );
                        self.ns.controller.clip_mut(&self.defaults).blend_shape(
                            &path,
                            shape,
                            one_frame(weight),
                        );
                    }
                }
            }
        }
        Ok(MotionRef::Clip(handle))
    }

    fn capture_defaults_from_clip(&mut self, handle: &ClipHandle) {
        let bindings: Vec<CurveBinding> = match self.ns.controller.clip(handle) {
            Some(clip) => clip.bindings().cloned().collect(),
            None => Vec::new(),
        };
        self.capture_defaults(&bindings);
    }

    fn capture_defaults(&mut self, bindings: &[CurveBinding]) {
        for binding in bindings {
            match self.rig.sample(binding) {
                Some(value) => {
                    self.ns
                        .controller
                        .clip_mut(&self.defaults)
                        .set_curve(binding.clone(), one_frame(value));
                }
                None => warn!("missing default value for: {}", binding.path),
            }
        }
    }
}

fn rebase_path(root: &str, path: &str) -> String {
    if path.is_empty() {
        root.to_string()
    } else {
        format!("{}/{}", root, path)
    }
}
