//! Namespace manager: every artifact the compiler creates goes through here
//! so that it carries the reserved prefix, lands in the right store, and can
//! later be purged by tag.
//!
//! Naming discipline: layers, clips, and blend trees are named
//! `{prefix}/{name}`; parameters are named `{prefix}__{name}` unless declared
//! with `no_prefix` (host-owned parameters such as `GestureLeft`). Purge
//! matches on `starts_with(prefix)`, which covers both shapes and never
//! touches user-authored content.

use crate::clips::{constant, Clip, CurveBinding, CurveTarget, FRAME};
use crate::error::BuildError;
use crate::graph::{BlendKind, BlendTree, ClipHandle, Controller, Layer, LayerId, TreeHandle};
use crate::menu::{MenuControl, MenuControlKind, MenuNode, MenuStore, MAX_CONTROLS};
use crate::params::{BoolParam, GraphParam, NumParam, ParamType, SyncType, SyncedParam, SyncedParams};

/// Declaration options for a parameter.
///
/// Declaring the same prefixed name twice in one build produces two table
/// entries and fails the commit-time uniqueness check; callers own that
/// discipline. Unprefixed declarations instead bind to the host's existing
/// entry when one is present, since purge never removes host parameters.
#[derive(Debug, Clone, Copy)]
pub struct ParamOpts {
    pub synced: bool,
    pub saved: bool,
    pub default: f32,
    pub use_prefix: bool,
}

impl Default for ParamOpts {
    fn default() -> Self {
        Self {
            synced: false,
            saved: false,
            default: 0.0,
            use_prefix: true,
        }
    }
}

impl ParamOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn synced(mut self) -> Self {
        self.synced = true;
        self
    }

    pub fn saved(mut self, saved: bool) -> Self {
        self.saved = saved;
        self
    }

    pub fn default_value(mut self, value: f32) -> Self {
        self.default = value;
        self
    }

    pub fn no_prefix(mut self) -> Self {
        self.use_prefix = false;
        self
    }
}

/// Owns the output triple for the duration of one build and hands out
/// prefixed artifacts. See the module docs for the naming discipline.
#[derive(Debug)]
pub struct FxNamespace {
    prefix: String,
    pub controller: Controller,
    pub menu: MenuStore,
    pub synced: SyncedParams,
    noop: Option<ClipHandle>,
    fx_page: Option<String>,
    last_page: Option<String>,
    page_count: u32,
}

impl FxNamespace {
    pub fn new(
        prefix: impl Into<String>,
        controller: Controller,
        menu: MenuStore,
        synced: SyncedParams,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            controller,
            menu,
            synced,
            noop: None,
            fx_page: None,
            last_page: None,
            page_count: 0,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn into_parts(self) -> (Controller, MenuStore, SyncedParams) {
        (self.controller, self.menu, self.synced)
    }

    fn asset_name(&self, name: &str) -> String {
        format!("{}/{}", self.prefix, name)
    }

    fn param_name(&self, name: &str) -> String {
        format!("{}__{}", self.prefix, name)
    }

    /// Delete every artifact carrying the reserved prefix across all five
    /// stores: clip/tree assets, layers, controller parameters, synced
    /// parameters, and the generated menu subtree. The passes are order
    /// independent; user-authored content is untouched. Running against a
    /// target with no generated content is a no-op.
    pub fn purge(&mut self) {
        self.noop = None;
        self.fx_page = None;
        self.last_page = None;
        self.page_count = 0;

        let prefix = self.prefix.clone();
        self.controller
            .clips
            .retain(|name, _| !name.starts_with(&prefix));
        self.controller
            .trees
            .retain(|name, _| !name.starts_with(&prefix));
        self.controller
            .layers
            .retain(|layer| !layer.name.starts_with(&prefix));
        self.controller
            .parameters
            .retain(|param| !param.name.starts_with(&prefix));
        self.synced
            .params
            .retain(|param| !param.name.starts_with(&prefix));
        self.menu.root.controls.retain(|c| c.label != prefix);
        self.menu.pages.retain(|name, _| !name.starts_with(&prefix));
    }

    // ---- controller assets -------------------------------------------------

    /// The shared neutral clip: a constant curve on a reserved ignored path,
    /// one frame long. Created lazily, once per build.
    pub fn noop_clip(&mut self) -> ClipHandle {
        if let Some(handle) = &self.noop {
            return handle.clone();
        }
        let handle = self.new_clip("noop");
        self.controller.clip_mut(&handle).set_curve(
            CurveBinding::new("_ignored", CurveTarget::Active),
            constant(FRAME, 0.0),
        );
        self.noop = Some(handle.clone());
        handle
    }

    pub fn new_clip(&mut self, name: &str) -> ClipHandle {
        let full = self.asset_name(name);
        self.controller
            .clips
            .insert(full.clone(), Clip::new(full.clone()));
        ClipHandle(full)
    }

    pub fn new_tree(&mut self, name: &str) -> TreeHandle {
        let full = self.asset_name(name);
        self.controller.trees.insert(
            full.clone(),
            BlendTree {
                name: full.clone(),
                kind: BlendKind::FreeformDirectional2D,
                param_x: String::new(),
                param_y: String::new(),
                children: Vec::new(),
            },
        );
        TreeHandle(full)
    }

    pub fn new_layer(&mut self, name: &str) -> LayerId {
        let id = LayerId(self.controller.layers.len());
        self.controller
            .layers
            .push(Layer::new(self.asset_name(name)));
        id
    }

    pub fn layer(&mut self, id: LayerId) -> &mut Layer {
        self.controller.layer_mut(id)
    }

    // ---- parameters --------------------------------------------------------

    fn declare(&mut self, name: &str, ty: ParamType, sync: SyncType, opts: ParamOpts) -> String {
        let full = if opts.use_prefix {
            self.param_name(name)
        } else {
            let full = name.to_string();
            if self.controller.parameters.iter().any(|p| p.name == full) {
                return full;
            }
            full
        };
        if opts.synced {
            self.synced.params.push(SyncedParam {
                name: full.clone(),
                ty: sync,
                default: opts.default,
                saved: opts.saved,
            });
        }
        self.controller.add_param(GraphParam {
            name: full.clone(),
            ty,
            default: opts.default,
        });
        full
    }

    pub fn new_bool(&mut self, name: &str, opts: ParamOpts) -> BoolParam {
        BoolParam::new(self.declare(name, ParamType::Bool, SyncType::Bool, opts))
    }

    pub fn new_int(&mut self, name: &str, opts: ParamOpts) -> NumParam {
        NumParam::new(self.declare(name, ParamType::Int, SyncType::Int, opts))
    }

    pub fn new_float(&mut self, name: &str, opts: ParamOpts) -> NumParam {
        NumParam::new(self.declare(name, ParamType::Float, SyncType::Float, opts))
    }

    /// Triggers are boolean-typed signals local to the controller; they are
    /// never synced as a wire type.
    pub fn new_trigger(&mut self, name: &str) -> BoolParam {
        BoolParam::new(self.declare(
            name,
            ParamType::Trigger,
            SyncType::Bool,
            ParamOpts::default(),
        ))
    }

    // ---- menu --------------------------------------------------------------

    /// The generated submenu linked from the user's root menu, which is also
    /// the first page of the control chain. Fails if the root menu is full:
    /// that is an unrecoverable configuration error.
    fn fx_page(&mut self) -> Result<String, BuildError> {
        if let Some(name) = &self.fx_page {
            return Ok(name.clone());
        }
        if self.menu.root.is_full() {
            return Err(BuildError::RootMenuFull);
        }
        let name = self.prefix.clone();
        self.menu.pages.insert(name.clone(), MenuNode::default());
        self.menu.root.controls.push(MenuControl {
            label: name.clone(),
            kind: MenuControlKind::SubMenu { page: name.clone() },
        });
        self.fx_page = Some(name.clone());
        self.last_page = Some(name.clone());
        Ok(name)
    }

    /// The page new controls append to. When the current page has only one
    /// slot left, that slot becomes a link to a freshly allocated page and
    /// the chain extends.
    fn writable_page(&mut self) -> Result<String, BuildError> {
        self.fx_page()?;
        let current = self
            .last_page
            .clone()
            .expect("fx_page sets the chain head");
        if self.menu.pages[&current].controls.len() < MAX_CONTROLS - 1 {
            return Ok(current);
        }
        self.page_count += 1;
        let next = format!("{}_{}", self.prefix, self.page_count);
        self.menu.pages.insert(next.clone(), MenuNode::default());
        self.menu.pages[&current].controls.push(MenuControl {
            label: "Next".to_string(),
            kind: MenuControlKind::SubMenu { page: next.clone() },
        });
        self.last_page = Some(next.clone());
        Ok(next)
    }

    fn push_control(&mut self, control: MenuControl) -> Result<(), BuildError> {
        let page = self.writable_page()?;
        self.menu.pages[&page].controls.push(control);
        Ok(())
    }

    pub fn menu_toggle(&mut self, label: &str, param: &BoolParam) -> Result<(), BuildError> {
        self.push_control(MenuControl {
            label: label.to_string(),
            kind: MenuControlKind::Toggle {
                param: param.name().to_string(),
                value: 1.0,
            },
        })
    }

    /// Toggle bound to a numeric parameter with a fixed activation value,
    /// used by multi-mode properties.
    pub fn menu_toggle_value(
        &mut self,
        label: &str,
        param: &NumParam,
        value: f32,
    ) -> Result<(), BuildError> {
        self.push_control(MenuControl {
            label: label.to_string(),
            kind: MenuControlKind::Toggle {
                param: param.name().to_string(),
                value,
            },
        })
    }

    pub fn menu_slider(&mut self, label: &str, param: &NumParam) -> Result<(), BuildError> {
        self.push_control(MenuControl {
            label: label.to_string(),
            kind: MenuControlKind::Slider {
                param: param.name().to_string(),
            },
        })
    }

    pub fn menu_puppet(
        &mut self,
        label: &str,
        x: Option<&NumParam>,
        y: Option<&NumParam>,
    ) -> Result<(), BuildError> {
        self.push_control(MenuControl {
            label: label.to_string(),
            kind: MenuControlKind::Puppet {
                x: x.map(|p| p.name().to_string()),
                y: y.map(|p| p.name().to_string()),
            },
        })
    }
}
