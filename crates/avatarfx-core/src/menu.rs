//! Paginated expressions-menu tree.
//!
//! The root menu belongs to the user; the compiler contributes a single
//! submenu link at the root, and behind it a singly-linked chain of pages.
//! Every page holds at most [`MAX_CONTROLS`] controls, counting the link to
//! the next page.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Capacity of one menu page, including a next-page link when present.
pub const MAX_CONTROLS: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MenuControlKind {
    /// Sets a parameter to a fixed value while active.
    Toggle { param: String, value: f32 },
    /// Radial slider scrubbing one float parameter over 0..1.
    Slider { param: String },
    /// Two-axis puppet driving up to two float parameters over -1..1.
    /// An unused axis is `None` and exposes no parameter.
    Puppet {
        x: Option<String>,
        y: Option<String>,
    },
    /// Link to another page, addressed by page name.
    SubMenu { page: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuControl {
    pub label: String,
    pub kind: MenuControlKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuNode {
    pub controls: Vec<MenuControl>,
}

impl MenuNode {
    pub fn is_full(&self) -> bool {
        self.controls.len() >= MAX_CONTROLS
    }
}

/// The user's root menu plus every named page asset generated under it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuStore {
    pub root: MenuNode,
    pub pages: IndexMap<String, MenuNode>,
}

impl MenuStore {
    pub fn page(&self, name: &str) -> Option<&MenuNode> {
        self.pages.get(name)
    }
}
