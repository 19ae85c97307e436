use std::collections::BTreeMap;

use crate::messages::visualization_msgs::MenuEntry;

/// Id of the implicit root every top-level entry hangs off.
pub const MENU_ROOT: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: u32,
    pub title: String,
}

/// One level of a marker menu, waiting for the user to pick an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuPrompt {
    pub marker_name: String,
    pub control_name: String,
    pub items: Vec<MenuItem>,
}

/// Menu hierarchy rebuilt from the flat `(id, parent_id)` entry list.
#[derive(Debug, Clone, Default)]
pub struct MenuTree {
    children: BTreeMap<u32, Vec<MenuItem>>,
}

impl MenuTree {
    pub fn from_entries(entries: &[MenuEntry]) -> Self {
        let mut children: BTreeMap<u32, Vec<MenuItem>> = BTreeMap::new();
        for entry in entries {
            children.entry(entry.parent_id).or_default().push(MenuItem {
                id: entry.id,
                title: entry.title.clone(),
            });
        }
        Self { children }
    }

    /// Entries directly below `parent`, in message order.
    pub fn children(&self, parent: u32) -> &[MenuItem] {
        self.children.get(&parent).map_or(&[], Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Result of choosing a menu entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuStep {
    /// The entry has children; show them next.
    Descend(Vec<MenuItem>),
    /// A leaf was chosen; its id is the selection.
    Selected(u32),
}

impl MenuTree {
    pub fn step(&self, chosen: u32) -> MenuStep {
        match self.children(chosen) {
            [] => MenuStep::Selected(chosen),
            items => MenuStep::Descend(items.to_vec()),
        }
    }
}
