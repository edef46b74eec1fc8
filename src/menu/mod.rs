//! Hierarchical menu state machine.
//!
//! All nodes live in one arena ([`MenuTree`]); parent and child links are
//! indices, so the parent back-reference used by "Back" is plain data.
//!
//! ```text
//!  Main Menu ─┬─ Gin & Tonic          (Leaf: drink)
//!             ├─ Rum & Coke           (Leaf: drink)
//!             └─ Configure ─┬─ Pump 1 ─┬─ Gin *   (Leaf: assign)
//!                           │          ├─ Rum
//!                           │          └─ Back
//!                           ├─ Clean              (Leaf: clean)
//!                           ├─ Test Pumps         (Leaf: pump test)
//!                           └─ Back
//! ```
//!
//! ## Transitions
//!
//! | Input            | Effect                                             |
//! |------------------|----------------------------------------------------|
//! | advance          | highlight next visible sibling, wrapping           |
//! | select Leaf      | delegate `on_select`, then per [`LeafPolicy`]      |
//! | select SubMenu   | descend, highlight first visible child             |
//! | select Back      | ascend, highlight the sub-menu just left           |
//!
//! Before every render the [`MenuDelegate`] recomputes visibility and
//! labels; the cursor is then re-normalised so the highlight always names
//! a visible child (or nothing, when no child is visible).

pub mod build;

pub use build::{apply_filters, build_menu};

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A node known to be a sub-menu.  Only the tree hands these out, so
/// children can only ever be attached to sub-menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuId(NodeId);

impl MenuId {
    pub fn node(self) -> NodeId {
        self.0
    }
}

/// What selecting a leaf does.  Dispatched by one exhaustive `match` in
/// the session's selection handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafAction {
    /// Pour the named recipe.
    Drink { recipe: String },
    /// Load `ingredient` (or nothing) into `slot`.
    AssignPump {
        slot: String,
        ingredient: Option<String>,
        option: String,
    },
    /// Flush every line.
    Clean,
    /// Run each pump alone in turn.
    TestPumps,
}

impl LeafAction {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Drink { .. } => "drink",
            Self::AssignPump { .. } => "pump-assignment",
            Self::Clean => "clean",
            Self::TestPumps => "pump-test",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Leaf(LeafAction),
    SubMenu { children: Vec<NodeId> },
    Back,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuNode {
    label: String,
    visible: bool,
    parent: Option<NodeId>,
    kind: NodeKind,
}

impl MenuNode {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }
}

/// Arena-backed menu tree.  Built once; afterwards only labels and
/// visibility change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuTree {
    nodes: Vec<MenuNode>,
}

impl MenuTree {
    pub fn new(root_label: impl Into<String>) -> Self {
        Self {
            nodes: vec![MenuNode {
                label: root_label.into(),
                visible: true,
                parent: None,
                kind: NodeKind::SubMenu {
                    children: Vec::new(),
                },
            }],
        }
    }

    pub fn root(&self) -> MenuId {
        MenuId(NodeId(0))
    }

    pub fn add_submenu(&mut self, parent: MenuId, label: impl Into<String>) -> MenuId {
        MenuId(self.push(
            parent,
            label.into(),
            NodeKind::SubMenu {
                children: Vec::new(),
            },
        ))
    }

    pub fn add_leaf(&mut self, parent: MenuId, label: impl Into<String>, action: LeafAction) -> NodeId {
        self.push(parent, label.into(), NodeKind::Leaf(action))
    }

    pub fn add_back(&mut self, parent: MenuId) -> NodeId {
        self.push(parent, "Back".to_owned(), NodeKind::Back)
    }

    fn push(&mut self, parent: MenuId, label: String, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(MenuNode {
            label,
            visible: true,
            parent: Some(parent.0),
            kind,
        });
        match &mut self.nodes[parent.0.0].kind {
            NodeKind::SubMenu { children } => children.push(id),
            NodeKind::Leaf(_) | NodeKind::Back => unreachable!("MenuId always names a sub-menu"),
        }
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &MenuNode {
        &self.nodes[id.0]
    }

    /// All children, visible or not.  Empty for leaves and Back.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.nodes[id.0].kind {
            NodeKind::SubMenu { children } => children,
            NodeKind::Leaf(_) | NodeKind::Back => &[],
        }
    }

    pub fn visible_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.nodes[c.0].visible)
            .collect()
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        self.nodes[id.0].visible = visible;
    }

    pub fn set_label(&mut self, id: NodeId, label: String) {
        if self.nodes[id.0].label != label {
            self.nodes[id.0].label = label;
        }
    }

    /// Every leaf with its action, in arena order.
    pub fn leaves(&self) -> impl Iterator<Item = (NodeId, &LeafAction)> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, n)| match &n.kind {
            NodeKind::Leaf(action) => Some((NodeId(i), action)),
            NodeKind::SubMenu { .. } | NodeKind::Back => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Delegate
// ---------------------------------------------------------------------------

/// Behaviour bound to the menu.
pub trait MenuDelegate {
    /// Recompute visibility and labels.  Must be idempotent and touch
    /// nothing but the tree.
    fn prepare_for_render(&self, tree: &mut MenuTree);

    /// Perform a leaf's action.  `false` means it failed or was refused.
    fn on_select(&mut self, action: &LeafAction) -> bool;
}

/// Where the cursor goes after a leaf action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeafPolicy {
    /// Back to the root after any leaf action, successful or not.
    #[default]
    AlwaysReturnToRoot,
    /// Back to the root on success; a failed action leaves the cursor put.
    ReturnToRootOnSuccess,
}

// ---------------------------------------------------------------------------
// Cursor + state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuCursor {
    node: NodeId,
    /// Index into `children(node)`; always a visible child.
    highlighted: Option<usize>,
}

impl MenuCursor {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn highlighted_index(&self) -> Option<usize> {
        self.highlighted
    }
}

/// Outcome of [`Menu::select`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Nothing highlighted.
    Nothing,
    Descended(NodeId),
    Ascended(NodeId),
    Action { action: LeafAction, succeeded: bool },
}

#[derive(Debug, Clone)]
pub struct Menu {
    tree: MenuTree,
    cursor: MenuCursor,
    policy: LeafPolicy,
}

impl Menu {
    pub fn new(tree: MenuTree, policy: LeafPolicy) -> Self {
        let root = tree.root().node();
        let mut menu = Self {
            tree,
            cursor: MenuCursor {
                node: root,
                highlighted: None,
            },
            policy,
        };
        menu.enter(root, None);
        menu
    }

    pub fn tree(&self) -> &MenuTree {
        &self.tree
    }

    pub fn cursor(&self) -> MenuCursor {
        self.cursor
    }

    pub fn policy(&self) -> LeafPolicy {
        self.policy
    }

    /// The highlighted child node, if any.
    pub fn highlighted(&self) -> Option<NodeId> {
        self.cursor
            .highlighted
            .map(|i| self.tree.children(self.cursor.node)[i])
    }

    /// Run the delegate's render hook and re-normalise the highlight.
    pub fn refresh<D: MenuDelegate + ?Sized>(&mut self, delegate: &D) {
        delegate.prepare_for_render(&mut self.tree);
        self.cursor.highlighted = self.nearest_visible(self.cursor.node, self.cursor.highlighted.unwrap_or(0));
    }

    /// Move the highlight to the next visible sibling, wrapping.
    pub fn advance(&mut self) {
        let Some(current) = self.cursor.highlighted else {
            return;
        };
        let count = self.tree.children(self.cursor.node).len();
        self.cursor.highlighted = self.nearest_visible(self.cursor.node, (current + 1) % count);
    }

    pub fn select<D: MenuDelegate + ?Sized>(&mut self, delegate: &mut D) -> Selection {
        let Some(target) = self.highlighted() else {
            return Selection::Nothing;
        };

        match self.tree.node(target).kind.clone() {
            NodeKind::SubMenu { .. } => {
                self.enter(target, None);
                Selection::Descended(target)
            }
            NodeKind::Back => {
                let leaving = self.cursor.node;
                match self.tree.node(leaving).parent {
                    Some(parent) => {
                        let came_from = self
                            .tree
                            .children(parent)
                            .iter()
                            .position(|&c| c == leaving);
                        self.enter(parent, came_from);
                        Selection::Ascended(parent)
                    }
                    None => Selection::Nothing,
                }
            }
            NodeKind::Leaf(action) => {
                let succeeded = delegate.on_select(&action);
                if succeeded || self.policy == LeafPolicy::AlwaysReturnToRoot {
                    self.refresh(&*delegate);
                    self.enter(self.tree.root().node(), None);
                }
                Selection::Action { action, succeeded }
            }
        }
    }

    /// Snapshot of the current page for a display adapter.
    pub fn view(&self) -> MenuView {
        let node = self.cursor.node;
        let visible = self.tree.visible_children(node);
        let highlighted = self.highlighted();
        MenuView {
            title: self.tree.node(node).label.clone(),
            items: visible
                .iter()
                .map(|&c| {
                    let n = self.tree.node(c);
                    MenuItemView {
                        label: n.label.clone(),
                        kind: match n.kind {
                            NodeKind::Leaf(_) => ItemKind::Leaf,
                            NodeKind::SubMenu { .. } => ItemKind::SubMenu,
                            NodeKind::Back => ItemKind::Back,
                        },
                    }
                })
                .collect(),
            highlighted: highlighted.and_then(|h| visible.iter().position(|&c| c == h)),
        }
    }

    fn enter(&mut self, node: NodeId, prefer: Option<usize>) {
        self.cursor.node = node;
        self.cursor.highlighted = self.nearest_visible(node, prefer.unwrap_or(0));
    }

    /// First visible child at or after `start`, wrapping.
    fn nearest_visible(&self, node: NodeId, start: usize) -> Option<usize> {
        let children = self.tree.children(node);
        let count = children.len();
        (0..count)
            .map(|offset| (start + offset) % count)
            .find(|&i| self.tree.node(children[i]).visible)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Leaf,
    SubMenu,
    Back,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItemView {
    pub label: String,
    pub kind: ItemKind,
}

/// One rendered page: the current node's title and its visible children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuView {
    pub title: String,
    pub items: Vec<MenuItemView>,
    /// Index into `items`.
    pub highlighted: Option<usize>,
}

impl MenuView {
    pub fn highlighted_label(&self) -> Option<&str> {
        self.highlighted.map(|i| self.items[i].label.as_str())
    }
}
