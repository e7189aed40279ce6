//! Layout tree returned by `GET_TREE`
//!
//! The wire format nests children inline and carries neither parent pointers
//! nor resolved focus pointers. The decoded nodes are stored in an arena owned
//! by [`Tree`]; children lists and parent back-references are [`NodeIndex`]
//! values into that arena. Back-references and focus order are filled in by
//! two passes over the fully decoded tree:
//!
//! 1. [`Tree::assign_parents`] walks `nodes` then `floating_nodes` and points
//!    every child at the node containing it.
//! 2. [`Tree::resolve_focus_order`] maps each node's `focus` id list onto its
//!    ordinary children. An id without a matching child leaves its slot empty.

use serde_json::Value;
use tracing::trace;

use crate::reply::lenient::{json_kind, FieldMismatch, Fields};
use crate::types::{Border, Layout, NodeType, Orientation, Rect, WindowProperties};

/// Position of a node in its [`Tree`]'s arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Arena slot of this node
    pub fn index(self) -> usize {
        self.0
    }
}

/// One container, workspace, output or window in the layout tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    /// Container id, unique for the life of the container
    pub id: i64,
    pub name: Option<String>,
    pub node_type: NodeType,
    pub border: Border,
    pub current_border_width: i32,
    pub layout: Layout,
    pub orientation: Orientation,
    /// Fraction of the parent's size, `None` for non-tiled nodes
    pub percent: Option<f64>,
    /// Absolute geometry including decorations
    pub rect: Rect,
    /// Client window geometry relative to `rect`
    pub window_rect: Rect,
    /// Title bar geometry relative to the parent
    pub deco_rect: Rect,
    /// Geometry the client originally requested
    pub geometry: Rect,
    /// X11 window id, set only for nodes wrapping a window
    pub window: Option<i64>,
    pub window_type: Option<String>,
    pub window_properties: Option<WindowProperties>,
    pub urgent: bool,
    pub focused: bool,
    pub sticky: bool,
    /// Floating state, e.g. "auto_off" or "user_on"
    pub floating: Option<String>,
    /// 0 = none, 1 = output, 2 = global
    pub fullscreen_mode: i32,
    pub scratchpad_state: Option<String>,
    pub last_split_layout: Option<String>,
    pub workspace_layout: Option<String>,
    pub marks: Vec<String>,
    /// Workspace number (workspace nodes only)
    pub num: Option<i64>,
    /// Output name (sway reports this on workspace nodes)
    pub output: Option<String>,
    /// Ordinary (tiled) children
    pub nodes: Vec<NodeIndex>,
    /// Floating children
    pub floating_nodes: Vec<NodeIndex>,
    /// Child ids, most recently focused first, as sent by the peer
    pub focus: Vec<i64>,
    /// `focus` resolved against `nodes`; one slot per ordinary child
    pub focus_order: Vec<Option<NodeIndex>>,
    /// Containing node, `None` for the root
    pub parent: Option<NodeIndex>,
}

impl Node {
    /// Whether this node wraps an application window
    pub fn is_window(&self) -> bool {
        self.window.is_some()
    }
}

/// Decoded layout tree with parent and focus-order relationships resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeIndex,
}

impl Tree {
    /// Decode a `GET_TREE` root object
    ///
    /// The returned tree has no parents or focus order yet; see
    /// [`Tree::reconstruct`]. Field type mismatches are appended to
    /// `mismatches`.
    pub(crate) fn decode(value: &Value, mismatches: &mut Vec<FieldMismatch>) -> Self {
        let mut nodes = Vec::new();
        let root = decode_node(value, "", &mut nodes, mismatches);
        Self { nodes, root }
    }

    /// Run both reconstruction passes from the root
    pub fn reconstruct(&mut self) {
        self.assign_parents();
        self.resolve_focus_order();
    }

    /// Point every node's `parent` at the node whose `nodes` or
    /// `floating_nodes` contains it
    ///
    /// Overwrites existing back-references, so running it again yields the
    /// same result.
    pub fn assign_parents(&mut self) {
        self.set_parent(self.root, None);
    }

    fn set_parent(&mut self, index: NodeIndex, parent: Option<NodeIndex>) {
        self.nodes[index.0].parent = parent;

        for i in 0..self.nodes[index.0].nodes.len() {
            let child = self.nodes[index.0].nodes[i];
            self.set_parent(child, Some(index));
        }
        for i in 0..self.nodes[index.0].floating_nodes.len() {
            let child = self.nodes[index.0].floating_nodes[i];
            self.set_parent(child, Some(index));
        }
    }

    /// Resolve every node's `focus` id list into `focus_order`
    ///
    /// `focus_order` gets one slot per ordinary child; slot `i` holds the child
    /// whose id is `focus[i]`. Ids with no matching ordinary child (floating
    /// children, stale ids) leave their slot empty, and ids past the last slot
    /// are dropped.
    ///
    /// i3 lists floating children in `focus` too, so a floating id near the
    /// front pushes ordinary children toward the end: with ordinary children
    /// 4 and 5, floating child 6 and `focus` `[6, 5, 4]`, the slots are
    /// `[None, Some(5)]` and child 4 is not in `focus_order` at all.
    pub fn resolve_focus_order(&mut self) {
        self.set_focus_order(self.root);
    }

    fn set_focus_order(&mut self, index: NodeIndex) {
        let order = {
            let node = &self.nodes[index.0];
            let mut order = vec![None; node.nodes.len()];
            for (slot, focus_id) in node.focus.iter().enumerate() {
                let hit = node
                    .nodes
                    .iter()
                    .copied()
                    .find(|child| self.nodes[child.0].id == *focus_id);
                match (order.get_mut(slot), hit) {
                    (Some(entry), Some(child)) => *entry = Some(child),
                    (Some(_), None) => {
                        trace!(node = node.id, focus_id, "Focus id has no matching child")
                    }
                    (None, _) => trace!(node = node.id, focus_id, "Focus id beyond child count"),
                }
            }
            order
        };
        self.nodes[index.0].focus_order = order;

        for i in 0..self.nodes[index.0].nodes.len() {
            let child = self.nodes[index.0].nodes[i];
            self.set_focus_order(child);
        }
        for i in 0..self.nodes[index.0].floating_nodes.len() {
            let child = self.nodes[index.0].floating_nodes[i];
            self.set_focus_order(child);
        }
    }

    /// Index of the root node
    pub fn root_index(&self) -> NodeIndex {
        self.root
    }

    /// The root node
    pub fn root(&self) -> &Node {
        &self.nodes[self.root.0]
    }

    /// Node at `index`
    ///
    /// Returns `None` for an index from a different tree that is out of range.
    pub fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index.0)
    }

    /// Number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parent of the node at `index`
    pub fn parent(&self, index: NodeIndex) -> Option<&Node> {
        self.node(index)?.parent.and_then(|p| self.node(p))
    }

    /// Ordinary children of the node at `index`
    pub fn children(&self, index: NodeIndex) -> impl Iterator<Item = &Node> + '_ {
        self.resolve(self.node(index).map(|n| n.nodes.as_slice()).unwrap_or(&[]))
    }

    /// Floating children of the node at `index`
    pub fn floating_children(&self, index: NodeIndex) -> impl Iterator<Item = &Node> + '_ {
        self.resolve(
            self.node(index)
                .map(|n| n.floating_nodes.as_slice())
                .unwrap_or(&[]),
        )
    }

    /// Filled focus-order slots of the node at `index`, most recent first
    pub fn focus_order(&self, index: NodeIndex) -> impl Iterator<Item = &Node> + '_ {
        self.node(index)
            .map(|n| n.focus_order.as_slice())
            .unwrap_or(&[])
            .iter()
            .flatten()
            .filter_map(|i| self.node(*i))
    }

    /// Ancestors of the node at `index`, nearest first
    pub fn ancestors(&self, index: NodeIndex) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.node(index).and_then(|n| n.parent),
        }
    }

    /// All nodes with their indices, parents before children
    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &Node)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeIndex(i), n))
    }

    /// Find a node by container id
    pub fn find_by_id(&self, id: i64) -> Option<NodeIndex> {
        self.iter().find(|(_, n)| n.id == id).map(|(i, _)| i)
    }

    /// Find the node wrapping X11 window `window`
    pub fn find_by_window(&self, window: i64) -> Option<NodeIndex> {
        self.iter()
            .find(|(_, n)| n.window == Some(window))
            .map(|(i, _)| i)
    }

    /// The node holding the input focus
    pub fn focused(&self) -> Option<NodeIndex> {
        self.iter().find(|(_, n)| n.focused).map(|(i, _)| i)
    }

    /// All workspace nodes, in tree order
    pub fn workspaces(&self) -> impl Iterator<Item = (NodeIndex, &Node)> + '_ {
        self.iter()
            .filter(|(_, n)| n.node_type == NodeType::Workspace)
    }

    fn resolve<'a>(&'a self, indices: &'a [NodeIndex]) -> impl Iterator<Item = &'a Node> + 'a {
        indices.iter().filter_map(|i| self.node(*i))
    }
}

/// Iterator over a node's ancestors, see [`Tree::ancestors`]
pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeIndex>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = (NodeIndex, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next?;
        let node = self.tree.node(index)?;
        self.next = node.parent;
        Some((index, node))
    }
}

/// Decode one node and, depth first, all of its descendants into `arena`
///
/// The node's own slot is reserved before its children are decoded so that the
/// arena stays in pre-order.
fn decode_node(
    value: &Value,
    path: &str,
    arena: &mut Vec<Node>,
    mismatches: &mut Vec<FieldMismatch>,
) -> NodeIndex {
    let index = NodeIndex(arena.len());
    arena.push(Node::default());

    let Some(object) = value.as_object() else {
        mismatches.push(FieldMismatch {
            path: path.to_string(),
            message: format!("expected object, found {}", json_kind(value)),
        });
        return index;
    };

    let mut fields = Fields::new(object, path, mismatches);
    let mut node = Node {
        id: fields.get("id"),
        name: fields.optional("name"),
        node_type: fields.get("type"),
        border: fields.get("border"),
        current_border_width: fields.get("current_border_width"),
        layout: fields.get("layout"),
        orientation: fields.get("orientation"),
        percent: fields.optional("percent"),
        rect: fields.nested("rect"),
        window_rect: fields.nested("window_rect"),
        deco_rect: fields.nested("deco_rect"),
        geometry: fields.nested("geometry"),
        window: fields.optional("window"),
        window_type: fields.optional("window_type"),
        window_properties: fields
            .raw("window_properties")
            .map(|_| fields.nested("window_properties")),
        urgent: fields.get("urgent"),
        focused: fields.get("focused"),
        sticky: fields.get("sticky"),
        floating: fields.optional("floating"),
        fullscreen_mode: fields.get("fullscreen_mode"),
        scratchpad_state: fields.optional("scratchpad_state"),
        last_split_layout: fields.optional("last_split_layout"),
        workspace_layout: fields.optional("workspace_layout"),
        marks: fields.get("marks"),
        num: fields.optional("num"),
        output: fields.optional("output"),
        focus: fields.get("focus"),
        ..Node::default()
    };

    node.nodes = decode_children(&mut fields, "nodes", arena);
    node.floating_nodes = decode_children(&mut fields, "floating_nodes", arena);

    arena[index.0] = node;
    index
}

fn decode_children(fields: &mut Fields<'_>, key: &str, arena: &mut Vec<Node>) -> Vec<NodeIndex> {
    let Some(value) = fields.raw(key) else {
        return Vec::new();
    };
    let Some(items) = value.as_array() else {
        fields.record(key, format!("expected array, found {}", json_kind(value)));
        return Vec::new();
    };

    let base = fields.path_of(key);
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let child_path = format!("{}[{}]", base, i);
            decode_node(item, &child_path, arena, fields.mismatches())
        })
        .collect()
}
