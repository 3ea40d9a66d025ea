use std::collections::HashMap;

use crate::cursor::Cursor;

/// Index of a node inside its [`MenuTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// What selecting the highlighted data item does.
#[derive(Debug, Clone)]
pub enum DataHandler<A> {
    /// One action for every item; it reads the selected item itself.
    Callback(A),
    /// A separate action per item label.
    Dispatch(HashMap<String, A>),
    /// Items are informational only.
    StaticList,
}

/// Lazily populated list of selectable items attached to a node.
#[derive(Debug, Clone)]
pub struct MenuData<A> {
    prompt: String,
    items: Vec<String>,
    position: Cursor,
    handler: DataHandler<A>,
}

impl<A> MenuData<A> {
    fn new(name: &str) -> Self {
        Self {
            prompt: format!("{name}:"),
            items: Vec::new(),
            position: Cursor::default(),
            handler: DataHandler::StaticList,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Replace the items. The previous position is kept when it still fits.
    pub fn set_items(&mut self, items: Vec<String>) {
        self.position.set_len(items.len());
        self.items = items;
    }

    pub fn clear(&mut self) {
        self.set_items(Vec::new());
    }

    pub fn position(&self) -> Option<usize> {
        self.position.position()
    }

    pub fn set_position(&mut self, pos: usize) {
        self.position.set(pos);
    }

    pub fn selected(&self) -> Option<&str> {
        self.position().map(|p| self.items[p].as_str())
    }

    pub fn handler(&self) -> &DataHandler<A> {
        &self.handler
    }

    pub fn set_handler(&mut self, handler: DataHandler<A>) {
        self.handler = handler;
    }
}

pub struct MenuNode<A> {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    child_cursor: Cursor,
    action: Option<A>,
    loader: Option<A>,
    data: MenuData<A>,
}

impl<A> MenuNode<A> {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            child_cursor: Cursor::default(),
            action: None,
            loader: None,
            data: MenuData::new(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn current_child_index(&self) -> Option<usize> {
        self.child_cursor.position()
    }

    pub fn current_child(&self) -> Option<NodeId> {
        self.current_child_index().map(|i| self.children[i])
    }

    pub fn action(&self) -> Option<&A> {
        self.action.as_ref()
    }

    pub fn set_action(&mut self, action: A) {
        self.action = Some(action);
    }

    pub fn loader(&self) -> Option<&A> {
        self.loader.as_ref()
    }

    pub fn set_loader(&mut self, loader: A) {
        self.loader = Some(loader);
    }

    pub fn data(&self) -> &MenuData<A> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut MenuData<A> {
        &mut self.data
    }
}

/// The actionable shape of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Branch,
    List,
    Action,
    Loader,
    /// No children, no items and no action: a configuration error.
    Empty,
}

/// An N-ary menu tree with a single focused node.
///
/// Nodes live in an arena owned by the tree; parents are referenced by
/// index, so the back-link never owns its target. Nodes are never removed.
pub struct MenuTree<A> {
    nodes: Vec<MenuNode<A>>,
    current: NodeId,
}

impl<A> MenuTree<A> {
    pub fn new(root_name: &str) -> Self {
        Self {
            nodes: vec![MenuNode::new(root_name, None)],
            current: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn current(&self) -> NodeId {
        self.current
    }

    pub fn is_at_root(&self) -> bool {
        self.current == self.root()
    }

    pub fn node(&self, id: NodeId) -> &MenuNode<A> {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut MenuNode<A> {
        &mut self.nodes[id.0]
    }

    pub fn current_node(&self) -> &MenuNode<A> {
        self.node(self.current)
    }

    pub fn current_node_mut(&mut self) -> &mut MenuNode<A> {
        let id = self.current;
        self.node_mut(id)
    }

    /// Append a child to `parent`. The first child becomes the highlighted one.
    pub fn add_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(MenuNode::new(name, Some(parent)));
        let p = &mut self.nodes[parent.0];
        p.children.push(id);
        p.child_cursor.set_len(p.children.len());
        id
    }

    pub fn shape(&self, id: NodeId) -> Shape {
        let node = self.node(id);
        if !node.children.is_empty() {
            Shape::Branch
        } else if !node.data.items.is_empty() {
            Shape::List
        } else if node.loader.is_some() {
            Shape::Loader
        } else if node.action.is_some() {
            Shape::Action
        } else {
            Shape::Empty
        }
    }

    /// Focus the `index`-th child of the current node.
    pub fn descend_to_child(&mut self, index: usize) -> Option<NodeId> {
        let child = *self.current_node().children.get(index)?;
        self.current_node_mut().child_cursor.set(index);
        self.current = child;
        Some(child)
    }

    /// Focus the highlighted child of the current node.
    pub fn descend(&mut self) -> Option<NodeId> {
        let index = self.current_node().current_child_index()?;
        self.descend_to_child(index)
    }

    pub fn ascend_to_parent(&mut self) -> Option<NodeId> {
        let parent = self.current_node().parent?;
        self.current = parent;
        Some(parent)
    }

    pub fn jump_to(&mut self, id: NodeId) {
        debug_assert!(id.0 < self.nodes.len());
        self.current = id;
    }

    /// Move the current node's child highlight, or its list position when it
    /// has no children, one step forward. Returns true if anything moved.
    pub fn next_sibling_or_list_item(&mut self) -> bool {
        let node = self.current_node_mut();
        if node.children.is_empty() {
            node.data.position.forward()
        } else {
            node.child_cursor.forward()
        }
    }

    /// Counterpart of [`next_sibling_or_list_item`](Self::next_sibling_or_list_item).
    pub fn prev_sibling_or_list_item(&mut self) -> bool {
        let node = self.current_node_mut();
        if node.children.is_empty() {
            node.data.position.back()
        } else {
            node.child_cursor.back()
        }
    }

    /// First node (breadth-first from the root) with the given name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        let mut queue = std::collections::VecDeque::from([self.root()]);
        while let Some(id) = queue.pop_front() {
            let node = self.node(id);
            if node.name == name {
                return Some(id);
            }
            queue.extend(node.children.iter().copied());
        }
        None
    }

    /// Whether `id` is `ancestor` or lies below it.
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            if c == ancestor {
                return true;
            }
            cursor = self.node(c).parent;
        }
        false
    }
}
