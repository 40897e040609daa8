use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::warn;

/// Index into the page's element arena. Ids are never reused; elements are
/// created once and stay alive for the page's lifetime.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Node-scoped event classes the simulated page can dispatch.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EventType {
    FocusIn,
    Submit,
    Invalid,
}

/// Listener registered on the document or on a node. Callbacks receive the
/// page handle and the event target, and run with no tree lock held so they
/// may query or mutate the page freely.
pub type NodeListener = Arc<dyn Fn(&Page, NodeId) + Send + Sync>;

/// Observer of structural mutations; receives the roots of subtrees appended
/// under the body.
pub type MutationListener = Arc<dyn Fn(&Page, &[NodeId]) + Send + Sync>;

struct NodeData {
    tag: String,
    attrs: HashMap<String, String>,
    text: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

struct PageInner {
    tree: RwLock<Vec<NodeData>>,
    viewport: Mutex<(u32, u32)>,
    click_listeners: RwLock<Vec<NodeListener>>,
    node_listeners: RwLock<HashMap<(NodeId, EventType), Vec<NodeListener>>>,
    mutation_listeners: RwLock<Vec<MutationListener>>,
}

/// Simulated page: an element tree with form semantics and event dispatch.
/// Cheap to clone; all clones share the same document.
#[derive(Clone)]
pub struct Page {
    inner: Arc<PageInner>,
}

const ROOT: NodeId = NodeId(0);
const BODY: NodeId = NodeId(1);

impl Page {
    pub fn new() -> Self {
        let root = NodeData {
            tag: "html".into(),
            attrs: HashMap::new(),
            text: String::new(),
            children: vec![BODY],
            parent: None,
        };
        let body = NodeData {
            tag: "body".into(),
            attrs: HashMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent: Some(ROOT),
        };
        Self {
            inner: Arc::new(PageInner {
                tree: RwLock::new(vec![root, body]),
                viewport: Mutex::new((1280, 720)),
                click_listeners: RwLock::new(Vec::new()),
                node_listeners: RwLock::new(HashMap::new()),
                mutation_listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// The page root carrying document-level attributes such as `data-theme`.
    pub fn document_element(&self) -> NodeId {
        ROOT
    }

    pub fn body(&self) -> NodeId {
        BODY
    }

    pub fn viewport(&self) -> (u32, u32) {
        *self.inner.viewport.lock()
    }

    pub fn set_viewport(&self, width: u32, height: u32) {
        *self.inner.viewport.lock() = (width, height);
    }

    /// Creates a detached element; attach it with `append_child`.
    pub fn create_element(&self, tag: &str) -> NodeId {
        let mut tree = self.inner.tree.write();
        let id = NodeId(tree.len());
        tree.push(NodeData {
            tag: tag.to_ascii_lowercase(),
            attrs: HashMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent: None,
        });
        id
    }

    /// Creates an element and attaches it to `parent` in one step.
    pub fn append_element(&self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.create_element(tag);
        self.append_child(parent, id);
        id
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        {
            let mut tree = self.inner.tree.write();
            if parent.0 >= tree.len() || child.0 >= tree.len() {
                warn!(?parent, ?child, "append_child on unknown node; ignored");
                return;
            }
            if tree[child.0].parent.is_some() {
                warn!(?child, "append_child on already attached node; ignored");
                return;
            }
            tree[child.0].parent = Some(parent);
            tree[parent.0].children.push(child);
        }
        if self.is_attached(child) {
            self.notify_mutation(&[child]);
        }
    }

    pub fn tag(&self, node: NodeId) -> String {
        self.inner
            .tree
            .read()
            .get(node.0)
            .map(|n| n.tag.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.tree.read().get(node.0).and_then(|n| n.parent)
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.inner
            .tree
            .read()
            .get(node.0)
            .and_then(|n| n.attrs.get(name).cloned())
    }

    pub fn set_attr(&self, node: NodeId, name: &str, value: &str) {
        let mut tree = self.inner.tree.write();
        match tree.get_mut(node.0) {
            Some(data) => {
                data.attrs.insert(name.to_string(), value.to_string());
            }
            None => warn!(?node, name, "set_attr on unknown node; ignored"),
        }
    }

    pub fn remove_attr(&self, node: NodeId, name: &str) {
        if let Some(data) = self.inner.tree.write().get_mut(node.0) {
            data.attrs.remove(name);
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attr(node, "class")
            .map(|c| c.split_whitespace().any(|token| token == class))
            .unwrap_or(false)
    }

    /// True if the node's class attribute contains `fragment` anywhere, the
    /// `[class*=..]` selector semantics variant detection relies on.
    pub fn class_contains(&self, node: NodeId, fragment: &str) -> bool {
        self.attr(node, "class")
            .map(|c| c.contains(fragment))
            .unwrap_or(false)
    }

    pub fn set_text(&self, node: NodeId, text: &str) {
        if let Some(data) = self.inner.tree.write().get_mut(node.0) {
            data.text = text.to_string();
        }
    }

    /// Concatenated text of the node and its subtree, document order.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        let tree = self.inner.tree.read();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(data) = tree.get(id.0) {
                if !data.text.is_empty() {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(&data.text);
                }
                for child in data.children.iter().rev() {
                    stack.push(*child);
                }
            }
        }
        out
    }

    /// Walks from `node` up through its ancestors, returning the first node
    /// the predicate accepts (the `closest()` traversal).
    pub fn closest<F>(&self, node: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&Page, NodeId) -> bool,
    {
        let chain = {
            let tree = self.inner.tree.read();
            let mut chain = Vec::new();
            let mut cursor = Some(node);
            while let Some(id) = cursor {
                chain.push(id);
                cursor = tree.get(id.0).and_then(|n| n.parent);
            }
            chain
        };
        chain.into_iter().find(|id| pred(self, *id))
    }

    fn is_attached(&self, node: NodeId) -> bool {
        let tree = self.inner.tree.read();
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ROOT {
                return true;
            }
            cursor = tree.get(id.0).and_then(|n| n.parent);
        }
        false
    }

    /// All attached elements in creation order.
    pub fn elements(&self) -> Vec<NodeId> {
        let len = self.inner.tree.read().len();
        (0..len)
            .map(NodeId)
            .filter(|id| self.is_attached(*id))
            .collect()
    }

    pub fn any_element<F>(&self, pred: F) -> bool
    where
        F: Fn(&Page, NodeId) -> bool,
    {
        self.elements().into_iter().any(|id| pred(self, id))
    }

    pub fn forms(&self) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|id| self.tag(*id) == "form")
            .collect()
    }

    /// Forms inside `root`, including `root` itself. Used when newly appended
    /// subtrees may carry forms at any depth.
    pub fn forms_within(&self, root: NodeId) -> Vec<NodeId> {
        let tree = self.inner.tree.read();
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(data) = tree.get(id.0) {
                if data.tag == "form" {
                    out.push(id);
                }
                for child in data.children.iter().rev() {
                    stack.push(*child);
                }
            }
        }
        out
    }

    /// Form controls inside `form`, document order.
    pub fn fields_of(&self, form: NodeId) -> Vec<NodeId> {
        let tree = self.inner.tree.read();
        let mut out = Vec::new();
        let mut stack = vec![form];
        while let Some(id) = stack.pop() {
            if let Some(data) = tree.get(id.0) {
                if id != form && matches!(data.tag.as_str(), "input" | "textarea" | "select") {
                    out.push(id);
                }
                for child in data.children.iter().rev() {
                    stack.push(*child);
                }
            }
        }
        out
    }

    pub fn value(&self, field: NodeId) -> String {
        self.attr(field, "value").unwrap_or_default()
    }

    pub fn set_value(&self, field: NodeId, value: &str) {
        self.set_attr(field, "value", value);
    }

    fn field_is_invalid(&self, field: NodeId) -> bool {
        let value = self.value(field);
        if self.attr(field, "required").is_some() && value.trim().is_empty() {
            return true;
        }
        if let Some(pattern) = self.attr(field, "pattern") {
            if !value.contains(&pattern) {
                return true;
            }
        }
        false
    }

    pub fn invalid_fields(&self, form: NodeId) -> Vec<NodeId> {
        self.fields_of(form)
            .into_iter()
            .filter(|field| self.field_is_invalid(*field))
            .collect()
    }

    /// Native client-side validity of the whole form.
    pub fn check_validity(&self, form: NodeId) -> bool {
        self.invalid_fields(form).is_empty()
    }

    /// Registers a document-level click listener (delegated, capture order =
    /// registration order).
    pub fn add_click_listener(&self, listener: NodeListener) {
        self.inner.click_listeners.write().push(listener);
    }

    pub fn add_node_listener(&self, node: NodeId, event: EventType, listener: NodeListener) {
        self.inner
            .node_listeners
            .write()
            .entry((node, event))
            .or_default()
            .push(listener);
    }

    pub fn observe_mutations(&self, listener: MutationListener) {
        self.inner.mutation_listeners.write().push(listener);
    }

    /// Dispatches a click on `target` to every document-level listener.
    pub fn click(&self, target: NodeId) {
        let snapshot: Vec<NodeListener> =
            self.inner.click_listeners.read().iter().cloned().collect();
        for listener in snapshot {
            listener(self, target);
        }
    }

    /// Moves focus to a form control; the enclosing form's focusin listeners
    /// see the control as the event target.
    pub fn focus(&self, field: NodeId) {
        if let Some(form) = self.closest(field, |p, id| p.tag(id) == "form") {
            self.dispatch_to(form, EventType::FocusIn, field);
        }
    }

    /// Submits a form the way a submit button would: without `novalidate`,
    /// invalid fields fire `invalid` events and the submit never happens.
    /// Returns whether the submit event fired.
    pub fn submit(&self, form: NodeId) -> bool {
        if self.attr(form, "novalidate").is_none() {
            let invalid = self.invalid_fields(form);
            if !invalid.is_empty() {
                for field in invalid {
                    self.dispatch_to(form, EventType::Invalid, field);
                }
                return false;
            }
        }
        self.dispatch_to(form, EventType::Submit, form);
        true
    }

    fn dispatch_to(&self, node: NodeId, event: EventType, target: NodeId) {
        let snapshot: Vec<NodeListener> = self
            .inner
            .node_listeners
            .read()
            .get(&(node, event))
            .map(|listeners| listeners.to_vec())
            .unwrap_or_default();
        for listener in snapshot {
            listener(self, target);
        }
    }

    fn notify_mutation(&self, added: &[NodeId]) {
        let snapshot: Vec<MutationListener> = self
            .inner
            .mutation_listeners
            .read()
            .iter()
            .cloned()
            .collect();
        for listener in snapshot {
            listener(self, added);
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}
