//! In-memory [`Page`] for driving the runtime headlessly.
//!
//! Supports the selector subset the bookmarklets use: tag, `#id`, `.class`,
//! `[attr]`, `[attr="v"]`, `[attr*="v"]`, `[attr^="v"]`, the descendant
//! combinator and comma-separated lists.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use crate::domain::errors::AutomationError;
use crate::runtime::{ClickModifiers, Page, ScrollMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Description of an element to insert.
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    text: String,
}

impl NodeSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

/// Callback run after a click lands on a node.
pub type ClickHook = Arc<dyn Fn(&MemoryPage, NodeId, ClickModifiers) + Send + Sync>;

#[derive(Debug)]
struct Node {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Default)]
struct State {
    nodes: Vec<Node>,
    hooks: HashMap<NodeId, Vec<ClickHook>>,
    clicks: Vec<(NodeId, ClickModifiers)>,
    alerts: Vec<String>,
    confirms: VecDeque<bool>,
    prompts: VecDeque<Option<String>>,
    clipboard: Option<String>,
    scroll: ScrollMetrics,
}

impl State {
    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn descendants(&self, from: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.node(from).children {
            out.push(child);
            self.descendants(child, out);
        }
    }

    fn attached(&self, mut id: NodeId) -> bool {
        loop {
            match self.node(id).parent {
                Some(parent) => id = parent,
                None => return id == MemoryPage::ROOT,
            }
        }
    }

    fn text_of(&self, id: NodeId) -> String {
        let mut text = self.node(id).text.clone();
        for &child in &self.node(id).children {
            text.push_str(&self.text_of(child));
        }
        text
    }
}

/// A flat node arena rooted at `<body>`.
pub struct MemoryPage {
    state: Mutex<State>,
    mutations: watch::Sender<u64>,
}

impl MemoryPage {
    pub const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        let body = Node {
            tag: "body".into(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
        };
        let (mutations, _) = watch::channel(0);
        Self {
            state: Mutex::new(State {
                nodes: vec![body],
                ..State::default()
            }),
            mutations,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn touch(&self) {
        self.mutations.send_modify(|generation| *generation += 1);
    }

    /// Insert `spec` as the last child of `parent`.
    pub fn append(&self, parent: NodeId, spec: NodeSpec) -> NodeId {
        let id = {
            let mut state = self.lock();
            let id = NodeId(state.nodes.len());
            state.nodes.push(Node {
                tag: spec.tag,
                classes: spec.classes,
                attributes: spec.attributes,
                text: spec.text,
                parent: Some(parent),
                children: Vec::new(),
            });
            state.nodes[parent.0].children.push(id);
            id
        };
        self.touch();
        id
    }

    /// Detach `node` and its subtree from the document.
    pub fn remove(&self, node: NodeId) {
        {
            let mut state = self.lock();
            let Some(parent) = state.nodes[node.0].parent.take() else {
                return;
            };
            state.nodes[parent.0].children.retain(|&child| child != node);
        }
        self.touch();
    }

    pub fn set_text(&self, node: NodeId, text: impl Into<String>) {
        self.lock().nodes[node.0].text = text.into();
        self.touch();
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: Option<&str>) {
        {
            let mut state = self.lock();
            let attributes = &mut state.nodes[node.0].attributes;
            match value {
                Some(value) => attributes.insert(name.to_owned(), value.to_owned()),
                None => attributes.remove(name),
            };
        }
        self.touch();
    }

    pub fn set_scroll(&self, scroll: ScrollMetrics) {
        self.lock().scroll = scroll;
    }

    pub fn set_clipboard(&self, text: Option<&str>) {
        self.lock().clipboard = text.map(str::to_owned);
    }

    /// Queue the answer for the next `confirm`. Unscripted dialogs are dismissed.
    pub fn push_confirm(&self, answer: bool) {
        self.lock().confirms.push_back(answer);
    }

    /// Queue the answer for the next `prompt`. Unscripted prompts are cancelled.
    pub fn push_prompt(&self, answer: Option<&str>) {
        self.lock().prompts.push_back(answer.map(str::to_owned));
    }

    pub fn on_click<F>(&self, node: NodeId, hook: F)
    where
        F: Fn(&MemoryPage, NodeId, ClickModifiers) + Send + Sync + 'static,
    {
        self.lock().hooks.entry(node).or_default().push(Arc::new(hook));
    }

    pub fn alerts(&self) -> Vec<String> {
        self.lock().alerts.clone()
    }

    pub fn clicks(&self) -> Vec<(NodeId, ClickModifiers)> {
        self.lock().clicks.clone()
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        self.lock().attached(node)
    }
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl Page for MemoryPage {
    type Element = NodeId;

    fn query_selector_all(&self, selector: &str) -> Vec<NodeId> {
        let Some(groups) = parse_selector(selector) else {
            tracing::warn!(selector, "unsupported selector");
            return Vec::new();
        };
        let state = self.lock();
        let mut order = Vec::new();
        state.descendants(MemoryPage::ROOT, &mut order);
        order
            .into_iter()
            .filter(|&id| groups.iter().any(|chain| matches_chain(&state, id, chain)))
            .collect()
    }

    fn closest(&self, element: &NodeId, selector: &str) -> Option<NodeId> {
        let groups = parse_selector(selector)?;
        let state = self.lock();
        let mut current = Some(*element);
        while let Some(id) = current {
            if id != MemoryPage::ROOT && groups.iter().any(|chain| matches_chain(&state, id, chain)) {
                return Some(id);
            }
            current = state.node(id).parent;
        }
        None
    }

    fn text_content(&self, element: &NodeId) -> String {
        self.lock().text_of(*element)
    }

    fn attribute(&self, element: &NodeId, name: &str) -> Option<String> {
        self.lock().node(*element).attributes.get(name).cloned()
    }

    fn has_class(&self, element: &NodeId, class: &str) -> bool {
        self.lock().node(*element).classes.iter().any(|c| c == class)
    }

    fn set_class(&self, element: &NodeId, class: &str, enabled: bool) {
        {
            let mut state = self.lock();
            let classes = &mut state.nodes[element.0].classes;
            let present = classes.iter().any(|c| c == class);
            if enabled && !present {
                classes.push(class.to_owned());
            } else if !enabled && present {
                classes.retain(|c| c != class);
            } else {
                return;
            }
        }
        self.touch();
    }

    fn click(&self, element: &NodeId, modifiers: ClickModifiers) {
        let (hooks, toggled) = {
            let mut state = self.lock();
            state.clicks.push((*element, modifiers));
            let node = &mut state.nodes[element.0];
            let checkbox = node.tag == "input"
                && node.attributes.get("type").map(String::as_str) == Some("checkbox");
            if checkbox {
                if node.attributes.remove("checked").is_none() {
                    node.attributes.insert("checked".into(), String::new());
                }
            }
            (state.hooks.get(element).cloned().unwrap_or_default(), checkbox)
        };
        if toggled {
            self.touch();
        }
        for hook in hooks {
            hook(self, *element, modifiers);
        }
    }

    fn set_value(&self, element: &NodeId, value: &str) {
        self.set_attribute(*element, "value", Some(value));
    }

    fn mutations(&self) -> watch::Receiver<u64> {
        self.mutations.subscribe()
    }

    fn alert(&self, message: &str) {
        self.lock().alerts.push(message.to_owned());
    }

    fn confirm(&self, _message: &str) -> bool {
        self.lock().confirms.pop_front().unwrap_or(false)
    }

    fn prompt(&self, _message: &str, _default: &str) -> Option<String> {
        self.lock().prompts.pop_front().flatten()
    }

    fn read_clipboard(&self) -> Result<String, AutomationError> {
        self.lock()
            .clipboard
            .clone()
            .ok_or_else(|| AutomationError::Unexpected("clipboard is empty or unreadable".into()))
    }

    fn body_text(&self) -> String {
        let state = self.lock();
        let mut order = Vec::new();
        state.descendants(MemoryPage::ROOT, &mut order);
        order
            .into_iter()
            .map(|id| state.node(id).text.as_str())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn scroll_metrics(&self) -> ScrollMetrics {
        self.lock().scroll
    }
}

#[derive(Debug, Clone, PartialEq)]
enum AttrTest {
    Exists,
    Equals(String),
    Contains(String),
    Prefix(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, AttrTest)>,
}

impl Compound {
    fn matches(&self, node: &Node) -> bool {
        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(&node.tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.attributes.get("id") != Some(id) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| node.classes.contains(class)) {
            return false;
        }
        self.attributes.iter().all(|(name, test)| {
            let Some(value) = node.attributes.get(name) else {
                return false;
            };
            match test {
                AttrTest::Exists => true,
                AttrTest::Equals(expected) => value == expected,
                AttrTest::Contains(needle) => !needle.is_empty() && value.contains(needle.as_str()),
                AttrTest::Prefix(prefix) => !prefix.is_empty() && value.starts_with(prefix.as_str()),
            }
        })
    }
}

/// Descendant chain, rightmost compound last.
type Chain = Vec<Compound>;

fn matches_chain(state: &State, id: NodeId, chain: &[Compound]) -> bool {
    let Some((last, ancestors)) = chain.split_last() else {
        return false;
    };
    if !last.matches(state.node(id)) {
        return false;
    }
    let mut cursor = state.node(id).parent;
    for compound in ancestors.iter().rev() {
        loop {
            let Some(ancestor) = cursor else {
                return false;
            };
            cursor = state.node(ancestor).parent;
            if compound.matches(state.node(ancestor)) {
                break;
            }
        }
    }
    true
}

fn parse_selector(selector: &str) -> Option<Vec<Chain>> {
    let mut parser = SelectorParser {
        chars: selector.chars().collect(),
        pos: 0,
    };
    let mut groups = Vec::new();
    loop {
        let chain = parser.chain()?;
        if chain.is_empty() {
            return None;
        }
        groups.push(chain);
        parser.skip_whitespace();
        match parser.peek() {
            Some(',') => parser.pos += 1,
            None => return Some(groups),
            Some(_) => return None,
        }
    }
}

struct SelectorParser {
    chars: Vec<char>,
    pos: usize,
}

impl SelectorParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn chain(&mut self) -> Option<Chain> {
        let mut chain = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None | Some(',') => return Some(chain),
                Some(_) => chain.push(self.compound()?),
            }
        }
    }

    fn compound(&mut self) -> Option<Compound> {
        let mut compound = Compound::default();
        let mut any = false;
        if self.peek() == Some('*') {
            self.pos += 1;
            any = true;
        } else if self.peek().is_some_and(is_name_char) {
            compound.tag = Some(self.name()?);
            any = true;
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.name()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.name()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attributes.push(self.attribute()?);
                }
                Some(c) if c.is_whitespace() || c == ',' => break,
                None => break,
                Some(_) => return None,
            }
            any = true;
        }
        any.then_some(compound)
    }

    fn name(&mut self) -> Option<String> {
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        (self.pos > start).then(|| self.chars[start..self.pos].iter().collect())
    }

    fn attribute(&mut self) -> Option<(String, AttrTest)> {
        self.skip_whitespace();
        let name = self.name()?;
        self.skip_whitespace();
        let test = match self.peek()? {
            ']' => {
                self.pos += 1;
                return Some((name, AttrTest::Exists));
            }
            '=' => {
                self.pos += 1;
                AttrTest::Equals(self.value()?)
            }
            op @ ('*' | '^') => {
                self.pos += 1;
                if self.peek()? != '=' {
                    return None;
                }
                self.pos += 1;
                let value = self.value()?;
                if op == '*' {
                    AttrTest::Contains(value)
                } else {
                    AttrTest::Prefix(value)
                }
            }
            _ => return None,
        };
        self.skip_whitespace();
        if self.peek()? != ']' {
            return None;
        }
        self.pos += 1;
        Some((name, test))
    }

    fn value(&mut self) -> Option<String> {
        self.skip_whitespace();
        match self.peek()? {
            quote @ ('"' | '\'') => {
                self.pos += 1;
                let start = self.pos;
                while self.peek()? != quote {
                    self.pos += 1;
                }
                let value = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                Some(value)
            }
            _ => self.name(),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}
