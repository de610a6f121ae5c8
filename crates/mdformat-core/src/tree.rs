//! Render tree
//!
//! Wraps a flat token stream into a navigable tree. Nodes live in an arena
//! owned by [`RenderTree`] and refer to each other by index, so parent and
//! sibling lookups never fight the borrow checker.

use indexmap::IndexMap;

use crate::context::RenderContext;
use crate::token::Token;
use crate::{RenderError, Result};

/// Index of a node in its [`RenderTree`]
pub type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Debug)]
enum NodeTokens {
    Root,
    Leaf(Token),
    Container {
        opening: Token,
        closing: Option<Token>,
    },
}

#[derive(Debug)]
struct NodeData {
    tokens: NodeTokens,
    parent: Option<NodeId>,
    /// Position in the parent's `children`
    index: usize,
    children: Vec<NodeId>,
}

/// An arena-allocated syntax tree built from a token stream
#[derive(Debug)]
pub struct RenderTree {
    nodes: Vec<NodeData>,
}

impl RenderTree {
    /// Build a tree by matching `nesting` open/close pairs.
    ///
    /// Fails on unbalanced nesting instead of guessing a structure.
    pub fn new(tokens: Vec<Token>) -> Result<Self> {
        let mut tree = Self {
            nodes: vec![NodeData {
                tokens: NodeTokens::Root,
                parent: None,
                index: 0,
                children: Vec::new(),
            }],
        };
        tree.attach(tokens, ROOT)?;
        Ok(tree)
    }

    /// The synthetic document root
    pub fn root(&self) -> RenderTreeNode<'_> {
        RenderTreeNode {
            tree: self,
            id: ROOT,
        }
    }

    /// Get a node handle by id
    pub fn node(&self, id: NodeId) -> Option<RenderTreeNode<'_>> {
        (id < self.nodes.len()).then_some(RenderTreeNode { tree: self, id })
    }

    /// Number of nodes, including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    fn push(&mut self, tokens: NodeTokens, parent: NodeId) -> NodeId {
        let id = self.nodes.len();
        let index = self.nodes[parent].children.len();
        self.nodes.push(NodeData {
            tokens,
            parent: Some(parent),
            index,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    fn attach(&mut self, tokens: Vec<Token>, parent: NodeId) -> Result<()> {
        // Containers still waiting for their closing token
        let mut open: Vec<NodeId> = Vec::new();

        for (index, mut token) in tokens.into_iter().enumerate() {
            let current_parent = open.last().copied().unwrap_or(parent);
            match token.nesting {
                1 => {
                    let id = self.push(
                        NodeTokens::Container {
                            opening: token,
                            closing: None,
                        },
                        current_parent,
                    );
                    open.push(id);
                }
                -1 => {
                    let Some(id) = open.pop() else {
                        return Err(RenderError::UnexpectedClose {
                            token_type: token.kind,
                            index,
                        });
                    };
                    if let NodeTokens::Container { opening, closing } = &mut self.nodes[id].tokens {
                        if container_name(&opening.kind) != container_name(&token.kind) {
                            return Err(RenderError::MismatchedClose {
                                opening: opening.kind.clone(),
                                closing: token.kind,
                                index,
                            });
                        }
                        *closing = Some(token);
                    }
                }
                _ => {
                    let children = std::mem::take(&mut token.children);
                    let id = self.push(NodeTokens::Leaf(token), current_parent);
                    if !children.is_empty() {
                        self.attach(children, id)?;
                    }
                }
            }
        }

        if let Some(id) = open.pop() {
            let token_type = match &self.nodes[id].tokens {
                NodeTokens::Container { opening, .. } => opening.kind.clone(),
                _ => String::new(),
            };
            return Err(RenderError::UnclosedToken { token_type });
        }
        Ok(())
    }
}

fn container_name(kind: &str) -> &str {
    kind.strip_suffix("_open")
        .or_else(|| kind.strip_suffix("_close"))
        .unwrap_or(kind)
}

/// A lightweight handle to one node of a [`RenderTree`]
#[derive(Debug, Clone, Copy)]
pub struct RenderTreeNode<'t> {
    tree: &'t RenderTree,
    id: NodeId,
}

impl PartialEq for RenderTreeNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for RenderTreeNode<'_> {}

impl<'t> RenderTreeNode<'t> {
    fn data(&self) -> &'t NodeData {
        &self.tree.nodes[self.id]
    }

    fn handle(&self, id: NodeId) -> RenderTreeNode<'t> {
        RenderTreeNode {
            tree: self.tree,
            id,
        }
    }

    /// Arena index of this node
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Syntax type: `root`, the token type, or the opening type without `_open`
    pub fn node_type(&self) -> &'t str {
        match &self.data().tokens {
            NodeTokens::Root => "root",
            NodeTokens::Leaf(token) => &token.kind,
            NodeTokens::Container { opening, .. } => container_name(&opening.kind),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self.data().tokens, NodeTokens::Root)
    }

    pub fn is_container(&self) -> bool {
        matches!(self.data().tokens, NodeTokens::Container { .. })
    }

    /// The token of a self-contained node
    pub fn token(&self) -> Option<&'t Token> {
        match &self.data().tokens {
            NodeTokens::Leaf(token) => Some(token),
            _ => None,
        }
    }

    /// The opening token of a container node
    pub fn opening(&self) -> Option<&'t Token> {
        match &self.data().tokens {
            NodeTokens::Container { opening, .. } => Some(opening),
            _ => None,
        }
    }

    /// The closing token of a container node
    pub fn closing(&self) -> Option<&'t Token> {
        match &self.data().tokens {
            NodeTokens::Container { closing, .. } => closing.as_ref(),
            _ => None,
        }
    }

    // Attributes are read from the token, or the opening token for containers
    fn source(&self) -> Option<&'t Token> {
        self.token().or_else(|| self.opening())
    }

    pub fn content(&self) -> &'t str {
        self.source().map_or("", |t| t.content.as_str())
    }

    pub fn markup(&self) -> &'t str {
        self.source().map_or("", |t| t.markup.as_str())
    }

    pub fn info(&self) -> &'t str {
        self.source().map_or("", |t| t.info.as_str())
    }

    pub fn level(&self) -> usize {
        self.source().map_or(0, |t| t.level)
    }

    pub fn hidden(&self) -> bool {
        self.source().is_some_and(|t| t.hidden)
    }

    pub fn map(&self) -> Option<(usize, usize)> {
        self.source().and_then(|t| t.map)
    }

    pub fn attrs(&self) -> Option<&'t IndexMap<String, String>> {
        self.source().map(|t| &t.attrs)
    }

    pub fn attr(&self, key: &str) -> Option<&'t str> {
        self.source().and_then(|t| t.attr(key))
    }

    pub fn meta(&self, key: &str) -> Option<&'t str> {
        self.source()
            .and_then(|t| t.meta.get(key))
            .map(String::as_str)
    }

    pub fn parent(&self) -> Option<RenderTreeNode<'t>> {
        self.data().parent.map(|id| self.handle(id))
    }

    /// Ordered child nodes
    pub fn children(
        &self,
    ) -> impl DoubleEndedIterator<Item = RenderTreeNode<'t>> + ExactSizeIterator + 't {
        let tree = self.tree;
        self.data()
            .children
            .iter()
            .map(move |&id| RenderTreeNode { tree, id })
    }

    pub fn child(&self, index: usize) -> Option<RenderTreeNode<'t>> {
        self.data().children.get(index).map(|&id| self.handle(id))
    }

    pub fn has_children(&self) -> bool {
        !self.data().children.is_empty()
    }

    fn sibling(&self, offset: isize) -> Option<RenderTreeNode<'t>> {
        let parent = self.data().parent?;
        let siblings = &self.tree.nodes[parent].children;
        let target = self.data().index.checked_add_signed(offset)?;
        siblings.get(target).map(|&id| self.handle(id))
    }

    pub fn next_sibling(&self) -> Option<RenderTreeNode<'t>> {
        self.sibling(1)
    }

    pub fn previous_sibling(&self) -> Option<RenderTreeNode<'t>> {
        self.sibling(-1)
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self) -> impl Iterator<Item = RenderTreeNode<'t>> + 't {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    /// Check whether any ancestor has the given syntax type
    pub fn is_inside(&self, node_type: &str) -> bool {
        self.ancestors().any(|node| node.node_type() == node_type)
    }

    /// Render this node with the given context
    pub fn render(&self, context: &mut RenderContext<'_>) -> String {
        context.render(*self)
    }
}
