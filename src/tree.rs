//! Search-tree observation.
//!
//! The engine reports each node it enters and leaves to an optional
//! `SearchObserver`. Nothing flows back: the observer cannot influence the
//! search, and a search run without one behaves identically.

use serde::Serialize;

use crate::eval::Score;

/// Receives the shape of a search as it happens.
///
/// Calls nest: every `enter` is matched by one `exit`, and `mark_best`
/// refers to a child of the node currently open (the root when no `enter`
/// is pending).
pub trait SearchObserver {
    /// A move is about to be searched below the current node.
    fn enter(&mut self, _notation: &str) {}

    /// The move entered last has been searched and scored.
    fn exit(&mut self, _score: Score) {}

    /// Child number `index` of the current node was chosen as its best.
    fn mark_best(&mut self, _index: usize) {}

    /// The search is complete; `score` is the root's value.
    fn finish(&mut self, _score: Score) {}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchNode {
    #[serde(rename = "move")]
    pub notation: String,
    pub score: Score,
    pub is_best: bool,
    pub children: Vec<SearchNode>,
}

impl SearchNode {
    fn new(notation: &str) -> Self {
        SearchNode {
            notation: notation.to_string(),
            score: 0,
            is_best: false,
            children: Vec::new(),
        }
    }

    pub fn best_child(&self) -> Option<&SearchNode> {
        self.children.iter().find(|c| c.is_best)
    }

    /// Total number of nodes in this subtree, itself included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(SearchNode::size).sum::<usize>()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Observer that records the whole search as a `SearchNode` tree.
#[derive(Debug)]
pub struct TreeRecorder {
    stack: Vec<SearchNode>,
}

impl Default for TreeRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeRecorder {
    pub fn new() -> Self {
        TreeRecorder {
            stack: vec![SearchNode::new("Root")],
        }
    }

    /// The recorded tree. Nodes still open (only possible if the search was
    /// abandoned mid-way) are folded into their parents first.
    pub fn into_tree(mut self) -> SearchNode {
        while self.stack.len() > 1 {
            self.close();
        }
        self.stack.pop().unwrap_or_else(|| SearchNode::new("Root"))
    }

    fn close(&mut self) {
        if self.stack.len() > 1 {
            if let Some(node) = self.stack.pop() {
                if let Some(parent) = self.stack.last_mut() {
                    parent.children.push(node);
                }
            }
        }
    }
}

impl SearchObserver for TreeRecorder {
    fn enter(&mut self, notation: &str) {
        self.stack.push(SearchNode::new(notation));
    }

    fn exit(&mut self, score: Score) {
        if let Some(node) = self.stack.last_mut() {
            node.score = score;
        }
        self.close();
    }

    fn mark_best(&mut self, index: usize) {
        if let Some(child) = self
            .stack
            .last_mut()
            .and_then(|node| node.children.get_mut(index))
        {
            child.is_best = true;
        }
    }

    fn finish(&mut self, score: Score) {
        if let Some(root) = self.stack.first_mut() {
            root.score = score;
        }
    }
}
