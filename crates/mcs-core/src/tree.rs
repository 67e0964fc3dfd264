//! Rooted binary time trees stored as an index arena.

use crate::errors::{ErrorInfo, McsError};

/// Single vertex of a [`Tree`].
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    height: f64,
    parent: Option<usize>,
    children: Vec<usize>,
    label: Option<String>,
}

impl TreeNode {
    /// Node height (time before present).
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Parent index, `None` for the root.
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Child indices.
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// Taxon label for leaves.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns true for leaves.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Rooted binary tree. Leaf heights are fixed data; internal heights are sampled.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<TreeNode>,
    root: usize,
}

impl Tree {
    /// Builds a tree from a parent table.
    ///
    /// `parents[i]` is the parent of node `i`; exactly one entry must be
    /// `None`. `labels` may be shorter than `parents`, missing entries are
    /// unlabelled.
    pub fn from_parents(
        parents: &[Option<usize>],
        heights: &[f64],
        labels: &[&str],
    ) -> Result<Self, McsError> {
        if parents.len() != heights.len() {
            return Err(McsError::Config(
                ErrorInfo::new("tree-shape", "parent and height tables differ in length")
                    .with_context("parents", parents.len().to_string())
                    .with_context("heights", heights.len().to_string()),
            ));
        }
        let mut nodes: Vec<TreeNode> = heights
            .iter()
            .enumerate()
            .map(|(idx, &height)| TreeNode {
                height,
                parent: parents[idx],
                children: Vec::new(),
                label: labels.get(idx).map(|label| label.to_string()),
            })
            .collect();
        let mut root = None;
        for (idx, parent) in parents.iter().enumerate() {
            match parent {
                Some(p) if *p < nodes.len() && *p != idx => nodes[*p].children.push(idx),
                Some(p) => {
                    return Err(McsError::Config(
                        ErrorInfo::new("tree-parent", "parent index out of range")
                            .with_context("node", idx.to_string())
                            .with_context("parent", p.to_string()),
                    ))
                }
                None if root.is_none() => root = Some(idx),
                None => {
                    return Err(McsError::Config(
                        ErrorInfo::new("tree-roots", "tree has more than one root")
                            .with_context("node", idx.to_string()),
                    ))
                }
            }
        }
        let root = root.ok_or_else(|| {
            McsError::Config(ErrorInfo::new("tree-roots", "tree has no root"))
        })?;
        let tree = Self { nodes, root };
        tree.validate().map_err(|err| McsError::Config(err.info().clone()))?;
        Ok(tree)
    }

    /// Number of vertices.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Root index.
    pub fn root(&self) -> usize {
        self.root
    }

    /// Vertex at `idx`.
    pub fn node(&self, idx: usize) -> Option<&TreeNode> {
        self.nodes.get(idx)
    }

    /// Height of vertex `idx`.
    pub fn height(&self, idx: usize) -> Option<f64> {
        self.nodes.get(idx).map(TreeNode::height)
    }

    /// Sets the height of vertex `idx`. Consistency is checked by [`Tree::validate`].
    pub fn set_height(&mut self, idx: usize, height: f64) {
        if let Some(node) = self.nodes.get_mut(idx) {
            node.height = height;
        }
    }

    /// Internal vertices other than the root.
    pub fn non_root_internal_nodes(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&idx| idx != self.root && !self.nodes[idx].is_leaf())
            .collect()
    }

    /// Checks link symmetry, binary branching, reachability and height order.
    pub fn validate(&self) -> Result<(), McsError> {
        let invalid = |code: &str, message: &str, idx: usize| {
            McsError::State(ErrorInfo::new(code, message).with_context("vertex", idx.to_string()))
        };
        if self.nodes.get(self.root).and_then(TreeNode::parent).is_some() {
            return Err(invalid("tree-root", "root has a parent", self.root));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if !node.is_leaf() && node.children.len() != 2 {
                return Err(invalid("tree-arity", "internal vertex is not binary", idx));
            }
            for &child in &node.children {
                let Some(child_node) = self.nodes.get(child) else {
                    return Err(invalid("tree-child", "child index out of range", idx));
                };
                if child_node.parent != Some(idx) {
                    return Err(invalid("tree-link", "child does not point back to parent", child));
                }
                if child_node.height > node.height {
                    return Err(invalid("tree-height", "child is higher than its parent", child));
                }
            }
            if let Some(parent) = node.parent {
                let linked = self
                    .nodes
                    .get(parent)
                    .map(|p| p.children.contains(&idx))
                    .unwrap_or(false);
                if !linked {
                    return Err(invalid("tree-link", "parent does not list vertex as child", idx));
                }
            }
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        while let Some(idx) = stack.pop() {
            if std::mem::replace(&mut seen[idx], true) {
                return Err(invalid("tree-cycle", "vertex reached twice", idx));
            }
            stack.extend(self.nodes[idx].children.iter().copied());
        }
        if let Some(idx) = seen.iter().position(|&s| !s) {
            return Err(invalid("tree-disconnected", "vertex unreachable from root", idx));
        }
        Ok(())
    }

    /// Newick rendering with branch lengths.
    pub fn to_newick(&self) -> String {
        let mut out = String::new();
        self.write_newick(self.root, &mut out);
        out.push(';');
        out
    }

    fn write_newick(&self, idx: usize, out: &mut String) {
        let node = &self.nodes[idx];
        if !node.is_leaf() {
            out.push('(');
            for (pos, &child) in node.children.iter().enumerate() {
                if pos > 0 {
                    out.push(',');
                }
                self.write_newick(child, out);
            }
            out.push(')');
        }
        match &node.label {
            Some(label) => out.push_str(label),
            None if node.is_leaf() => out.push_str(&idx.to_string()),
            None => {}
        }
        if let Some(parent) = node.parent {
            let length = self.nodes[parent].height - node.height;
            out.push_str(&format!(":{length}"));
        }
    }
}
