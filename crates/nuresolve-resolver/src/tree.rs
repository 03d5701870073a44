//! Dependency trees.

use crate::types::ResolvedReference;
use nuresolve_core::PackageIdentity;
use serde::Serialize;
use std::fmt::{self, Write as _};

/// A node of a dependency tree.
///
/// `ignored` is true if this node or any ancestor matched an ignore rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyNode {
    /// The package reached at this node.
    pub reference: ResolvedReference,
    /// Excluded from installation.
    pub ignored: bool,
    /// Dependencies in declaration order.
    pub children: Vec<DependencyNode>,
}

impl DependencyNode {
    /// Create a node without children.
    #[must_use]
    pub const fn leaf(reference: ResolvedReference, ignored: bool) -> Self {
        Self {
            reference,
            ignored,
            children: Vec::new(),
        }
    }

    /// Package identity of this node.
    #[must_use]
    pub const fn identity(&self) -> &PackageIdentity {
        &self.reference.identity
    }

    /// Walk the tree, each node before its children.
    #[must_use]
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// A tree always holds at least its root.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Write the tree, one node per line, indented with tabs.
    ///
    /// Children of ignored nodes are not written.
    pub fn write_to(&self, out: &mut impl fmt::Write) -> fmt::Result {
        self.write_at(out, 0)
    }

    fn write_at(&self, out: &mut impl fmt::Write, depth: usize) -> fmt::Result {
        for _ in 0..depth {
            out.write_char('\t')?;
        }
        writeln!(out, "{self}")?;
        if self.ignored {
            return Ok(());
        }
        for child in &self.children {
            child.write_at(out, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for DependencyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reference.identity)?;
        if self.reference.development {
            f.write_str(" [dev]")?;
        }
        if self.ignored {
            f.write_str(" (Ignored)")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a DependencyNode {
    type Item = &'a DependencyNode;
    type IntoIter = PreOrder<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Pre-order iterator over a tree.
#[derive(Debug)]
pub struct PreOrder<'a> {
    stack: Vec<&'a DependencyNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a DependencyNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Walk several trees in order, each pre-order.
pub fn flatten(trees: &[DependencyNode]) -> impl Iterator<Item = &DependencyNode> {
    trees.iter().flat_map(DependencyNode::iter)
}

/// Render every tree as text.
#[must_use]
pub fn render_trees(trees: &[DependencyNode]) -> String {
    let mut out = String::new();
    for tree in trees {
        // Writing to a String cannot fail
        let _ = tree.write_to(&mut out);
    }
    out
}
