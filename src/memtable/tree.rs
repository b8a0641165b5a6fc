//! Red-black tree keyed by raw byte strings
//!
//! Nodes live in a flat arena (`Vec<Node<V>>`) and refer to each other by
//! index, with [`NIL`] standing in for absent children and the root's parent.
//! Removing a node moves the last arena slot into the freed one, so the arena
//! stays dense and indices never dangle.
//!
//! ## Invariants
//! - The root is black.
//! - A red node never has a red child.
//! - Every path from a node down to its leaves crosses the same number of
//!   black nodes.
//! - In-order traversal yields strictly ascending keys.
//!
//! Structural impossibilities reached while rebalancing are defects and
//! panic; [`RedBlackTree::check_invariants`] reports a broken tree as
//! [`LsmError::InvariantViolation`].

use std::cmp::Ordering;
use std::mem;

use crate::error::{LsmError, Result};

/// Arena index used for "no node"
const NIL: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

#[derive(Debug, Clone)]
struct Node<V> {
    key: Vec<u8>,
    value: V,
    color: Color,
    parent: usize,
    left: usize,
    right: usize,
}

/// Balanced ordered map from byte strings to `V`
#[derive(Debug, Clone)]
pub struct RedBlackTree<V> {
    nodes: Vec<Node<V>>,
    root: usize,
}

impl<V> Default for RedBlackTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RedBlackTree<V> {
    /// Create an empty tree
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: NIL,
        }
    }

    /// Number of keys in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = NIL;
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Exact-match lookup
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        match self.find(key) {
            NIL => None,
            n => Some(&self.nodes[n].value),
        }
    }

    /// Exact-match lookup returning a mutable value
    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut V> {
        match self.find(key) {
            NIL => None,
            n => Some(&mut self.nodes[n].value),
        }
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.find(key) != NIL
    }

    /// Greatest entry whose key is `<= key`
    pub fn floor(&self, key: &[u8]) -> Option<(&[u8], &V)> {
        let mut cur = self.root;
        let mut best = NIL;
        while cur != NIL {
            match key.cmp(&self.nodes[cur].key) {
                Ordering::Equal => {
                    best = cur;
                    break;
                }
                Ordering::Less => cur = self.nodes[cur].left,
                Ordering::Greater => {
                    best = cur;
                    cur = self.nodes[cur].right;
                }
            }
        }
        self.entry(best)
    }

    /// Least entry whose key is `>= key`
    pub fn ceil(&self, key: &[u8]) -> Option<(&[u8], &V)> {
        let mut cur = self.root;
        let mut best = NIL;
        while cur != NIL {
            match key.cmp(&self.nodes[cur].key) {
                Ordering::Equal => {
                    best = cur;
                    break;
                }
                Ordering::Less => {
                    best = cur;
                    cur = self.nodes[cur].left;
                }
                Ordering::Greater => cur = self.nodes[cur].right,
            }
        }
        self.entry(best)
    }

    /// Smallest entry
    pub fn first(&self) -> Option<(&[u8], &V)> {
        if self.root == NIL {
            return None;
        }
        self.entry(self.minimum(self.root))
    }

    /// Largest entry
    pub fn last(&self) -> Option<(&[u8], &V)> {
        let mut cur = self.root;
        if cur == NIL {
            return None;
        }
        while self.nodes[cur].right != NIL {
            cur = self.nodes[cur].right;
        }
        self.entry(cur)
    }

    /// In-order (ascending key) iterator. Each call starts a fresh traversal.
    pub fn iter(&self) -> Iter<'_, V> {
        let mut iter = Iter {
            tree: self,
            stack: Vec::new(),
            remaining: self.nodes.len(),
        };
        iter.push_left_spine(self.root);
        iter
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Insert a key, or overwrite the value of an existing key in place.
    ///
    /// Returns the previous value on overwrite. Overwrites never rebalance.
    pub fn insert(&mut self, key: Vec<u8>, value: V) -> Option<V> {
        let mut parent = NIL;
        let mut cur = self.root;
        let mut go_left = false;

        while cur != NIL {
            parent = cur;
            match key.as_slice().cmp(&self.nodes[cur].key) {
                Ordering::Less => {
                    go_left = true;
                    cur = self.nodes[cur].left;
                }
                Ordering::Greater => {
                    go_left = false;
                    cur = self.nodes[cur].right;
                }
                Ordering::Equal => {
                    return Some(mem::replace(&mut self.nodes[cur].value, value));
                }
            }
        }

        let z = self.nodes.len();
        self.nodes.push(Node {
            key,
            value,
            color: Color::Red,
            parent,
            left: NIL,
            right: NIL,
        });

        if parent == NIL {
            self.root = z;
        } else if go_left {
            self.nodes[parent].left = z;
        } else {
            self.nodes[parent].right = z;
        }

        self.insert_fixup(z);
        None
    }

    /// Remove a key, rebalancing as needed. Returns the removed value.
    pub fn remove(&mut self, key: &[u8]) -> Option<V> {
        let z = self.find(key);
        if z == NIL {
            return None;
        }

        let mut removed_color = self.nodes[z].color;
        let x;
        let x_parent;

        if self.nodes[z].left == NIL {
            x = self.nodes[z].right;
            x_parent = self.nodes[z].parent;
            self.transplant(z, x);
        } else if self.nodes[z].right == NIL {
            x = self.nodes[z].left;
            x_parent = self.nodes[z].parent;
            self.transplant(z, x);
        } else {
            // Two children: splice out the in-order successor and put it in z's place
            let y = self.minimum(self.nodes[z].right);
            removed_color = self.nodes[y].color;
            x = self.nodes[y].right;

            if self.nodes[y].parent == z {
                x_parent = y;
            } else {
                x_parent = self.nodes[y].parent;
                self.transplant(y, x);
                let z_right = self.nodes[z].right;
                self.nodes[y].right = z_right;
                self.nodes[z_right].parent = y;
            }

            self.transplant(z, y);
            let z_left = self.nodes[z].left;
            self.nodes[y].left = z_left;
            self.nodes[z_left].parent = y;
            self.nodes[y].color = self.nodes[z].color;
        }

        if removed_color == Color::Black {
            self.delete_fixup(x, x_parent);
        }

        Some(self.release(z))
    }

    // =========================================================================
    // Invariant Checking
    // =========================================================================

    /// Verify every red-black and ordering invariant, plus parent links
    pub fn check_invariants(&self) -> Result<()> {
        if self.root == NIL {
            if self.nodes.is_empty() {
                return Ok(());
            }
            return Err(LsmError::InvariantViolation(format!(
                "empty root with {} nodes in arena",
                self.nodes.len()
            )));
        }
        if self.nodes[self.root].color != Color::Black {
            return Err(LsmError::InvariantViolation("root is red".to_string()));
        }
        if self.nodes[self.root].parent != NIL {
            return Err(LsmError::InvariantViolation(
                "root has a parent".to_string(),
            ));
        }

        let mut visited = 0;
        self.check_subtree(self.root, None, None, &mut visited)?;

        if visited != self.nodes.len() {
            return Err(LsmError::InvariantViolation(format!(
                "{} nodes reachable, {} in arena",
                visited,
                self.nodes.len()
            )));
        }
        Ok(())
    }

    /// Returns the black height of the subtree rooted at `n`
    fn check_subtree(
        &self,
        n: usize,
        lower: Option<&[u8]>,
        upper: Option<&[u8]>,
        visited: &mut usize,
    ) -> Result<usize> {
        if n == NIL {
            return Ok(1);
        }
        *visited += 1;
        let node = &self.nodes[n];

        if lower.map_or(false, |lo| node.key.as_slice() <= lo)
            || upper.map_or(false, |hi| node.key.as_slice() >= hi)
        {
            return Err(LsmError::InvariantViolation(format!(
                "key {:02x?} out of order",
                node.key
            )));
        }

        for child in [node.left, node.right] {
            if child == NIL {
                continue;
            }
            if self.nodes[child].parent != n {
                return Err(LsmError::InvariantViolation(format!(
                    "broken parent link below key {:02x?}",
                    node.key
                )));
            }
            if node.color == Color::Red && self.nodes[child].color == Color::Red {
                return Err(LsmError::InvariantViolation(format!(
                    "red node {:02x?} has a red child",
                    node.key
                )));
            }
        }

        let left = self.check_subtree(node.left, lower, Some(&node.key), visited)?;
        let right = self.check_subtree(node.right, Some(&node.key), upper, visited)?;
        if left != right {
            return Err(LsmError::InvariantViolation(format!(
                "black height mismatch at key {:02x?}: {} vs {}",
                node.key, left, right
            )));
        }

        Ok(left + usize::from(node.color == Color::Black))
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn find(&self, key: &[u8]) -> usize {
        let mut cur = self.root;
        while cur != NIL {
            match key.cmp(&self.nodes[cur].key) {
                Ordering::Less => cur = self.nodes[cur].left,
                Ordering::Greater => cur = self.nodes[cur].right,
                Ordering::Equal => return cur,
            }
        }
        NIL
    }

    fn entry(&self, n: usize) -> Option<(&[u8], &V)> {
        if n == NIL {
            return None;
        }
        let node = &self.nodes[n];
        Some((node.key.as_slice(), &node.value))
    }

    fn minimum(&self, mut n: usize) -> usize {
        while self.nodes[n].left != NIL {
            n = self.nodes[n].left;
        }
        n
    }

    fn color(&self, n: usize) -> Color {
        if n == NIL {
            Color::Black
        } else {
            self.nodes[n].color
        }
    }

    fn set_color(&mut self, n: usize, color: Color) {
        if n != NIL {
            self.nodes[n].color = color;
        }
    }

    fn parent(&self, n: usize) -> usize {
        if n == NIL {
            NIL
        } else {
            self.nodes[n].parent
        }
    }

    fn left(&self, n: usize) -> usize {
        if n == NIL {
            NIL
        } else {
            self.nodes[n].left
        }
    }

    fn right(&self, n: usize) -> usize {
        if n == NIL {
            NIL
        } else {
            self.nodes[n].right
        }
    }

    fn rotate_left(&mut self, x: usize) {
        let y = self.nodes[x].right;
        let y_left = self.nodes[y].left;

        self.nodes[x].right = y_left;
        if y_left != NIL {
            self.nodes[y_left].parent = x;
        }

        let xp = self.nodes[x].parent;
        self.nodes[y].parent = xp;
        if xp == NIL {
            self.root = y;
        } else if self.nodes[xp].left == x {
            self.nodes[xp].left = y;
        } else {
            self.nodes[xp].right = y;
        }

        self.nodes[y].left = x;
        self.nodes[x].parent = y;
    }

    fn rotate_right(&mut self, x: usize) {
        let y = self.nodes[x].left;
        let y_right = self.nodes[y].right;

        self.nodes[x].left = y_right;
        if y_right != NIL {
            self.nodes[y_right].parent = x;
        }

        let xp = self.nodes[x].parent;
        self.nodes[y].parent = xp;
        if xp == NIL {
            self.root = y;
        } else if self.nodes[xp].right == x {
            self.nodes[xp].right = y;
        } else {
            self.nodes[xp].left = y;
        }

        self.nodes[y].right = x;
        self.nodes[x].parent = y;
    }

    fn insert_fixup(&mut self, mut z: usize) {
        while self.color(self.parent(z)) == Color::Red {
            let p = self.nodes[z].parent;
            // A red parent is never the root, so the grandparent exists
            let g = self.nodes[p].parent;

            if p == self.nodes[g].left {
                let uncle = self.nodes[g].right;
                if self.color(uncle) == Color::Red {
                    self.nodes[p].color = Color::Black;
                    self.nodes[uncle].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    z = g;
                } else {
                    if z == self.nodes[p].right {
                        z = p;
                        self.rotate_left(z);
                    }
                    let p = self.nodes[z].parent;
                    let g = self.nodes[p].parent;
                    self.nodes[p].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    self.rotate_right(g);
                }
            } else {
                let uncle = self.nodes[g].left;
                if self.color(uncle) == Color::Red {
                    self.nodes[p].color = Color::Black;
                    self.nodes[uncle].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    z = g;
                } else {
                    if z == self.nodes[p].left {
                        z = p;
                        self.rotate_right(z);
                    }
                    let p = self.nodes[z].parent;
                    let g = self.nodes[p].parent;
                    self.nodes[p].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    self.rotate_left(g);
                }
            }
        }
        let root = self.root;
        self.nodes[root].color = Color::Black;
    }

    /// Restore black-height balance after removing a black node.
    ///
    /// `x` carries an extra black and may be NIL, so its parent is passed in.
    fn delete_fixup(&mut self, mut x: usize, mut parent: usize) {
        // Case 1: x reached the root, or x is red (recolored black below)
        while x != self.root && self.color(x) == Color::Black {
            if x == self.left(parent) {
                let mut sibling = self.nodes[parent].right;
                assert_ne!(sibling, NIL, "red-black tree: doubly-black node without sibling");

                // Case 2: red sibling, rotate so the sibling becomes black
                if self.color(sibling) == Color::Red {
                    self.nodes[sibling].color = Color::Black;
                    self.nodes[parent].color = Color::Red;
                    self.rotate_left(parent);
                    sibling = self.nodes[parent].right;
                }

                if self.color(self.left(sibling)) == Color::Black
                    && self.color(self.right(sibling)) == Color::Black
                {
                    // Case 3 (black parent): recolor and push the problem up.
                    // Case 4 (red parent): the loop exits and the parent turns black.
                    self.nodes[sibling].color = Color::Red;
                    x = parent;
                    parent = self.parent(x);
                } else {
                    // Case 5: near nephew red, far nephew black
                    if self.color(self.right(sibling)) == Color::Black {
                        let near = self.nodes[sibling].left;
                        self.set_color(near, Color::Black);
                        self.nodes[sibling].color = Color::Red;
                        self.rotate_right(sibling);
                        sibling = self.nodes[parent].right;
                    }
                    // Case 6: far nephew red, rotate the parent and finish
                    self.nodes[sibling].color = self.nodes[parent].color;
                    self.nodes[parent].color = Color::Black;
                    let far = self.nodes[sibling].right;
                    self.set_color(far, Color::Black);
                    self.rotate_left(parent);
                    x = self.root;
                    parent = NIL;
                }
            } else {
                let mut sibling = self.nodes[parent].left;
                assert_ne!(sibling, NIL, "red-black tree: doubly-black node without sibling");

                if self.color(sibling) == Color::Red {
                    self.nodes[sibling].color = Color::Black;
                    self.nodes[parent].color = Color::Red;
                    self.rotate_right(parent);
                    sibling = self.nodes[parent].left;
                }

                if self.color(self.left(sibling)) == Color::Black
                    && self.color(self.right(sibling)) == Color::Black
                {
                    self.nodes[sibling].color = Color::Red;
                    x = parent;
                    parent = self.parent(x);
                } else {
                    if self.color(self.left(sibling)) == Color::Black {
                        let near = self.nodes[sibling].right;
                        self.set_color(near, Color::Black);
                        self.nodes[sibling].color = Color::Red;
                        self.rotate_left(sibling);
                        sibling = self.nodes[parent].left;
                    }
                    self.nodes[sibling].color = self.nodes[parent].color;
                    self.nodes[parent].color = Color::Black;
                    let far = self.nodes[sibling].left;
                    self.set_color(far, Color::Black);
                    self.rotate_right(parent);
                    x = self.root;
                    parent = NIL;
                }
            }
        }
        self.set_color(x, Color::Black);
    }

    /// Replace the subtree rooted at `u` with the one rooted at `v`
    fn transplant(&mut self, u: usize, v: usize) {
        let up = self.nodes[u].parent;
        if up == NIL {
            self.root = v;
        } else if self.nodes[up].left == u {
            self.nodes[up].left = v;
        } else {
            self.nodes[up].right = v;
        }
        if v != NIL {
            self.nodes[v].parent = up;
        }
    }

    /// Free the arena slot of an already-unlinked node.
    ///
    /// The last slot moves into the hole; links to it are redirected first.
    fn release(&mut self, z: usize) -> V {
        let last = self.nodes.len() - 1;
        if z != last {
            let (p, l, r) = {
                let moved = &self.nodes[last];
                (moved.parent, moved.left, moved.right)
            };
            if p == NIL {
                self.root = z;
            } else if self.nodes[p].left == last {
                self.nodes[p].left = z;
            } else {
                self.nodes[p].right = z;
            }
            if l != NIL {
                self.nodes[l].parent = z;
            }
            if r != NIL {
                self.nodes[r].parent = z;
            }
        }
        self.nodes.swap_remove(z).value
    }
}

// =============================================================================
// In-order Iterator
// =============================================================================

/// Ascending iterator over `(key, value)` pairs
pub struct Iter<'a, V> {
    tree: &'a RedBlackTree<V>,
    stack: Vec<usize>,
    remaining: usize,
}

impl<'a, V> Iter<'a, V> {
    fn push_left_spine(&mut self, mut n: usize) {
        while n != NIL {
            self.stack.push(n);
            n = self.tree.nodes[n].left;
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a [u8], &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.stack.pop()?;
        let tree = self.tree;
        self.push_left_spine(tree.nodes[n].right);
        self.remaining -= 1;
        let node = &tree.nodes[n];
        Some((node.key.as_slice(), &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, V> ExactSizeIterator for Iter<'a, V> {}

impl<'a, V> IntoIterator for &'a RedBlackTree<V> {
    type Item = (&'a [u8], &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
