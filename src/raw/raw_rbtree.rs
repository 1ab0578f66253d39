use std::cmp::Ordering;
use std::ops::ControlFlow;
use std::sync::Arc;

use smallvec::SmallVec;

use super::arena::Arena;
use super::handle::Handle;
use super::node::{Color, Node};
use crate::comparator::SharedComparator;
use crate::error::Error;

/// The red-black core backing `RbTreeMap` and `RbTreeSet`.
///
/// Owns all structural mutation: comparator-driven descent, the standard
/// insert/delete fixups, rotations (which maintain the subtree-size caches),
/// rank queries over those caches, and bulk construction from sorted entry
/// sequences. The façades above it never touch node links directly.
pub(crate) struct Core<K, V> {
    nodes: Arena<Node<K, V>>,
    root: Option<Handle>,
    len: usize,
    cmp: SharedComparator<K>,
    duplicates: bool,
    /// Bumped on every structural mutation; cursors compare their stamp
    /// against it to fail fast after out-of-band mutation.
    generation: u64,
}

impl<K: Clone, V: Clone> Clone for Core<K, V> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            root: self.root,
            len: self.len,
            cmp: Arc::clone(&self.cmp),
            duplicates: self.duplicates,
            generation: self.generation,
        }
    }
}

impl<K, V> Core<K, V> {
    pub(crate) fn new(cmp: SharedComparator<K>) -> Self {
        let duplicates = cmp.allows_duplicates();
        Self {
            nodes: Arena::new(),
            root: None,
            len: 0,
            cmp,
            duplicates,
            generation: 0,
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) const fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn comparator(&self) -> &SharedComparator<K> {
        &self.cmp
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.len = 0;
        self.generation += 1;
    }

    pub(crate) fn key_value(&self, h: Handle) -> (&K, &V) {
        let node = self.nodes.get(h);
        (&node.key, &node.value)
    }

    fn node(&self, h: Handle) -> &Node<K, V> {
        self.nodes.get(h)
    }

    fn node_mut(&mut self, h: Handle) -> &mut Node<K, V> {
        self.nodes.get_mut(h)
    }

    fn size_of(&self, h: Option<Handle>) -> usize {
        h.map_or(0, |h| self.node(h).size)
    }

    fn color_of(&self, h: Option<Handle>) -> Color {
        h.map_or(Color::Black, |h| self.node(h).color)
    }

    pub(crate) fn compare(&self, a: &K, b: &K) -> Result<Ordering, Error> {
        self.cmp.compare(a, b).ok_or(Error::BadComparator)
    }

    // ─── Search and navigation ──────────────────────────────────────────────

    pub(crate) fn find(&self, key: &K) -> Result<Option<Handle>, Error> {
        let mut cur = self.root;
        while let Some(h) = cur {
            match self.compare(key, &self.node(h).key)? {
                Ordering::Less => cur = self.node(h).left,
                Ordering::Greater => cur = self.node(h).right,
                Ordering::Equal => return Ok(Some(h)),
            }
        }
        Ok(None)
    }

    pub(crate) fn min_handle(&self) -> Option<Handle> {
        self.root.map(|r| self.min_of(r))
    }

    pub(crate) fn max_handle(&self) -> Option<Handle> {
        self.root.map(|r| self.max_of(r))
    }

    fn min_of(&self, mut h: Handle) -> Handle {
        while let Some(l) = self.node(h).left {
            h = l;
        }
        h
    }

    fn max_of(&self, mut h: Handle) -> Handle {
        while let Some(r) = self.node(h).right {
            h = r;
        }
        h
    }

    pub(crate) fn successor(&self, h: Handle) -> Option<Handle> {
        if let Some(r) = self.node(h).right {
            return Some(self.min_of(r));
        }
        let mut cur = h;
        while let Some(p) = self.node(cur).parent {
            if self.node(p).right == Some(cur) {
                cur = p;
            } else {
                return Some(p);
            }
        }
        None
    }

    pub(crate) fn predecessor(&self, h: Handle) -> Option<Handle> {
        if let Some(l) = self.node(h).left {
            return Some(self.max_of(l));
        }
        let mut cur = h;
        while let Some(p) = self.node(cur).parent {
            if self.node(p).left == Some(cur) {
                cur = p;
            } else {
                return Some(p);
            }
        }
        None
    }

    // ─── Rank queries ───────────────────────────────────────────────────────

    /// Zero-based position of `h` in sorted order, by subtree-size
    /// accumulation along the ancestor walk.
    pub(crate) fn rank_of_handle(&self, h: Handle) -> usize {
        let mut rank = self.size_of(self.node(h).left);
        let mut cur = h;
        while let Some(p) = self.node(cur).parent {
            if self.node(p).right == Some(cur) {
                rank += 1 + self.size_of(self.node(p).left);
            }
            cur = p;
        }
        rank
    }

    /// Inverse of `rank_of_handle`; `None` when `rank >= len`.
    pub(crate) fn handle_at_rank(&self, mut rank: usize) -> Option<Handle> {
        let mut cur = self.root?;
        loop {
            let left_size = self.size_of(self.node(cur).left);
            match rank.cmp(&left_size) {
                Ordering::Less => {
                    cur = self.node(cur).left.expect("rank below left subtree size implies a left child");
                }
                Ordering::Equal => return Some(cur),
                Ordering::Greater => {
                    rank -= left_size + 1;
                    cur = self.node(cur).right?;
                }
            }
        }
    }

    // ─── Traversal ──────────────────────────────────────────────────────────

    /// Ascending in-order visit of every entry.
    pub(crate) fn for_each(&self, mut f: impl FnMut(&K, &V)) {
        let mut stack: SmallVec<[Handle; 32]> = SmallVec::new();
        let mut cur = self.root;
        while cur.is_some() || !stack.is_empty() {
            while let Some(h) = cur {
                stack.push(h);
                cur = self.node(h).left;
            }
            let h = stack.pop().expect("walk stack is non-empty here");
            let node = self.node(h);
            f(&node.key, &node.value);
            cur = node.right;
        }
    }

    /// Ascending in-order visit with fallible early exit.
    pub(crate) fn try_walk(
        &self,
        mut f: impl FnMut(&K, &V) -> Result<ControlFlow<()>, Error>,
    ) -> Result<(), Error> {
        let mut stack: SmallVec<[Handle; 32]> = SmallVec::new();
        let mut cur = self.root;
        while cur.is_some() || !stack.is_empty() {
            while let Some(h) = cur {
                stack.push(h);
                cur = self.node(h).left;
            }
            let h = stack.pop().expect("walk stack is non-empty here");
            let node = self.node(h);
            if f(&node.key, &node.value)? == ControlFlow::Break(()) {
                return Ok(());
            }
            cur = node.right;
        }
        Ok(())
    }

    fn in_order_handles(&self) -> Vec<Handle> {
        let mut handles = Vec::with_capacity(self.len);
        let mut stack: SmallVec<[Handle; 32]> = SmallVec::new();
        let mut cur = self.root;
        while cur.is_some() || !stack.is_empty() {
            while let Some(h) = cur {
                stack.push(h);
                cur = self.node(h).left;
            }
            let h = stack.pop().expect("walk stack is non-empty here");
            handles.push(h);
            cur = self.node(h).right;
        }
        handles
    }

    /// Moves every entry out in ascending order, leaving the tree empty.
    /// O(n), no per-entry rebalancing.
    pub(crate) fn drain_entries(&mut self) -> Vec<(K, V)> {
        let handles = self.in_order_handles();
        let mut out = Vec::with_capacity(handles.len());
        for h in handles {
            let node = self.nodes.take(h);
            out.push((node.key, node.value));
        }
        self.nodes.clear();
        self.root = None;
        self.len = 0;
        self.generation += 1;
        out
    }

    // ─── Bulk construction ──────────────────────────────────────────────────

    /// Builds a tree from entries already in ascending comparator order in
    /// O(n): midpoint recursion, full levels black, the (possibly partial)
    /// bottom level red. Both children of a bottom-level red node are nil,
    /// so no red-red pair can form, and every path crosses exactly the full
    /// black levels.
    pub(crate) fn from_sorted_entries(cmp: SharedComparator<K>, entries: Vec<(K, V)>) -> Self {
        let mut core = Core::new(cmp);
        core.populate_sorted(entries);
        core.generation = 0;
        core
    }

    /// Removes `[start, stop)` in place; a no-op when nothing matches. The
    /// in-range predicate is evaluated before any mutation, so a comparator
    /// failure leaves the tree untouched.
    pub(crate) fn delete_range(&mut self, start: Option<&K>, stop: Option<&K>) -> Result<(), Error> {
        let mut cut = Vec::with_capacity(self.len);
        self.try_walk(|k, _| {
            let after_start = match start {
                None => true,
                Some(s) => self.compare(k, s)? != Ordering::Less,
            };
            let before_stop = match stop {
                None => true,
                Some(e) => self.compare(k, e)? == Ordering::Less,
            };
            cut.push(after_start && before_stop);
            Ok(ControlFlow::Continue(()))
        })?;
        if !cut.contains(&true) {
            return Ok(());
        }
        let entries = self.drain_entries();
        let kept = entries
            .into_iter()
            .zip(cut)
            .filter_map(|(entry, cut)| (!cut).then_some(entry))
            .collect();
        self.rebuild_from_sorted(kept);
        Ok(())
    }

    /// Replaces this tree's contents with `entries` (ascending), preserving
    /// the comparator and advancing the mutation stamp once.
    pub(crate) fn rebuild_from_sorted(&mut self, entries: Vec<(K, V)>) {
        self.nodes.clear();
        self.root = None;
        self.len = 0;
        self.populate_sorted(entries);
    }

    fn populate_sorted(&mut self, entries: Vec<(K, V)>) {
        self.generation += 1;
        let n = entries.len();
        if n == 0 {
            return;
        }
        let red_depth = n.ilog2() as usize;
        let mut items: Vec<Option<(K, V)>> = entries.into_iter().map(Some).collect();
        self.root = self.build_span(&mut items, 0, n, 0, red_depth, None);
        if let Some(root) = self.root {
            self.node_mut(root).color = Color::Black;
        }
        self.len = n;
    }

    fn build_span(
        &mut self,
        items: &mut [Option<(K, V)>],
        lo: usize,
        hi: usize,
        depth: usize,
        red_depth: usize,
        parent: Option<Handle>,
    ) -> Option<Handle> {
        if lo >= hi {
            return None;
        }
        let mid = lo + (hi - lo) / 2;
        let (key, value) = items[mid].take().expect("each entry is placed exactly once");
        let color = if depth == red_depth { Color::Red } else { Color::Black };
        let h = self.nodes.alloc(Node {
            key,
            value,
            color,
            parent,
            left: None,
            right: None,
            size: hi - lo,
        });
        let left = self.build_span(items, lo, mid, depth + 1, red_depth, Some(h));
        let right = self.build_span(items, mid + 1, hi, depth + 1, red_depth, Some(h));
        let node = self.node_mut(h);
        node.left = left;
        node.right = right;
        Some(h)
    }

    // ─── Insertion ──────────────────────────────────────────────────────────

    /// Inserts `key`. On a comparator tie with duplicates disallowed the
    /// existing value is replaced in place (non-structural: length and the
    /// mutation stamp are untouched, open cursors stay valid). With
    /// duplicates allowed a tie descends right, so equal keys keep insertion
    /// order.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Result<Option<V>, Error> {
        let mut cur = self.root;
        let mut parent = None;
        let mut go_left = false;
        while let Some(h) = cur {
            let ord = self.compare(&key, &self.node(h).key)?;
            match ord {
                Ordering::Less => {
                    parent = Some(h);
                    go_left = true;
                    cur = self.node(h).left;
                }
                Ordering::Greater => {
                    parent = Some(h);
                    go_left = false;
                    cur = self.node(h).right;
                }
                Ordering::Equal => {
                    if self.duplicates {
                        parent = Some(h);
                        go_left = false;
                        cur = self.node(h).right;
                    } else {
                        let old = std::mem::replace(&mut self.node_mut(h).value, value);
                        return Ok(Some(old));
                    }
                }
            }
        }

        let h = self.nodes.alloc(Node::new(key, value, parent));
        match parent {
            None => self.root = Some(h),
            Some(p) => {
                if go_left {
                    self.node_mut(p).left = Some(h);
                } else {
                    self.node_mut(p).right = Some(h);
                }
            }
        }

        let mut up = parent;
        while let Some(p) = up {
            self.node_mut(p).size += 1;
            up = self.node(p).parent;
        }

        self.insert_fixup(h);
        self.len += 1;
        self.generation += 1;
        Ok(None)
    }

    fn insert_fixup(&mut self, mut z: Handle) {
        while let Some(p) = self.node(z).parent {
            if self.node(p).color == Color::Black {
                break;
            }
            // A red parent is never the root, so the grandparent exists.
            let gp = self.node(p).parent.expect("red node has a parent");
            if self.node(gp).left == Some(p) {
                let uncle = self.node(gp).right;
                if self.color_of(uncle) == Color::Red {
                    let u = uncle.expect("red uncle exists");
                    self.node_mut(p).color = Color::Black;
                    self.node_mut(u).color = Color::Black;
                    self.node_mut(gp).color = Color::Red;
                    z = gp;
                } else {
                    if self.node(p).right == Some(z) {
                        z = p;
                        self.rotate_left(z);
                    }
                    let p = self.node(z).parent.expect("rotated child has a parent");
                    let gp = self.node(p).parent.expect("fixup parent has a parent");
                    self.node_mut(p).color = Color::Black;
                    self.node_mut(gp).color = Color::Red;
                    self.rotate_right(gp);
                }
            } else {
                let uncle = self.node(gp).left;
                if self.color_of(uncle) == Color::Red {
                    let u = uncle.expect("red uncle exists");
                    self.node_mut(p).color = Color::Black;
                    self.node_mut(u).color = Color::Black;
                    self.node_mut(gp).color = Color::Red;
                    z = gp;
                } else {
                    if self.node(p).left == Some(z) {
                        z = p;
                        self.rotate_right(z);
                    }
                    let p = self.node(z).parent.expect("rotated child has a parent");
                    let gp = self.node(p).parent.expect("fixup parent has a parent");
                    self.node_mut(p).color = Color::Black;
                    self.node_mut(gp).color = Color::Red;
                    self.rotate_left(gp);
                }
            }
        }
        let root = self.root.expect("fixup runs on a non-empty tree");
        self.node_mut(root).color = Color::Black;
    }

    // ─── Deletion ───────────────────────────────────────────────────────────

    pub(crate) fn delete_key(&mut self, key: &K) -> Result<(K, V), Error> {
        let h = self.find(key)?.ok_or(Error::KeyNotFound)?;
        Ok(self.delete_handle(h))
    }

    /// Physically removes the node at `z` (successor splice for two-child
    /// nodes) and rebalances. The spliced successor keeps its own handle, so
    /// neighbor handles computed before the call stay valid.
    pub(crate) fn delete_handle(&mut self, z: Handle) -> (K, V) {
        let mut y_color = self.node(z).color;
        let x: Option<Handle>;
        let x_parent: Option<Handle>;

        if self.node(z).left.is_none() {
            x = self.node(z).right;
            x_parent = self.node(z).parent;
            self.transplant(z, x);
        } else if self.node(z).right.is_none() {
            x = self.node(z).left;
            x_parent = self.node(z).parent;
            self.transplant(z, x);
        } else {
            let zr = self.node(z).right.expect("two-child node has a right child");
            let y = self.min_of(zr);
            y_color = self.node(y).color;
            x = self.node(y).right;
            if self.node(y).parent == Some(z) {
                x_parent = Some(y);
            } else {
                x_parent = self.node(y).parent;
                self.transplant(y, x);
                let zr = self.node(z).right;
                self.node_mut(y).right = zr;
                if let Some(r) = zr {
                    self.node_mut(r).parent = Some(y);
                }
            }
            self.transplant(z, Some(y));
            let zl = self.node(z).left;
            self.node_mut(y).left = zl;
            if let Some(l) = zl {
                self.node_mut(l).parent = Some(y);
            }
            self.node_mut(y).color = self.node(z).color;
        }

        // Size caches along the splice path, bottom-up.
        let mut up = x_parent;
        while let Some(p) = up {
            let size = 1 + self.size_of(self.node(p).left) + self.size_of(self.node(p).right);
            self.node_mut(p).size = size;
            up = self.node(p).parent;
        }

        if y_color == Color::Black {
            self.delete_fixup(x, x_parent);
        }

        let node = self.nodes.take(z);
        self.len -= 1;
        self.generation += 1;
        (node.key, node.value)
    }

    /// Replaces the subtree rooted at `u` with the one rooted at `v`.
    fn transplant(&mut self, u: Handle, v: Option<Handle>) {
        let up = self.node(u).parent;
        match up {
            None => self.root = v,
            Some(p) => {
                if self.node(p).left == Some(u) {
                    self.node_mut(p).left = v;
                } else {
                    self.node_mut(p).right = v;
                }
            }
        }
        if let Some(v) = v {
            self.node_mut(v).parent = up;
        }
    }

    fn delete_fixup(&mut self, mut x: Option<Handle>, mut x_parent: Option<Handle>) {
        while x != self.root && self.color_of(x) == Color::Black {
            let Some(p) = x_parent else { break };
            if self.node(p).left == x {
                // The doubled-black position has black height >= 1, so a
                // sibling exists.
                let mut w = self.node(p).right.expect("doubled-black node has a sibling");
                if self.node(w).color == Color::Red {
                    self.node_mut(w).color = Color::Black;
                    self.node_mut(p).color = Color::Red;
                    self.rotate_left(p);
                    w = self.node(p).right.expect("doubled-black node has a sibling");
                }
                if self.color_of(self.node(w).left) == Color::Black
                    && self.color_of(self.node(w).right) == Color::Black
                {
                    self.node_mut(w).color = Color::Red;
                    x = Some(p);
                    x_parent = self.node(p).parent;
                } else {
                    if self.color_of(self.node(w).right) == Color::Black {
                        if let Some(wl) = self.node(w).left {
                            self.node_mut(wl).color = Color::Black;
                        }
                        self.node_mut(w).color = Color::Red;
                        self.rotate_right(w);
                        w = self.node(p).right.expect("doubled-black node has a sibling");
                    }
                    self.node_mut(w).color = self.node(p).color;
                    self.node_mut(p).color = Color::Black;
                    if let Some(wr) = self.node(w).right {
                        self.node_mut(wr).color = Color::Black;
                    }
                    self.rotate_left(p);
                    x = self.root;
                    x_parent = None;
                }
            } else {
                let mut w = self.node(p).left.expect("doubled-black node has a sibling");
                if self.node(w).color == Color::Red {
                    self.node_mut(w).color = Color::Black;
                    self.node_mut(p).color = Color::Red;
                    self.rotate_right(p);
                    w = self.node(p).left.expect("doubled-black node has a sibling");
                }
                if self.color_of(self.node(w).left) == Color::Black
                    && self.color_of(self.node(w).right) == Color::Black
                {
                    self.node_mut(w).color = Color::Red;
                    x = Some(p);
                    x_parent = self.node(p).parent;
                } else {
                    if self.color_of(self.node(w).left) == Color::Black {
                        if let Some(wr) = self.node(w).right {
                            self.node_mut(wr).color = Color::Black;
                        }
                        self.node_mut(w).color = Color::Red;
                        self.rotate_left(w);
                        w = self.node(p).left.expect("doubled-black node has a sibling");
                    }
                    self.node_mut(w).color = self.node(p).color;
                    self.node_mut(p).color = Color::Black;
                    if let Some(wl) = self.node(w).left {
                        self.node_mut(wl).color = Color::Black;
                    }
                    self.rotate_right(p);
                    x = self.root;
                    x_parent = None;
                }
            }
        }
        if let Some(x) = x {
            self.node_mut(x).color = Color::Black;
        }
    }

    // ─── Rotations ──────────────────────────────────────────────────────────

    fn rotate_left(&mut self, x: Handle) {
        let y = self.node(x).right.expect("rotate_left requires a right child");
        let yl = self.node(y).left;
        self.node_mut(x).right = yl;
        if let Some(yl) = yl {
            self.node_mut(yl).parent = Some(x);
        }
        let xp = self.node(x).parent;
        self.node_mut(y).parent = xp;
        match xp {
            None => self.root = Some(y),
            Some(p) => {
                if self.node(p).left == Some(x) {
                    self.node_mut(p).left = Some(y);
                } else {
                    self.node_mut(p).right = Some(y);
                }
            }
        }
        self.node_mut(y).left = Some(x);
        self.node_mut(x).parent = Some(y);

        // y inherits x's subtree count; x shrinks to its remaining children.
        let x_size = self.node(x).size;
        self.node_mut(y).size = x_size;
        let new_x = 1 + self.size_of(self.node(x).left) + self.size_of(self.node(x).right);
        self.node_mut(x).size = new_x;
    }

    fn rotate_right(&mut self, x: Handle) {
        let y = self.node(x).left.expect("rotate_right requires a left child");
        let yr = self.node(y).right;
        self.node_mut(x).left = yr;
        if let Some(yr) = yr {
            self.node_mut(yr).parent = Some(x);
        }
        let xp = self.node(x).parent;
        self.node_mut(y).parent = xp;
        match xp {
            None => self.root = Some(y),
            Some(p) => {
                if self.node(p).left == Some(x) {
                    self.node_mut(p).left = Some(y);
                } else {
                    self.node_mut(p).right = Some(y);
                }
            }
        }
        self.node_mut(y).right = Some(x);
        self.node_mut(x).parent = Some(y);

        let x_size = self.node(x).size;
        self.node_mut(y).size = x_size;
        let new_x = 1 + self.size_of(self.node(x).left) + self.size_of(self.node(x).right);
        self.node_mut(x).size = new_x;
    }
}

impl<K, V: PartialEq> Core<K, V> {
    /// Element-for-element equality of the ascending entry sequences. Keys
    /// are equal when this tree's comparator says so, values under `==`.
    pub(crate) fn entries_eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }
        let a = self.in_order_handles();
        let b = other.in_order_handles();
        a.into_iter().zip(b).all(|(x, y)| {
            let (ka, va) = self.key_value(x);
            let (kb, vb) = other.key_value(y);
            self.cmp.compare(ka, kb) == Some(Ordering::Equal) && va == vb
        })
    }
}

impl<K: Clone, V: Clone> Core<K, V> {
    pub(crate) fn entries(&self) -> Vec<(K, V)> {
        let mut out = Vec::with_capacity(self.len);
        self.for_each(|k, v| out.push((k.clone(), v.clone())));
        out
    }

    /// Extracts `[start, stop)` into an independent tree, keeping every
    /// `step`-th match (0-indexed within the match run).
    pub(crate) fn slice(
        &self,
        start: Option<&K>,
        stop: Option<&K>,
        step: usize,
    ) -> Result<Self, Error> {
        debug_assert!(step > 0);
        let mut out: Vec<(K, V)> = Vec::new();
        let mut index = 0usize;
        self.try_walk(|k, v| {
            if let Some(s) = start {
                if self.compare(k, s)? == Ordering::Less {
                    return Ok(ControlFlow::Continue(()));
                }
            }
            if let Some(e) = stop {
                if self.compare(k, e)? != Ordering::Less {
                    return Ok(ControlFlow::Break(()));
                }
            }
            if index % step == 0 {
                out.push((k.clone(), v.clone()));
            }
            index += 1;
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(Core::from_sorted_entries(Arc::clone(&self.cmp), out))
    }

}
