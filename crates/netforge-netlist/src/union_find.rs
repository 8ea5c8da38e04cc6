//! Disjoint sets over dense indices, plus the interner that hands those
//! indices out for terminal keys.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a singleton set and return its index.
    pub fn make_set(&mut self) -> usize {
        let index = self.parent.len();
        self.parent.push(index);
        index
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Representative of `x`, compressing the path behind it.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut cursor = x;
        while self.parent[cursor] != root {
            let next = self.parent[cursor];
            self.parent[cursor] = root;
            cursor = next;
        }
        root
    }

    /// Merge the sets of `a` and `b`. The root of `a` is attached under the
    /// root of `b`, which becomes the representative. Returns it.
    pub fn union(&mut self, a: usize, b: usize) -> usize {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra] = rb;
        }
        rb
    }

    pub fn same(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }
}

/// Interns string keys to dense indices, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Interner {
    lookup: HashMap<String, usize>,
    keys: Vec<String>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `key`, and whether it was newly added.
    pub fn intern(&mut self, key: &str) -> (usize, bool) {
        if let Some(&index) = self.lookup.get(key) {
            return (index, false);
        }
        let index = self.keys.len();
        self.keys.push(key.to_string());
        self.lookup.insert(key.to_string(), index);
        (index, true)
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.lookup.get(key).copied()
    }

    pub fn key(&self, index: usize) -> &str {
        &self.keys[index]
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}
