//! Per-object property storage.
//!
//! Properties live in an AA-tree keyed by name. Nodes are stored in a `Vec`
//! owned by the tree and linked by index; an absent child counts as level 0.
//! Insertion is the classic recursive insert followed by `skew` and `split`
//! on the way back up. Deletion is rare, so it rebuilds the tree from the
//! remaining nodes in order.

// Node indices are only ever produced by this tree and point into `nodes`.
#![allow(clippy::indexing_slicing)]

use std::cmp::Ordering;

use crate::value::{CheapClone, JsString, Value};

/// Property attribute bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyFlags(u8);

impl PropertyFlags {
    const WRITABLE: u8 = 1;
    const ENUMERABLE: u8 = 2;
    const CONFIGURABLE: u8 = 4;

    /// writable, enumerable, configurable: what assignment creates
    pub const DEFAULT: Self = Self(Self::WRITABLE | Self::ENUMERABLE | Self::CONFIGURABLE);
    /// writable, configurable: built-in methods
    pub const HIDDEN: Self = Self(Self::WRITABLE | Self::CONFIGURABLE);
    /// writable, enumerable: declared variables
    pub const PERMANENT: Self = Self(Self::WRITABLE | Self::ENUMERABLE);
    /// none: constants such as `NaN`
    pub const READONLY: Self = Self(0);

    pub const fn new(writable: bool, enumerable: bool, configurable: bool) -> Self {
        let mut bits = 0;
        if writable {
            bits |= Self::WRITABLE;
        }
        if enumerable {
            bits |= Self::ENUMERABLE;
        }
        if configurable {
            bits |= Self::CONFIGURABLE;
        }
        Self(bits)
    }

    pub fn writable(self) -> bool {
        self.0 & Self::WRITABLE != 0
    }

    pub fn enumerable(self) -> bool {
        self.0 & Self::ENUMERABLE != 0
    }

    pub fn configurable(self) -> bool {
        self.0 & Self::CONFIGURABLE != 0
    }
}

impl Default for PropertyFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone)]
pub struct Property {
    pub name: JsString,
    pub value: Value,
    pub flags: PropertyFlags,
}

#[derive(Debug, Clone)]
struct Node {
    property: Property,
    level: u32,
    left: Option<u32>,
    right: Option<u32>,
}

/// An ordered map from names to properties.
#[derive(Debug, Clone, Default)]
pub struct PropertyTree {
    nodes: Vec<Node>,
    root: Option<u32>,
}

impl PropertyTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn find(&self, name: &str) -> Option<u32> {
        let mut current = self.root;
        while let Some(index) = current {
            let node = &self.nodes[index as usize];
            current = match name.cmp(node.property.name.as_str()) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(index),
            };
        }
        None
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.find(name).map(|i| &self.nodes[i as usize].property)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.find(name).map(|i| &mut self.nodes[i as usize].property)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Find-or-create. A new property starts undefined with default flags;
    /// the flag reports whether it was created.
    pub fn upsert(&mut self, name: &JsString) -> (&mut Property, bool) {
        let before = self.nodes.len();
        let mut found = 0;
        let root = self.insert_at(self.root, name, &mut found);
        self.root = Some(root);
        let created = self.nodes.len() > before;
        (&mut self.nodes[found as usize].property, created)
    }

    /// Create or overwrite a property with the given value and flags.
    pub fn insert(&mut self, name: JsString, value: Value, flags: PropertyFlags) {
        let (property, _) = self.upsert(&name);
        property.value = value;
        property.flags = flags;
    }

    /// Remove a property, rebuilding the tree from the remaining nodes.
    pub fn remove(&mut self, name: &str) -> Option<Property> {
        self.find(name)?;
        let mut removed = None;
        let mut remaining = Vec::with_capacity(self.nodes.len());
        for property in self.drain_in_order() {
            if removed.is_none() && property.name.as_str() == name {
                removed = Some(property);
            } else {
                remaining.push(property);
            }
        }
        for property in remaining {
            let (slot, _) = self.upsert(&property.name.cheap_clone());
            *slot = property;
        }
        removed
    }

    /// Properties in ascending name order.
    pub fn iter(&self) -> Iter<'_> {
        let mut iter = Iter {
            tree: self,
            stack: Vec::new(),
        };
        iter.push_left(self.root);
        iter
    }

    fn drain_in_order(&mut self) -> Vec<Property> {
        let order: Vec<u32> = self.iter_indices();
        let mut nodes: Vec<Option<Node>> = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(Some)
            .collect();
        self.root = None;
        order
            .into_iter()
            .filter_map(|i| nodes[i as usize].take().map(|n| n.property))
            .collect()
    }

    fn iter_indices(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = Vec::new();
        let mut current = self.root;
        loop {
            while let Some(index) = current {
                stack.push(index);
                current = self.nodes[index as usize].left;
            }
            match stack.pop() {
                Some(index) => {
                    out.push(index);
                    current = self.nodes[index as usize].right;
                }
                None => return out,
            }
        }
    }

    fn level(&self, node: Option<u32>) -> u32 {
        node.map_or(0, |i| self.nodes[i as usize].level)
    }

    fn insert_at(&mut self, node: Option<u32>, name: &JsString, found: &mut u32) -> u32 {
        let Some(index) = node else {
            let index = self.nodes.len() as u32;
            self.nodes.push(Node {
                property: Property {
                    name: name.cheap_clone(),
                    value: Value::Undefined,
                    flags: PropertyFlags::DEFAULT,
                },
                level: 1,
                left: None,
                right: None,
            });
            *found = index;
            return index;
        };
        let i = index as usize;
        match name.as_str().cmp(self.nodes[i].property.name.as_str()) {
            Ordering::Less => {
                let left = self.insert_at(self.nodes[i].left, name, found);
                self.nodes[i].left = Some(left);
            }
            Ordering::Greater => {
                let right = self.insert_at(self.nodes[i].right, name, found);
                self.nodes[i].right = Some(right);
            }
            Ordering::Equal => {
                *found = index;
                return index;
            }
        }
        let index = self.skew(index);
        self.split(index)
    }

    /// Rotate right when the left child is on the same level.
    fn skew(&mut self, node: u32) -> u32 {
        let n = node as usize;
        if let Some(left) = self.nodes[n].left {
            let l = left as usize;
            if self.nodes[l].level == self.nodes[n].level {
                self.nodes[n].left = self.nodes[l].right;
                self.nodes[l].right = Some(node);
                return left;
            }
        }
        node
    }

    /// Rotate left and promote when there are two right links on one level.
    fn split(&mut self, node: u32) -> u32 {
        let n = node as usize;
        if let Some(right) = self.nodes[n].right {
            let r = right as usize;
            if self.level(self.nodes[r].right) == self.nodes[n].level {
                self.nodes[n].right = self.nodes[r].left;
                self.nodes[r].left = Some(node);
                self.nodes[r].level += 1;
                return right;
            }
        }
        node
    }

    /// Check the AA-tree invariants, returning the first violation found.
    #[cfg(test)]
    fn validate(&self) -> Result<(), String> {
        for node in &self.nodes {
            let level = node.level;
            if node.left.is_none() && node.right.is_none() && level != 1 {
                return Err(format!("leaf {} has level {}", node.property.name, level));
            }
            if self.level(node.left) + 1 != level {
                return Err(format!("left child of {} not one level down", node.property.name));
            }
            let right = self.level(node.right);
            if right != level && right + 1 != level {
                return Err(format!("right child of {} has level {}", node.property.name, right));
            }
            if let Some(r) = node.right {
                if self.level(self.nodes[r as usize].right) == level {
                    return Err(format!("double horizontal link at {}", node.property.name));
                }
            }
        }
        let names: Vec<&str> = self.iter().map(|p| p.name.as_str()).collect();
        if names.windows(2).any(|w| w[0] >= w[1]) {
            return Err("in-order traversal not ascending".to_string());
        }
        if names.len() != self.nodes.len() {
            return Err("unreachable nodes".to_string());
        }
        Ok(())
    }
}

/// In-order iterator over a `PropertyTree`
pub struct Iter<'a> {
    tree: &'a PropertyTree,
    stack: Vec<u32>,
}

impl Iter<'_> {
    fn push_left(&mut self, mut node: Option<u32>) {
        while let Some(index) = node {
            self.stack.push(index);
            node = self.tree.nodes[index as usize].left;
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Property;

    fn next(&mut self) -> Option<&'a Property> {
        let index = self.stack.pop()?;
        let node = &self.tree.nodes[index as usize];
        self.push_left(node.right);
        Some(&node.property)
    }
}
