//! Sequence helpers over a registry's ordered children.

use std::hash::Hash;

use indexmap::IndexMap;
use serde_json::Value;

use crate::engine::ViewTree;
use crate::types::{Options, ViewId};

use super::Registry;

impl Registry {
    pub fn len(&self) -> usize {
        self.child_list().borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the children in order.
    pub fn ids(&self) -> Vec<ViewId> {
        self.child_list().borrow().clone()
    }

    pub fn contains(&self, view: ViewId) -> bool {
        self.child_list().borrow().contains(&view)
    }

    pub fn at(&self, index: usize) -> Option<ViewId> {
        self.child_list().borrow().get(index).copied()
    }

    pub fn first(&self) -> Option<ViewId> {
        self.at(0)
    }

    pub fn last(&self) -> Option<ViewId> {
        self.child_list().borrow().last().copied()
    }

    /// Every child except the last.
    pub fn initial(&self) -> Vec<ViewId> {
        let mut ids = self.ids();
        ids.pop();
        ids
    }

    /// Every child except the first.
    pub fn rest(&self) -> Vec<ViewId> {
        self.ids().into_iter().skip(1).collect()
    }

    /// Call `f` on each child. The list is snapshotted first, so `f` may add or remove.
    pub fn each<F>(&self, tree: &mut ViewTree, mut f: F) -> &Self
    where
        F: FnMut(&mut ViewTree, ViewId),
    {
        for view in self.ids() {
            f(tree, view);
        }
        self
    }

    pub fn find<F>(&self, tree: &ViewTree, mut predicate: F) -> Option<ViewId>
    where
        F: FnMut(&ViewTree, ViewId) -> bool,
    {
        self.ids().into_iter().find(|view| predicate(tree, *view))
    }

    pub fn filter<F>(&self, tree: &ViewTree, mut predicate: F) -> Vec<ViewId>
    where
        F: FnMut(&ViewTree, ViewId) -> bool,
    {
        self.ids()
            .into_iter()
            .filter(|view| predicate(tree, *view))
            .collect()
    }

    /// Children sorted by `key` (stable). The registry order is unchanged.
    pub fn sort_by_key<K, F>(&self, tree: &ViewTree, mut key: F) -> Vec<ViewId>
    where
        K: Ord,
        F: FnMut(&ViewTree, ViewId) -> K,
    {
        let mut ids = self.ids();
        ids.sort_by_cached_key(|view| key(tree, *view));
        ids
    }

    /// Children grouped by `key`, groups in first-seen order.
    pub fn group_by<K, F>(&self, tree: &ViewTree, mut key: F) -> IndexMap<K, Vec<ViewId>>
    where
        K: Hash + Eq,
        F: FnMut(&ViewTree, ViewId) -> K,
    {
        let mut groups: IndexMap<K, Vec<ViewId>> = IndexMap::new();
        for view in self.ids() {
            groups.entry(key(tree, view)).or_default().push(view);
        }
        groups
    }

    /// Children whose construction options contain every pair in `attrs`.
    pub fn where_options(&self, tree: &ViewTree, attrs: &Options) -> Vec<ViewId> {
        self.filter(tree, |tree, view| options_match(tree, view, attrs))
    }

    pub fn find_where_options(&self, tree: &ViewTree, attrs: &Options) -> Option<ViewId> {
        self.find(tree, |tree, view| options_match(tree, view, attrs))
    }

    pub fn some<F>(&self, tree: &ViewTree, mut predicate: F) -> bool
    where
        F: FnMut(&ViewTree, ViewId) -> bool,
    {
        self.ids().into_iter().any(|view| predicate(tree, view))
    }

    pub fn every<F>(&self, tree: &ViewTree, mut predicate: F) -> bool
    where
        F: FnMut(&ViewTree, ViewId) -> bool,
    {
        self.ids().into_iter().all(|view| predicate(tree, view))
    }

    /// Run the named operation on each direct child; true where a child had it.
    pub fn invoke(&self, tree: &mut ViewTree, name: &str, args: &[Value]) -> Vec<bool> {
        self.ids()
            .into_iter()
            .map(|view| tree.invoke(view, name, args))
            .collect()
    }
}

fn options_match(tree: &ViewTree, view: ViewId, attrs: &Options) -> bool {
    tree.options(view)
        .is_some_and(|opts| attrs.iter().all(|(key, value)| opts.get(key) == Some(value)))
}
