use std::sync::Arc;

use super::*;
use crate::ledger::{UpdateKind, UpdateState};
use crate::widget::MemoryTree;

struct Fixture {
    registry: ElementRegistry<&'static str>,
    tree: MemoryTree,
    pending: PendingUpdates,
}

impl Fixture {
    fn new() -> Self {
        let mut registry = ElementRegistry::new();
        registry.map("root", 0);
        Self {
            registry,
            tree: MemoryTree::new(),
            pending: PendingUpdates::new(),
        }
    }

    fn reconcile(&mut self, parent: NodeId, children: &[(&'static str, bool)]) -> ReconcileOutcome {
        let entries: Vec<_> = children
            .iter()
            .map(|&(element, has_children)| ChildEntry::new(element, has_children))
            .collect();
        Reconciler::new(&mut self.registry, &mut self.tree, &self.pending)
            .reconcile(parent, &entries)
            .expect("reconcile")
    }

    fn child_elements(&self, parent: NodeId) -> Vec<Option<&'static str>> {
        self.tree
            .children(parent)
            .unwrap()
            .into_iter()
            .map(|node| self.registry.element_of(node).copied())
            .collect()
    }
}

#[test]
fn initial_children_get_placeholders_where_expandable() {
    let mut fixture = Fixture::new();
    let outcome = fixture.reconcile(0, &[("A", false), ("B", true)]);

    let [a, b] = outcome.slots[..] else {
        panic!("expected two slots");
    };
    assert_eq!(fixture.child_elements(0), vec![Some("A"), Some("B")]);
    assert_eq!(fixture.tree.child_count(a).unwrap(), 0);
    assert_eq!(fixture.tree.child_count(b).unwrap(), 1);
    assert_eq!(fixture.child_elements(b), vec![None]);
    assert_eq!(outcome.stats.created, 3);
}

#[test]
fn positional_diff_remaps_slots_in_place() {
    let mut fixture = Fixture::new();
    let first = fixture.reconcile(0, &[("A", false), ("B", true)]);
    let second = fixture.reconcile(0, &[("B", true), ("C", false)]);

    assert_eq!(first.slots, second.slots, "native nodes are reused");
    assert_eq!(fixture.child_elements(0), vec![Some("B"), Some("C")]);
    assert_eq!(fixture.tree.child_count(0).unwrap(), 2);
    assert!(!fixture.registry.contains(&"A"));
    assert_eq!(fixture.registry.nodes_for(&"B"), vec![second.slots[0]]);
    // slot 0 gained a placeholder, slot 1 lost B's
    assert_eq!(fixture.tree.child_count(second.slots[0]).unwrap(), 1);
    assert_eq!(fixture.tree.child_count(second.slots[1]).unwrap(), 0);
    assert_eq!(second.stats.remapped, 2);
    assert!(fixture.registry.is_consistent());
}

#[test]
fn unchanged_children_cause_no_churn() {
    let mut fixture = Fixture::new();
    let children = [("A", false), ("B", true), ("C", true)];
    fixture.reconcile(0, &children);
    fixture.tree.reset_stats();

    let outcome = fixture.reconcile(0, &children);

    assert!(outcome.stats.is_noop());
    assert!(outcome.disposed.is_empty());
    assert_eq!(fixture.tree.stats().created, 0);
    assert_eq!(fixture.tree.stats().disposed, 0);
}

#[test]
fn shorter_list_disposes_leftovers_recursively() {
    let mut fixture = Fixture::new();
    let outcome = fixture.reconcile(0, &[("A", true), ("B", true), ("C", true)]);
    let c = outcome.slots[2];
    fixture.tree.set_expanded(c, true).unwrap();
    let grandchildren = fixture.reconcile(c, &[("C1", false), ("C2", true)]);

    let outcome = fixture.reconcile(0, &[("A", true)]);

    assert_eq!(fixture.child_elements(0), vec![Some("A")]);
    assert!(fixture.tree.is_disposed(c));
    for node in &grandchildren.slots {
        assert!(fixture.tree.is_disposed(*node));
        assert!(outcome.disposed.contains(node));
    }
    for gone in ["B", "C", "C1", "C2"] {
        assert!(!fixture.registry.contains(&gone), "{gone} still mapped");
    }
    assert!(fixture.registry.is_consistent());
}

#[test]
fn losing_children_removes_expand_affordance() {
    let mut fixture = Fixture::new();
    let outcome = fixture.reconcile(0, &[("A", true)]);
    let a = outcome.slots[0];
    fixture.tree.set_expanded(a, true).unwrap();
    fixture.reconcile(a, &[("A1", false)]);

    let outcome = fixture.reconcile(0, &[("A", false)]);

    assert_eq!(outcome.stats.remapped, 0);
    assert_eq!(fixture.tree.child_count(a).unwrap(), 0);
    assert!(!fixture.tree.is_expanded(a));
    assert!(!fixture.registry.contains(&"A1"));
}

#[test]
fn remapped_slot_starts_collapsed() {
    let mut fixture = Fixture::new();
    let slots = fixture.reconcile(0, &[("A", true), ("B", true)]).slots;
    let (a, b) = (slots[0], slots[1]);
    for node in [a, b] {
        fixture.tree.set_expanded(node, true).unwrap();
    }
    fixture.reconcile(a, &[("A1", false)]);
    fixture.reconcile(b, &[("B1", false)]);

    let outcome = fixture.reconcile(0, &[("C", true), ("D", false)]);

    assert_eq!(outcome.stats.remapped, 2);
    assert!(!fixture.tree.is_expanded(a));
    assert_eq!(fixture.child_elements(a), vec![None], "only a placeholder");
    assert!(!fixture.tree.is_expanded(b));
    assert_eq!(fixture.tree.child_count(b).unwrap(), 0);
    assert!(!fixture.registry.contains(&"A1"));
    assert!(!fixture.registry.contains(&"B1"));
}

#[test]
fn placeholder_is_replaced_by_the_first_real_child() {
    let mut fixture = Fixture::new();
    let a = fixture.reconcile(0, &[("A", true)]).slots[0];
    let placeholder = fixture.tree.children(a).unwrap()[0];

    let outcome = fixture.reconcile(a, &[("A1", false), ("A2", false)]);

    assert_eq!(outcome.slots[0], placeholder);
    assert_eq!(fixture.child_elements(a), vec![Some("A1"), Some("A2")]);
}

#[test]
fn empty_result_removes_the_placeholder() {
    let mut fixture = Fixture::new();
    let a = fixture.reconcile(0, &[("A", true)]).slots[0];

    let outcome = fixture.reconcile(a, &[]);

    assert_eq!(outcome.stats.disposed, 1);
    assert_eq!(fixture.tree.child_count(a).unwrap(), 0);
}

#[test]
fn remapping_cancels_updates_aimed_at_the_old_element() {
    let mut fixture = Fixture::new();
    let a = fixture.reconcile(0, &[("A", false), ("B", false)]).slots[0];
    let stale = Arc::new(UpdateState::new(UpdateKind::Label, vec![0, a]));
    let unrelated = Arc::new(UpdateState::new(UpdateKind::Label, vec![0, a + 1]));
    fixture.pending.schedule(Arc::clone(&stale));
    fixture.pending.schedule(Arc::clone(&unrelated));

    fixture.reconcile(0, &[("Z", false), ("B", false)]);

    assert!(stale.is_canceled());
    assert!(!unrelated.is_canceled());
}

#[test]
fn duplicate_elements_get_one_node_each() {
    let mut fixture = Fixture::new();
    let outcome = fixture.reconcile(0, &[("dup", false), ("dup", false)]);
    assert_eq!(fixture.registry.nodes_for(&"dup"), outcome.slots);
    assert_eq!(fixture.registry.len(), 2, "root and dup");
}
