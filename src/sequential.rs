//! Unsynchronized ordered lists.
//!
//! These define what every concurrent variant has to look like from the
//! outside, and are what [`History`](crate::History) replays against.

use core::fmt;

type Link = Option<Box<Node>>;

struct Node {
    elem: i32,
    next: Link,
}

/// Ordered singly-linked list. Each node is owned by its predecessor's link.
#[derive(Default)]
struct OrderedList {
    head: Link,
    len: usize,
}

impl OrderedList {
    /// The link holding the first node whose element is `>= elem`.
    fn seek(&mut self, elem: i32) -> &mut Link {
        let mut link = &mut self.head;

        while link.as_ref().map_or(false, |node| node.elem < elem) {
            // the loop condition just saw a node here
            link = match link {
                Some(node) => &mut node.next,
                None => unreachable!(),
            };
        }

        link
    }

    fn first_at_least(&self, elem: i32) -> Option<&Node> {
        self.iter_nodes().find(|node| node.elem >= elem)
    }

    fn insert(&mut self, elem: i32, unique: bool) -> bool {
        let link = self.seek(elem);

        if unique && link.as_ref().map_or(false, |node| node.elem == elem) {
            return false;
        }

        let next = link.take();
        *link = Some(Box::new(Node { elem, next }));
        self.len += 1;
        true
    }

    fn remove(&mut self, elem: i32) -> bool {
        let link = self.seek(elem);

        match link.take() {
            Some(node) if node.elem == elem => {
                *link = node.next;
                self.len -= 1;
                true
            }
            other => {
                *link = other;
                false
            }
        }
    }

    fn count(&self, elem: i32) -> usize {
        self.iter_nodes()
            .skip_while(|node| node.elem < elem)
            .take_while(|node| node.elem == elem)
            .count()
    }

    fn iter_nodes(&self) -> impl Iterator<Item = &Node> {
        let mut next = self.head.as_deref();
        core::iter::from_fn(move || {
            let node = next?;
            next = node.next.as_deref();
            Some(node)
        })
    }
}

impl Drop for OrderedList {
    fn drop(&mut self) {
        let mut curr = self.head.take();

        while let Some(mut node) = curr {
            curr = node.next.take();
        }
    }
}

/// Sequential set of `i32`.
#[derive(Default)]
pub struct SequentialSet {
    list: OrderedList,
}

impl SequentialSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `elem`; `false` if it was already present.
    pub fn add(&mut self, elem: i32) -> bool {
        self.list.insert(elem, true)
    }

    /// Removes `elem`; `false` if it was absent.
    pub fn remove(&mut self, elem: i32) -> bool {
        self.list.remove(elem)
    }

    pub fn contains(&self, elem: i32) -> bool {
        self.list
            .first_at_least(elem)
            .map_or(false, |node| node.elem == elem)
    }

    pub fn len(&self) -> usize {
        self.list.len
    }

    pub fn is_empty(&self) -> bool {
        self.list.len == 0
    }

    /// Elements in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.list.iter_nodes().map(|node| node.elem)
    }
}

impl fmt::Debug for SequentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Sequential multiset of `i32`; equal elements sit next to each other.
#[derive(Default)]
pub struct SequentialMultiset {
    list: OrderedList,
}

impl SequentialMultiset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts one more `elem`. Always succeeds.
    pub fn add(&mut self, elem: i32) -> bool {
        self.list.insert(elem, false)
    }

    /// Removes one occurrence of `elem`; `false` if there was none.
    pub fn remove(&mut self, elem: i32) -> bool {
        self.list.remove(elem)
    }

    pub fn count(&self, elem: i32) -> usize {
        self.list.count(elem)
    }

    pub fn len(&self) -> usize {
        self.list.len
    }

    pub fn is_empty(&self) -> bool {
        self.list.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.list.iter_nodes().map(|node| node.elem)
    }
}

impl fmt::Debug for SequentialMultiset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_scenario() {
        let mut set = SequentialSet::new();

        assert!(set.add(5));
        assert!(set.add(3));
        assert!(!set.add(5));
        assert!(set.contains(3));
        assert!(set.remove(3));
        assert!(!set.contains(3));
        assert!(!set.remove(3));
    }

    #[test]
    fn test_ordered_and_unique() {
        let mut set = SequentialSet::new();

        for elem in [7, -2, 9, 7, i32::MIN, i32::MAX, 0, -2] {
            set.add(elem);
        }

        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![i32::MIN, -2, 0, 7, 9, i32::MAX]
        );
        assert_eq!(set.len(), 6);
        assert_eq!(format!("{:?}", set), format!("{:?}", set.iter().collect::<std::collections::BTreeSet<_>>()));
    }

    #[test]
    fn test_multiset_counts() {
        let mut multiset = SequentialMultiset::new();

        for elem in [4, 1, 4, 4, 2] {
            assert!(multiset.add(elem));
        }

        assert_eq!(multiset.count(4), 3);
        assert_eq!(multiset.count(3), 0);
        assert!(multiset.remove(4));
        assert_eq!(multiset.count(4), 2);
        assert!(!multiset.remove(3));
        assert_eq!(multiset.iter().collect::<Vec<_>>(), vec![1, 2, 4, 4]);
    }

    #[test]
    fn test_long_list_drops() {
        let mut set = SequentialSet::new();

        // descending inserts keep every insert at the head
        for elem in (0..200_000).rev() {
            set.add(elem);
        }

        assert_eq!(set.len(), 200_000);
    }
}
