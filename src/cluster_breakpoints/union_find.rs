use std::collections::BTreeMap;

struct Component {
    members: Vec<usize>,
    max_index: usize,
}

/// Union-find over record indices which supports removing completed components
///
/// Each component root is the lowest record index in the component.
///
#[derive(Default)]
pub struct StreamingUnionFind {
    parent: BTreeMap<usize, usize>,
    components: BTreeMap<usize, Component>,
}

impl StreamingUnionFind {
    pub fn insert(&mut self, index: usize) {
        self.parent.insert(index, index);
        self.components.insert(
            index,
            Component {
                members: vec![index],
                max_index: index,
            },
        );
    }

    /// Root of the component containing `index`, which must still be present
    pub fn find(&mut self, index: usize) -> usize {
        let mut root = index;
        while let Some(&p) = self.parent.get(&root) {
            if p == root {
                break;
            }
            root = p;
        }

        // Path compression
        let mut node = index;
        while node != root {
            let next = self.parent[&node];
            self.parent.insert(node, root);
            node = next;
        }
        root
    }

    pub fn union(&mut self, index1: usize, index2: usize) {
        let root1 = self.find(index1);
        let root2 = self.find(index2);
        if root1 == root2 {
            return;
        }
        let (root, child) = if root1 < root2 {
            (root1, root2)
        } else {
            (root2, root1)
        };
        self.parent.insert(child, root);
        if let Some(child_component) = self.components.remove(&child) {
            if let Some(component) = self.components.get_mut(&root) {
                component.members.extend(child_component.members);
                component.max_index =
                    std::cmp::max(component.max_index, child_component.max_index);
            }
        }
    }

    /// Remove and return every component whose members all have an index below `min_open_index`
    ///
    /// Components are returned in root order, and members of each component in index order.
    ///
    pub fn take_complete(&mut self, min_open_index: usize) -> Vec<(usize, Vec<usize>)> {
        let complete_roots = self
            .components
            .iter()
            .filter(|(_, c)| c.max_index < min_open_index)
            .map(|(&root, _)| root)
            .collect::<Vec<_>>();

        let mut complete = Vec::new();
        for root in complete_roots {
            if let Some(mut component) = self.components.remove(&root) {
                component.members.sort_unstable();
                for member in component.members.iter() {
                    self.parent.remove(member);
                }
                complete.push((root, component.members));
            }
        }
        complete
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_find_roots() {
        let mut uf = StreamingUnionFind::default();
        for i in 0..5 {
            uf.insert(i);
        }
        uf.union(3, 4);
        uf.union(4, 1);
        assert_eq!(uf.find(3), 1);
        assert_eq!(uf.find(4), 1);
        assert_eq!(uf.find(0), 0);
    }

    #[test]
    fn test_take_complete() {
        let mut uf = StreamingUnionFind::default();
        for i in 0..5 {
            uf.insert(i);
        }
        uf.union(0, 3);
        uf.union(1, 2);

        // Component {0,3} is still open at index 3
        let complete = uf.take_complete(3);
        assert_eq!(complete, vec![(1, vec![1, 2])]);

        let complete = uf.take_complete(5);
        assert_eq!(complete, vec![(0, vec![0, 3]), (4, vec![4])]);
        assert!(uf.is_empty());
    }
}
