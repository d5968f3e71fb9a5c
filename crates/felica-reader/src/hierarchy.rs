//! Area containment tree with service groups attached.
//!
//! Parents are found with a pairwise scan, which is fine for the few dozen
//! areas a card carries. Ties between equally specific candidates go to the
//! smaller span, then the lower start, then the lower end.

use felica_core::{Area, ServiceGroup};

/// One area of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaNode {
    pub area: Area,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub groups: Vec<ServiceGroup>,
}

/// Containment forest over the discovered areas.
///
/// Nodes are stored in discovery order and refer to each other by index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaHierarchy {
    nodes: Vec<AreaNode>,
    roots: Vec<usize>,
    unassigned: Vec<ServiceGroup>,
}

fn most_specific<'a>(candidates: impl Iterator<Item = (usize, &'a Area)>) -> Option<usize> {
    candidates
        .min_by_key(|(_, area)| area.specificity())
        .map(|(index, _)| index)
}

impl AreaHierarchy {
    /// Build the forest and attach each group to the most specific area
    /// containing its lowest member.
    ///
    /// # Examples
    ///
    /// ```
    /// use felica_core::Area;
    /// use felica_reader::AreaHierarchy;
    ///
    /// let areas = [Area::new(0x0000, 0x00FF), Area::new(0x0010, 0x0020)];
    /// let tree = AreaHierarchy::build(&areas, &[]);
    ///
    /// assert_eq!(tree.roots(), &[0]);
    /// assert_eq!(tree.node(1).unwrap().parent, Some(0));
    /// ```
    pub fn build(areas: &[Area], groups: &[ServiceGroup]) -> Self {
        let mut nodes: Vec<AreaNode> = areas
            .iter()
            .map(|&area| AreaNode {
                area,
                parent: None,
                children: Vec::new(),
                groups: Vec::new(),
            })
            .collect();

        let mut roots = Vec::new();
        for (index, area) in areas.iter().enumerate() {
            let parent = most_specific(
                areas
                    .iter()
                    .enumerate()
                    .filter(|(other, candidate)| {
                        *other != index && candidate.properly_contains(area)
                    }),
            );
            nodes[index].parent = parent;
            match parent {
                Some(parent) => nodes[parent].children.push(index),
                None => roots.push(index),
            }
        }

        let mut unassigned = Vec::new();
        for group in groups {
            let code = group.primary().as_u16();
            let owner = most_specific(
                areas
                    .iter()
                    .enumerate()
                    .filter(|(_, area)| area.contains_code(code)),
            );
            match owner {
                Some(index) => nodes[index].groups.push(group.clone()),
                None => unassigned.push(group.clone()),
            }
        }

        Self {
            nodes,
            roots,
            unassigned,
        }
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn node(&self, index: usize) -> Option<&AreaNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[AreaNode] {
        &self.nodes
    }

    /// Groups that fall in no area.
    pub fn unassigned(&self) -> &[ServiceGroup] {
        &self.unassigned
    }

    /// Depth-first walk from the roots, yielding `(depth, node)`.
    pub fn walk(&self) -> Vec<(usize, &AreaNode)> {
        let mut visited = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, usize)> = self.roots.iter().rev().map(|&i| (0, i)).collect();

        while let Some((depth, index)) = stack.pop() {
            let node = &self.nodes[index];
            visited.push((depth, node));
            stack.extend(node.children.iter().rev().map(|&child| (depth + 1, child)));
        }

        visited
    }
}
