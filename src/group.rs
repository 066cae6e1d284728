//! Named, flattened body groups.
//!
//! A group is an ordered list of body ids under a short name. Nesting a group
//! copies the child's current members into the parent, so a group never
//! refers to another group and lookups stay a flat scan.

use crate::body::BodyId;

/// Longest group name accepted, in bytes.
pub const MAX_GROUP_NAME: usize = 32;

/// An ordered, duplicate-free set of bodies under a name.
#[derive(Debug, Clone, PartialEq)]
pub struct Group<const N: usize> {
    name: heapless::String<MAX_GROUP_NAME>,
    members: heapless::Vec<BodyId, N>,
}

impl<const N: usize> Group<N> {
    /// Returns `None` if `name` is longer than [`MAX_GROUP_NAME`].
    fn new(name: &str) -> Option<Self> {
        let mut stored = heapless::String::new();
        stored.push_str(name).ok()?;
        Some(Self {
            name: stored,
            members: heapless::Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in insertion order.
    pub fn members(&self) -> &[BodyId] {
        &self.members
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Add `id` unless already present. Returns `false` only when full.
    fn insert(&mut self, id: BodyId) -> bool {
        self.contains(id) || self.members.push(id).is_ok()
    }
}

/// Fixed-capacity table of up to `G` groups over up to `N` bodies.
#[derive(Debug, Clone)]
pub(crate) struct GroupIndex<const N: usize, const G: usize> {
    groups: heapless::Vec<Group<N>, G>,
}

impl<const N: usize, const G: usize> GroupIndex<N, G> {
    pub(crate) fn new() -> Self {
        Self {
            groups: heapless::Vec::new(),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Group<N>> {
        self.groups.iter().find(|g| g.name() == name)
    }

    pub(crate) fn len(&self) -> usize {
        self.groups.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Group<N>> {
        self.groups.iter()
    }

    fn get_or_create(&mut self, name: &str) -> Option<&mut Group<N>> {
        let index = match self.groups.iter().position(|g| g.name() == name) {
            Some(index) => index,
            None => {
                self.groups.push(Group::new(name)?).ok()?;
                self.groups.len() - 1
            }
        };
        self.groups.get_mut(index)
    }

    /// Append `ids` to the named group, creating it if needed.
    ///
    /// Returns `None` when the group table or the group is full; ids added
    /// before running out of room stay in the group.
    pub(crate) fn extend(&mut self, name: &str, ids: impl IntoIterator<Item = BodyId>) -> Option<()> {
        let group = self.get_or_create(name)?;
        for id in ids {
            if !group.insert(id) {
                return None;
            }
        }
        Some(())
    }

    /// Copy the current members of `child` into `parent`.
    pub(crate) fn nest(&mut self, parent: &str, child: &str) -> Option<()> {
        let members = self.get(child)?.members.clone();
        self.extend(parent, members)
    }
}
