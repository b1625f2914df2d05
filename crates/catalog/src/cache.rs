use encore_core::Entity;

/// View-owned list of remote entities, kept in the order the remote sent them.
///
/// Entries are only ever replaced wholesale with values the remote returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityCache<E> {
    entries: Vec<E>,
}

impl<E: Entity> EntityCache<E> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Builds a cache from a fetched list. Later duplicates of an id win.
    pub fn from_entities(entities: impl IntoIterator<Item = E>) -> Self {
        let mut cache = Self::new();
        for entity in entities {
            cache.insert(entity);
        }
        cache
    }

    /// Swaps in a freshly fetched list, returning the previous contents.
    pub fn replace(&mut self, entities: impl IntoIterator<Item = E>) -> Vec<E> {
        let fresh = Self::from_entities(entities);
        std::mem::replace(&mut self.entries, fresh.entries)
    }

    /// Inserts or overwrites the entry with the same id.
    pub fn insert(&mut self, entity: E) -> Option<E> {
        match self.position(entity.id()) {
            Some(index) => Some(std::mem::replace(&mut self.entries[index], entity)),
            None => {
                self.entries.push(entity);
                None
            }
        }
    }

    pub fn remove(&mut self, id: E::Id) -> Option<E> {
        self.position(id).map(|index| self.entries.remove(index))
    }

    pub fn get(&self, id: E::Id) -> Option<&E> {
        self.entries.iter().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: E::Id) -> bool {
        self.position(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: E::Id) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }
}

impl<E: Entity> Default for EntityCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> FromIterator<E> for EntityCache<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self::from_entities(iter)
    }
}
