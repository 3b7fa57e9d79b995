//! Typed indices and the arena that owns IR objects.
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// A copyable handle into an [IndexedMap].
pub trait IndexRef: Copy + Eq + std::hash::Hash + Ord {
    fn index(&self) -> usize;
    fn new(input: usize) -> Self;
}

#[macro_export]
/// Implements [IndexRef](crate::IndexRef) for a newtype over an unsigned
/// integer. The backing type defaults to [`u32`].
macro_rules! impl_index {
    ($struct_name: ident) => {
        $crate::impl_index!($struct_name, u32);
    };

    ($struct_name: ident, $backing_ty: ty) => {
        impl $crate::IndexRef for $struct_name {
            fn index(&self) -> usize {
                self.0 as usize
            }

            fn new(input: usize) -> Self {
                Self(input as $backing_ty)
            }
        }

        impl From<usize> for $struct_name {
            fn from(input: usize) -> Self {
                $crate::IndexRef::new(input)
            }
        }

        impl std::fmt::Display for $struct_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", stringify!($struct_name), self.0)
            }
        }
    };
}

/// An append-only arena. Objects are never removed; owners drop their
/// handles instead.
#[derive(Debug, Clone)]
pub struct IndexedMap<K, D>
where
    K: IndexRef,
{
    data: Vec<D>,
    phantom: PhantomData<K>,
}

impl<K, D> IndexedMap<K, D>
where
    K: IndexRef,
{
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            phantom: PhantomData,
        }
    }

    pub fn push(&mut self, item: D) -> K {
        self.data.push(item);
        K::new(self.data.len() - 1)
    }

    pub fn get(&self, index: K) -> Option<&D> {
        self.data.get(index.index())
    }

    pub fn get_mut(&mut self, index: K) -> Option<&mut D> {
        self.data.get_mut(index.index())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The key the next [push](Self::push) will return.
    pub fn peek_next_idx(&self) -> K {
        K::new(self.data.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &D)> {
        self.data.iter().enumerate().map(|(i, v)| (K::new(i), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = K> {
        (0..self.data.len()).map(K::new)
    }

    pub fn values(&self) -> impl Iterator<Item = &D> {
        self.data.iter()
    }
}

impl<K: IndexRef, D> Default for IndexedMap<K, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, D> Index<K> for IndexedMap<K, D>
where
    K: IndexRef,
{
    type Output = D;

    fn index(&self, index: K) -> &Self::Output {
        &self.data[index.index()]
    }
}

impl<K, D> IndexMut<K> for IndexedMap<K, D>
where
    K: IndexRef,
{
    fn index_mut(&mut self, index: K) -> &mut Self::Output {
        &mut self.data[index.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    struct Handle(u32);
    impl_index!(Handle);

    #[test]
    fn push_and_lookup() {
        let mut map: IndexedMap<Handle, &str> = IndexedMap::new();
        assert_eq!(map.peek_next_idx(), Handle(0));
        let a = map.push("a");
        let b = map.push("b");
        assert_eq!(map[a], "a");
        assert_eq!(map[b], "b");
        assert_eq!(map.keys().collect::<Vec<_>>(), vec![a, b]);
        assert!(map.get(Handle(7)).is_none());
        assert_eq!(format!("{b}"), "Handle#1");
    }
}
