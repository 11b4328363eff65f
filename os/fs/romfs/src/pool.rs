//! Fixed-capacity handle pools.
//!
//! A pool is an array of optional slots; a handle is the index of an
//! occupied slot and stays valid until the slot is released.

use crate::RomFsError;

/// `N` slots of `T`, allocated lowest index first.
#[derive(Debug)]
pub struct HandlePool<T, const N: usize> {
    slots: [Option<T>; N],
}

impl<T, const N: usize> Default for HandlePool<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> HandlePool<T, N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [const { None }; N],
        }
    }

    /// Stores `value` in the first free slot and returns its index.
    ///
    /// # Errors
    /// [`RomFsError::NoHandles`] if every slot is taken.
    pub fn insert(&mut self, value: T) -> Result<usize, RomFsError> {
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_none())
            .ok_or(RomFsError::NoHandles)?;
        *slot = Some(value);
        Ok(index)
    }

    /// # Errors
    /// [`RomFsError::BadHandle`] if `index` is out of range or free.
    pub fn get(&self, index: usize) -> Result<&T, RomFsError> {
        self.slots
            .get(index)
            .and_then(Option::as_ref)
            .ok_or(RomFsError::BadHandle)
    }

    /// # Errors
    /// [`RomFsError::BadHandle`] if `index` is out of range or free.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut T, RomFsError> {
        self.slots
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or(RomFsError::BadHandle)
    }

    /// Releases the slot and hands back its value.
    ///
    /// # Errors
    /// [`RomFsError::BadHandle`] if `index` is out of range or free.
    pub fn remove(&mut self, index: usize) -> Result<T, RomFsError> {
        self.slots
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(RomFsError::BadHandle)
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }
}
