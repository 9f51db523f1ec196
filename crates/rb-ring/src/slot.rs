//! A single buffer position.

/// Occupancy is carried by the variant, so every `T` (including `Option`
/// or zero-sized values) can be stored without being mistaken for empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Slot<T> {
    Empty,
    Occupied(T),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Empty
    }
}

impl<T> Slot<T> {
    pub(crate) fn is_occupied(&self) -> bool {
        matches!(self, Slot::Occupied(_))
    }

    /// Store `value`, returning whatever was there.
    pub(crate) fn replace(&mut self, value: T) -> Option<T> {
        match std::mem::replace(self, Slot::Occupied(value)) {
            Slot::Occupied(old) => Some(old),
            Slot::Empty => None,
        }
    }

    pub(crate) fn take(&mut self) -> Option<T> {
        match std::mem::take(self) {
            Slot::Occupied(value) => Some(value),
            Slot::Empty => None,
        }
    }

    pub(crate) fn as_ref(&self) -> Option<&T> {
        match self {
            Slot::Occupied(value) => Some(value),
            Slot::Empty => None,
        }
    }
}
