use std::{collections::HashMap, fmt, rc::Rc};

/// Size in bytes of a machine word. Every local occupies exactly one.
pub const WORD_SIZE: u32 = 8;

/// A local variable slot, as a byte distance below the frame base.
///
/// Offsets are only handed out by [`Locals::resolve`], so every offset found
/// in a tree refers to a slot of the table that produced it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Offset(u32);

impl Offset {
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The variable table of a routine.
///
/// Names are implicitly declared by their first use: the first time a name is
/// resolved it gets the next free word, and every later resolution of the
/// same name returns that same slot.
#[derive(Default)]
pub struct Locals {
    map: HashMap<Rc<str>, Offset>,
    vec: Vec<Rc<str>>,
}

impl fmt::Debug for Locals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, offset) in self.iter() {
            map.entry(&name, &offset.get());
        }
        map.finish()
    }
}

impl PartialEq for Locals {
    fn eq(&self, other: &Self) -> bool {
        self.vec == other.vec
    }
}

impl Eq for Locals {}

impl Locals {
    pub fn with_capacity(capacity: usize) -> Self {
        Locals {
            map: HashMap::with_capacity(capacity),
            vec: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty() && self.vec.is_empty()
    }

    /// Returns the slot of `name`, allocating the next one if the name has
    /// never been seen.
    pub fn resolve(&mut self, name: &str) -> Offset {
        if let Some(offset) = self.map.get(name) {
            return *offset;
        }
        let key: Rc<str> = Rc::from(name);
        let offset = Self::offset_of_index(self.vec.len());
        self.vec.push(Rc::clone(&key));
        self.map.insert(key, offset);
        offset
    }

    /// Returns the name that owns `offset`.
    pub fn name_of(&self, offset: Offset) -> Option<&str> {
        if offset.0 % WORD_SIZE != 0 {
            return None;
        }
        let index = (offset.0 / WORD_SIZE).checked_sub(1)?;
        self.vec.get(index as usize).map(|name| &**name)
    }

    /// Whether `offset` was handed out by this table.
    pub fn contains(&self, offset: Offset) -> bool {
        self.name_of(offset).is_some()
    }

    /// Iterates over the names in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Offset)> + '_ {
        self.vec
            .iter()
            .enumerate()
            .map(|(i, name)| (&**name, Self::offset_of_index(i)))
    }

    /// Bytes needed to hold every local, not yet aligned.
    pub fn size(&self) -> u32 {
        Self::offset_of_index(self.vec.len()).0 - WORD_SIZE
    }

    fn offset_of_index(index: usize) -> Offset {
        let index = u32::try_from(index).expect("locals out of capacity");
        Offset((index + 1) * WORD_SIZE)
    }
}
