//! Identifier allocation for one build session
//!
//! Each entity class draws from its own monotonic counter. The allocator is an
//! ordinary value owned by a [`CourseBuilder`](crate::CourseBuilder) and passed
//! explicitly to whatever needs fresh ids, so two builds in the same process
//! never share numbering.

/// Entity classes with independent id sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdClass {
    Section,
    Activity,
    File,
    Question,
    Answer,
}

impl IdClass {
    const COUNT: usize = 5;

    fn index(self) -> usize {
        match self {
            IdClass::Section => 0,
            IdClass::Activity => 1,
            IdClass::File => 2,
            IdClass::Question => 3,
            IdClass::Answer => 4,
        }
    }
}

/// Monotonic per-class id allocator. All sequences start at 1.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: [u64; IdClass::COUNT],
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next: [1; IdClass::COUNT],
        }
    }

    /// Issue the next id for `class`
    pub fn allocate(&mut self, class: IdClass) -> u64 {
        let slot = &mut self.next[class.index()];
        let id = *slot;
        *slot += 1;
        id
    }

    /// Peek at the id the next `allocate(class)` call will return
    pub fn peek(&self, class: IdClass) -> u64 {
        self.next[class.index()]
    }

    /// Number of ids issued so far for `class`
    pub fn issued(&self, class: IdClass) -> u64 {
        self.next[class.index()] - 1
    }
}
