//! Labels and their address instances.
//!
//! A label declared inside a `#repeat` body exists once per iteration. Each
//! label therefore keeps a vector of address slots and two cursors into it:
//! the write cursor is where the next resolved address goes, the read cursor
//! is what expressions referencing the label currently see.

use crate::types::{AssemblerError, Result, SourceLocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(pub(crate) usize);

#[derive(Debug, Clone)]
pub struct Label {
    name: String,
    location: SourceLocation,
    instances: Vec<Option<u64>>,
    write: usize,
    read: usize,
    saved_reads: Vec<usize>,
}

impl Label {
    pub fn new(name: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            location,
            instances: Vec::new(),
            write: 0,
            read: 0,
            saved_reads: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Address seen through the read cursor.
    pub fn address(&self) -> Option<u64> {
        self.instances.get(self.read).copied().flatten()
    }

    pub fn has_address(&self) -> bool {
        self.address().is_some()
    }

    /// All instances in iteration order. Unassigned slots are `None`.
    pub fn instances(&self) -> &[Option<u64>] {
        &self.instances
    }

    /// Stores `address` in the slot under the write cursor. Storing the same
    /// address again is accepted so a resolved section can be walked twice.
    pub fn set_address(&mut self, address: u64) -> Result<()> {
        if self.instances.len() <= self.write {
            self.instances.resize(self.write + 1, None);
        }
        match self.instances[self.write] {
            Some(existing) if existing != address => Err(AssemblerError::internal(
                Some(&self.location),
                format!(
                    "attempted to change address of resolved label \"{}\" (0x{:x} != 0x{:x}).",
                    self.name, existing, address
                ),
            )),
            _ => {
                self.instances[self.write] = Some(address);
                Ok(())
            }
        }
    }

    pub fn unset_addresses(&mut self) {
        self.instances.clear();
    }

    pub fn reset_counters(&mut self) {
        self.write = 0;
        self.read = 0;
        self.saved_reads.clear();
    }

    /// Moves to the next iteration's slot. Slots are allocated lazily by
    /// `set_address`, so the first pass through a loop grows the vector and
    /// later passes reuse it.
    pub fn advance_counters(&mut self) {
        self.write += 1;
        self.read = self.write;
    }

    /// Catches the read cursor up with the write cursor without moving to a
    /// new slot. Used by enclosing loops for labels of nested loops, whose
    /// write cursor is moved by the nested loop itself.
    pub fn sync_read_counter(&mut self) {
        self.read = self.write;
    }

    pub fn save_read_counter(&mut self) {
        self.saved_reads.push(self.read);
    }

    pub fn restore_read_counter(&mut self) -> Result<()> {
        match self.saved_reads.pop() {
            Some(read) => {
                self.read = read;
                Ok(())
            }
            None => Err(AssemblerError::internal(
                Some(&self.location),
                "read counter stack is empty.",
            )),
        }
    }
}

/// Owner of every label of a program, addressed by [`LabelId`].
#[derive(Debug, Clone, Default)]
pub struct LabelArena {
    labels: Vec<Label>,
}

impl LabelArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, label: Label) -> LabelId {
        self.labels.push(label);
        LabelId(self.labels.len() - 1)
    }

    pub fn get(&self, id: LabelId) -> &Label {
        &self.labels[id.0]
    }

    pub fn get_mut(&mut self, id: LabelId) -> &mut Label {
        &mut self.labels[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (LabelId, &Label)> {
        self.labels.iter().enumerate().map(|(i, l)| (LabelId(i), l))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Rewinds every label to its first instance. Each section walk starts
    /// here, so cursors left behind by another section never leak into it.
    pub fn reset_counters(&mut self) {
        self.labels.iter_mut().for_each(Label::reset_counters);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label() -> Label {
        Label::new("loop", SourceLocation::new("test", 1))
    }

    #[test]
    fn single_instance() {
        let mut l = label();
        assert!(!l.has_address());
        l.set_address(0x8000).unwrap();
        assert_eq!(l.address(), Some(0x8000));
        l.unset_addresses();
        assert!(!l.has_address());
    }

    #[test]
    fn setting_same_address_twice_is_accepted() {
        let mut l = label();
        l.set_address(0x10).unwrap();
        l.set_address(0x10).unwrap();
        assert!(l.set_address(0x11).is_err());
    }

    #[test]
    fn one_instance_per_iteration() {
        let mut l = label();
        l.save_read_counter();
        for i in 0..3 {
            l.set_address(0x100 + i).unwrap();
            assert_eq!(l.address(), Some(0x100 + i));
            l.advance_counters();
        }
        l.restore_read_counter().unwrap();
        assert_eq!(l.address(), Some(0x100));
        assert_eq!(l.instances(), &[Some(0x100), Some(0x101), Some(0x102)]);
    }

    #[test]
    fn second_pass_reuses_slots() {
        let mut l = label();
        for i in 0..2 {
            l.set_address(i).unwrap();
            l.advance_counters();
        }
        l.reset_counters();
        for i in 0..2 {
            l.set_address(i).unwrap();
            l.advance_counters();
        }
        assert_eq!(l.instances().len(), 2);
    }

    #[test]
    fn restore_without_save_fails() {
        let mut l = label();
        let err = l.restore_read_counter().unwrap_err();
        assert!(err.to_string().contains("read counter stack is empty"));
    }
}
