use super::pcb::Pcb;

/// Handle to a PCB slot. Ready structures and the running slot hold these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PcbRef(usize);

/// Slab of live control blocks owned by the scheduler.
#[derive(Debug, Default)]
pub struct PcbTable {
    slots: Vec<Option<Pcb>>,
    free: Vec<usize>,
}

impl PcbTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pcb: Pcb) -> PcbRef {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(pcb);
                PcbRef(slot)
            }
            None => {
                self.slots.push(Some(pcb));
                PcbRef(self.slots.len() - 1)
            }
        }
    }

    pub fn remove(&mut self, pcb: PcbRef) -> Option<Pcb> {
        let taken = self.slots.get_mut(pcb.0)?.take();
        if taken.is_some() {
            self.free.push(pcb.0);
        }
        taken
    }

    pub fn get(&self, pcb: PcbRef) -> Option<&Pcb> {
        self.slots.get(pcb.0)?.as_ref()
    }

    pub fn get_mut(&mut self, pcb: PcbRef) -> Option<&mut Pcb> {
        self.slots.get_mut(pcb.0)?.as_mut()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pcb> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::BuddyAllocator;
    use crate::process::ProcessId;
    use crate::workload::ProcessSpec;

    fn pcb(id: u32) -> Pcb {
        let mut buddy = BuddyAllocator::new(64).unwrap();
        let block = buddy.allocate(4).unwrap();
        Pcb::admit(&ProcessSpec::new(id, 0, 3, 1, 4), block)
    }

    #[test]
    fn test_slots_are_reused() {
        let mut table = PcbTable::new();
        let a = table.insert(pcb(1));
        let b = table.insert(pcb(2));
        assert_eq!(table.len(), 2);

        assert_eq!(table.remove(a).map(|p| p.id), Some(ProcessId(1)));
        assert!(table.get(a).is_none());
        assert!(table.remove(a).is_none());

        let c = table.insert(pcb(3));
        assert_eq!(c, a);
        assert_eq!(table.get(c).map(|p| p.id), Some(ProcessId(3)));
        assert_eq!(table.get(b).map(|p| p.id), Some(ProcessId(2)));
        assert_eq!(table.iter().count(), 2);
    }
}
