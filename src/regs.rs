// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

//! PDO entries a device reads or writes, and where the master put them.

use crate::master::BusMaster;
use crate::types::*;
use derive_new::new;

/// Index of a registration inside its [PdoEntryRegs].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegHandle(usize);

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct PdoEntryReg {
    pub slave: SlavePos,
    pub entry: PdoEntryIdx,
    pub bit_len: u8,
    #[new(default)]
    offset: Option<Offset>,
}

impl PdoEntryReg {
    /// Set once the master has configured the slave.
    pub fn offset(&self) -> Option<Offset> {
        self.offset
    }

    fn bit_range(&self) -> Option<(usize, usize)> {
        self.offset.map(|o| {
            let start = o.byte * 8 + o.bit as usize;
            (start, start + self.bit_len as usize)
        })
    }
}

#[derive(Debug)]
pub struct PdoEntryRegs {
    device: String,
    max: usize,
    regs: Vec<PdoEntryReg>,
}

impl PdoEntryRegs {
    pub fn new(device: impl Into<String>, max: usize) -> Self {
        Self {
            device: device.into(),
            max,
            regs: Vec::with_capacity(max),
        }
    }

    pub fn len(&self) -> usize {
        self.regs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max
    }

    pub fn register(
        &mut self,
        slave: SlavePos,
        entry: PdoEntryIdx,
        bit_len: u8,
    ) -> Result<RegHandle> {
        if self.regs.len() >= self.max {
            log::error!(
                "PDO entry registration of {} failed for slave {}, full with {} of {} entries used",
                entry,
                self.device,
                self.regs.len(),
                self.max
            );
            return Err(Error::RegsFull {
                device: self.device.clone(),
                used: self.regs.len(),
                max: self.max,
            });
        }
        self.regs.push(PdoEntryReg::new(slave, entry, bit_len));
        Ok(RegHandle(self.regs.len() - 1))
    }

    /// Moves all of `other` to the end; fails without moving anything if it does not fit.
    ///
    /// Returns the handle of `other`'s first entry, see [RegHandle::rebase].
    pub fn append(&mut self, other: PdoEntryRegs) -> Result<RegHandle> {
        let start = self.regs.len();
        if start + other.regs.len() > self.max {
            log::error!(
                "cannot add {} PDO entry registrations to slave {}, {} of {} entries used",
                other.regs.len(),
                self.device,
                start,
                self.max
            );
            return Err(Error::RegsFull {
                device: self.device.clone(),
                used: start,
                max: self.max,
            });
        }
        self.regs.extend(other.regs);
        Ok(RegHandle(start))
    }

    pub fn get(&self, h: RegHandle) -> Option<&PdoEntryReg> {
        self.regs.get(h.0)
    }

    pub fn offset(&self, h: RegHandle) -> Option<Offset> {
        self.regs.get(h.0).and_then(|r| r.offset)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PdoEntryReg> {
        self.regs.iter()
    }

    /// Asks the master for every entry's offset, then checks that no two overlap.
    pub fn resolve(&mut self, master: &mut dyn BusMaster) -> Result<()> {
        let device = &self.device;
        for reg in &mut self.regs {
            let offset = master.register_pdo_entry(reg.slave, reg.entry).map_err(|e| {
                log::error!(
                    "failed to register PDO entry {} of slave {}: {}",
                    reg.entry,
                    device,
                    e
                );
                e
            })?;
            reg.offset = Some(offset);
        }
        check_overlap(self.regs.iter())
    }
}

impl RegHandle {
    /// Handle after the list it belongs to was appended at `start`.
    pub fn rebase(self, start: RegHandle) -> RegHandle {
        RegHandle(start.0 + self.0)
    }
}

/// Fails if the bit ranges of any two resolved registrations intersect.
pub fn check_overlap<'a>(regs: impl Iterator<Item = &'a PdoEntryReg>) -> Result<()> {
    let mut ranges: Vec<_> = regs.filter_map(|r| r.bit_range().map(|b| (b, r.entry))).collect();
    ranges.sort_by_key(|((start, end), _)| (*start, *end));
    for pair in ranges.windows(2) {
        let ((_, end), a) = pair[0];
        let ((start, _), b) = pair[1];
        if start < end {
            log::error!("PDO entries {} and {} overlap in the process data", a, b);
            return Err(Error::OverlappingEntries(a, b));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(idx: u16) -> PdoEntryIdx {
        PdoEntryIdx::new(idx, 0)
    }

    #[test]
    fn register_up_to_capacity() {
        let mut regs = PdoEntryRegs::new("m.s", 2);
        let a = regs.register(SlavePos::from(0), entry(0x6040), 16).unwrap();
        let b = regs.register(SlavePos::from(0), entry(0x6041), 16).unwrap();
        assert_ne!(a, b);
        assert!(matches!(
            regs.register(SlavePos::from(0), entry(0x6064), 32),
            Err(Error::RegsFull { used: 2, max: 2, .. })
        ));
        assert_eq!(regs.len(), 2);
        assert_eq!(regs.get(b).unwrap().entry, entry(0x6041));
        assert_eq!(regs.offset(a), None);
    }

    #[test]
    fn append_is_all_or_nothing() {
        let mut regs = PdoEntryRegs::new("m.s", 3);
        regs.register(SlavePos::from(1), entry(0x6040), 16).unwrap();

        let mut more = PdoEntryRegs::new("m.s", 2);
        let local = more.register(SlavePos::from(1), entry(0x6041), 16).unwrap();
        more.register(SlavePos::from(1), entry(0x6064), 32).unwrap();
        let start = regs.append(more).unwrap();
        assert_eq!(regs.len(), 3);
        assert_eq!(regs.get(local.rebase(start)).unwrap().entry, entry(0x6041));

        let mut extra = PdoEntryRegs::new("m.s", 1);
        extra.register(SlavePos::from(1), entry(0x606c), 32).unwrap();
        assert!(matches!(regs.append(extra), Err(Error::RegsFull { used: 3, max: 3, .. })));
        assert_eq!(regs.len(), 3);
    }

    #[test]
    fn overlap_detection() {
        let mut a = PdoEntryReg::new(SlavePos::from(0), entry(0x6040), 16);
        let mut b = PdoEntryReg::new(SlavePos::from(0), entry(0x6064), 32);
        a.offset = Some(Offset { byte: 0, bit: 0 });
        b.offset = Some(Offset { byte: 2, bit: 0 });
        assert!(check_overlap(vec![&a, &b].into_iter()).is_ok());

        b.offset = Some(Offset { byte: 1, bit: 7 });
        assert!(matches!(
            check_overlap(vec![&b, &a].into_iter()),
            Err(Error::OverlappingEntries(x, y)) if x == entry(0x6040) && y == entry(0x6064)
        ));

        // unresolved entries are ignored
        b.offset = None;
        assert!(check_overlap(vec![&a, &b].into_iter()).is_ok());
    }
}
