// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

//! Named, typed, directional values exchanged with the host every cycle.

use crate::types::{Error, Result};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinType {
    Bit,
    S32,
    U32,
    Float,
}

/// Direction as seen from the host: `In` pins are written by the host and
/// sent to the device, `Out` pins are updated from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDir {
    In,
    Out,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PinValue {
    Bit(bool),
    S32(i32),
    U32(u32),
    Float(f64),
}

impl PinValue {
    pub fn zero(ty: PinType) -> Self {
        match ty {
            PinType::Bit => PinValue::Bit(false),
            PinType::S32 => PinValue::S32(0),
            PinType::U32 => PinValue::U32(0),
            PinType::Float => PinValue::Float(0.0),
        }
    }

    pub fn ty(&self) -> PinType {
        match self {
            PinValue::Bit(_) => PinType::Bit,
            PinValue::S32(_) => PinType::S32,
            PinValue::U32(_) => PinType::U32,
            PinValue::Float(_) => PinType::Float,
        }
    }

    /// Converts a raw field value to a pin of type `ty`, truncating like a C cast.
    pub fn from_raw(ty: PinType, raw: i64) -> Self {
        match ty {
            PinType::Bit => PinValue::Bit(raw != 0),
            PinType::S32 => PinValue::S32(raw as i32),
            PinType::U32 => PinValue::U32(raw as u32),
            PinType::Float => PinValue::Float(raw as f64),
        }
    }

    /// Raw field value of this pin.
    pub fn to_raw(&self) -> i64 {
        match *self {
            PinValue::Bit(b) => b as i64,
            PinValue::S32(v) => v as i64,
            PinValue::U32(v) => v as i64,
            PinValue::Float(v) => v as i64,
        }
    }
}

/// Handle of a pin inside its [PinTable].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinId(usize);

#[derive(Debug, Clone)]
pub struct Pin {
    pub name: String,
    pub ty: PinType,
    pub dir: PinDir,
    pub value: PinValue,
}

#[derive(Debug, Default)]
pub struct PinTable {
    pins: Vec<Pin>,
    by_name: HashMap<String, PinId>,
}

/// Builds `<master>.<slave>.<prefix>-<name>`, or `<master>.<slave>.<name>`
/// without a prefix.
pub fn pin_name(master: &str, slave: &str, prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(p) => format!("{}.{}.{}-{}", master, slave, p, name),
        None => format!("{}.{}.{}", master, slave, name),
    }
}

impl PinTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: String, ty: PinType, dir: PinDir) -> Result<PinId> {
        if self.by_name.contains_key(&name) {
            log::error!("duplicate pin {}", name);
            return Err(Error::DuplicatePin(name));
        }
        let id = PinId(self.pins.len());
        self.by_name.insert(name.clone(), id);
        self.pins.push(Pin {
            name,
            ty,
            dir,
            value: PinValue::zero(ty),
        });
        Ok(id)
    }

    pub fn find(&self, name: &str) -> Option<PinId> {
        self.by_name.get(name).copied()
    }

    pub fn pin(&self, id: PinId) -> Option<&Pin> {
        self.pins.get(id.0)
    }

    pub fn get(&self, id: PinId) -> PinValue {
        self.pins[id.0].value
    }

    /// Stores `value` converted to the pin's type.
    pub fn set(&mut self, id: PinId, value: PinValue) {
        let pin = &mut self.pins[id.0];
        pin.value = if value.ty() == pin.ty {
            value
        } else if let PinValue::Float(v) = value {
            match pin.ty {
                PinType::Bit => PinValue::Bit(v != 0.0),
                ty => PinValue::from_raw(ty, v as i64),
            }
        } else {
            match pin.ty {
                PinType::Float => PinValue::Float(value.to_raw() as f64),
                ty => PinValue::from_raw(ty, value.to_raw()),
            }
        };
    }

    pub fn get_raw(&self, id: PinId) -> i64 {
        self.get(id).to_raw()
    }

    pub fn set_raw(&mut self, id: PinId, raw: i64) {
        let ty = self.pins[id.0].ty;
        self.pins[id.0].value = PinValue::from_raw(ty, raw);
    }

    pub fn value_of(&self, name: &str) -> Option<PinValue> {
        self.find(name).map(|id| self.get(id))
    }

    pub fn set_by_name(&mut self, name: &str, value: PinValue) -> Result<()> {
        let id = self.find(name).ok_or_else(|| Error::UnknownPin(name.to_string()))?;
        self.set(id, value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Pins in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(
            pin_name("master0", "drive", Some("srv"), "actual-position"),
            "master0.drive.srv-actual-position"
        );
        assert_eq!(
            pin_name("master0", "drive", None, "slave-online"),
            "master0.drive.slave-online"
        );
    }

    #[test]
    fn add_and_lookup() {
        let mut pins = PinTable::new();
        let a = pins.add("m.s.srv-opmode".into(), PinType::S32, PinDir::In).unwrap();
        let b = pins.add("m.s.srv-supports-mode-pp".into(), PinType::Bit, PinDir::Out).unwrap();
        assert_eq!(pins.len(), 2);
        assert_eq!(pins.find("m.s.srv-opmode"), Some(a));
        assert_eq!(pins.get(b), PinValue::Bit(false));
        assert!(matches!(
            pins.add("m.s.srv-opmode".into(), PinType::S32, PinDir::In),
            Err(Error::DuplicatePin(_))
        ));
        let names: Vec<_> = pins.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["m.s.srv-opmode", "m.s.srv-supports-mode-pp"]);
    }

    #[test]
    fn raw_conversions_truncate() {
        let mut pins = PinTable::new();
        let s = pins.add("s".into(), PinType::S32, PinDir::Out).unwrap();
        let u = pins.add("u".into(), PinType::U32, PinDir::Out).unwrap();
        let b = pins.add("b".into(), PinType::Bit, PinDir::Out).unwrap();
        pins.set_raw(s, -5);
        pins.set_raw(u, 0x1_0000_0003);
        pins.set_raw(b, 4);
        assert_eq!(pins.get(s), PinValue::S32(-5));
        assert_eq!(pins.get(u), PinValue::U32(3));
        assert_eq!(pins.get(b), PinValue::Bit(true));
        assert_eq!(pins.get_raw(u), 3);
    }

    #[test]
    fn set_converts_to_pin_type() {
        let mut pins = PinTable::new();
        let s = pins.add("s".into(), PinType::S32, PinDir::In).unwrap();
        let f = pins.add("f".into(), PinType::Float, PinDir::In).unwrap();
        pins.set(s, PinValue::U32(7));
        assert_eq!(pins.get(s), PinValue::S32(7));
        pins.set(s, PinValue::Float(-2.9));
        assert_eq!(pins.get(s), PinValue::S32(-2));
        pins.set(f, PinValue::S32(3));
        assert_eq!(pins.get(f), PinValue::Float(3.0));
        pins.set_by_name("s", PinValue::S32(11)).unwrap();
        assert_eq!(pins.value_of("s"), Some(PinValue::S32(11)));
        assert!(matches!(pins.set_by_name("x", PinValue::S32(1)), Err(Error::UnknownPin(_))));
    }
}
