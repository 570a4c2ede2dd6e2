// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

//! Known device types and the registry they are looked up in.

mod basic_cia402;
mod leadshine;

use crate::modparam::{ModParamDesc, ModParamDoc};
use crate::slave::Driver;
use crate::types::*;
use std::fmt;

pub type DriverFactory = fn(&DeviceType) -> Box<dyn Driver>;

/// Hardware variant data shared by drivers covering a device family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceFlags {
    pub axes: usize,
    pub digital_in: usize,
    pub digital_out: usize,
}

#[derive(Clone)]
pub struct DeviceType {
    pub name: &'static str,
    pub vendor_id: u32,
    pub product_code: u32,
    /// Most PDO entries a slave of this type registers.
    pub pdo_entry_count: usize,
    pub flags: DeviceFlags,
    pub modparams: Vec<ModParamDesc>,
    /// Defaults of parameters declared without one, for documentation.
    pub docs: &'static [ModParamDoc],
    pub create: DriverFactory,
}

impl fmt::Debug for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceType")
            .field("name", &self.name)
            .field("vendor_id", &self.vendor_id)
            .field("product_code", &self.product_code)
            .field("pdo_entry_count", &self.pdo_entry_count)
            .field("flags", &self.flags)
            .field("modparams", &self.modparams.len())
            .finish()
    }
}

impl DeviceType {
    /// `(name, default, comment)` of every parameter with a known default.
    pub fn documented_modparams(&self) -> Vec<(&str, &str, Option<&str>)> {
        let mut out: Vec<_> = self
            .modparams
            .iter()
            .filter_map(|d| d.default.map(|def| (d.name.as_str(), def, d.comment)))
            .collect();
        for doc in self.docs {
            if !out.iter().any(|(name, _, _)| *name == doc.name) {
                out.push((doc.name, doc.default, Some(doc.comment)));
            }
        }
        out
    }
}

/// Device types by name, populated once at startup.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    types: Vec<DeviceType>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every bundled driver.
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new();
        for ty in basic_cia402::types()?.into_iter().chain(leadshine::types()?) {
            registry.register(ty)?;
        }
        log::debug!("{} device types registered", registry.len());
        Ok(registry)
    }

    pub fn register(&mut self, ty: DeviceType) -> Result<()> {
        if self.types.iter().any(|t| t.name == ty.name) {
            log::error!("device type {} is already registered", ty.name);
            return Err(Error::DuplicateDeviceType(ty.name.to_string()));
        }
        self.types.push(ty);
        Ok(())
    }

    pub fn find(&self, name: &str) -> Result<&DeviceType> {
        self.types
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::UnknownDeviceType(name.to_string()))
    }

    /// Types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
