// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

use crate::devices::DeviceRegistry;
use crate::master::BusMaster;
use crate::pin::PinValue;
use crate::regs::check_overlap;
use crate::slave::{Slave, SlaveConfig};
use crate::types::*;

/// One master together with the slaves configured on it.
///
/// A cycle is [Bus::read], the master's process data exchange, then [Bus::write].
pub struct Bus<M: BusMaster> {
    name: String,
    master: M,
    slaves: Vec<Slave>,
}

impl<M: BusMaster> Bus<M> {
    pub fn new(name: impl Into<String>, master: M) -> Self {
        Self {
            name: name.into(),
            master,
            slaves: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn master(&self) -> &M {
        &self.master
    }

    pub fn master_mut(&mut self) -> &mut M {
        &mut self.master
    }

    /// Adds a slave; fails on an unknown type or invalid modparams.
    pub fn add_slave(&mut self, registry: &DeviceRegistry, config: SlaveConfig) -> Result<()> {
        let ty = registry.find(&config.device_type).map_err(|e| {
            log::error!("slave {}.{}: {}", self.name, config.name, e);
            e
        })?;
        let slave = Slave::new(&self.name, &config, ty)?;
        log::debug!(
            "slave {} added at position {}",
            slave.device_name(),
            u16::from(slave.position())
        );
        self.slaves.push(slave);
        Ok(())
    }

    /// Activates every slave. A slave that fails is left inactive without
    /// affecting the others.
    ///
    /// Returns the number of active slaves.
    pub fn configure(&mut self) -> Result<usize> {
        let mut active = 0;
        for slave in &mut self.slaves {
            if slave.activate(&mut self.master).is_ok() {
                active += 1;
            }
        }
        check_overlap(
            self.slaves
                .iter()
                .filter(|s| s.is_active())
                .flat_map(|s| s.regs().iter()),
        )?;
        log::info!(
            "master {}: {} of {} slaves configured",
            self.name,
            active,
            self.slaves.len()
        );
        Ok(active)
    }

    /// Input half of a cycle: refreshes slave states, then copies inputs to pins.
    pub fn read(&mut self) {
        for slave in &mut self.slaves {
            slave.update_state(&mut self.master);
            slave.read(&mut self.master);
        }
    }

    /// Output half of a cycle: copies pins to outputs and advances SDO writes.
    pub fn write(&mut self) {
        for slave in &mut self.slaves {
            slave.write(&mut self.master);
        }
    }

    pub fn slaves(&self) -> &[Slave] {
        &self.slaves
    }

    pub fn slave(&self, name: &str) -> Result<&Slave> {
        self.slaves
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| Error::UnknownSlave(name.to_string()))
    }

    pub fn slave_mut(&mut self, name: &str) -> Result<&mut Slave> {
        self.slaves
            .iter_mut()
            .find(|s| s.name() == name)
            .ok_or_else(|| Error::UnknownSlave(name.to_string()))
    }

    /// Looks a pin up by its full name on any slave.
    pub fn pin_value(&self, name: &str) -> Option<PinValue> {
        self.slaves.iter().find_map(|s| s.pins().value_of(name))
    }

    pub fn set_pin(&mut self, name: &str, value: PinValue) -> Result<()> {
        let slave = self
            .slaves
            .iter_mut()
            .find(|s| s.pins().find(name).is_some())
            .ok_or_else(|| Error::UnknownPin(name.to_string()))?;
        slave.pins_mut().set_by_name(name, value)
    }
}
