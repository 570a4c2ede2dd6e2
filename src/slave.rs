// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

use crate::devices::DeviceType;
use crate::master::BusMaster;
use crate::modparam::{parse_modparams, ModParam};
use crate::pin::{pin_name, PinDir, PinId, PinTable, PinType};
use crate::regs::PdoEntryRegs;
use crate::sync::Syncs;
use crate::types::*;

/// Device-specific behaviour of a slave.
pub trait Driver {
    /// Handles modparams, builds the sync configuration, registers PDO
    /// entries and pins. Runs once, before the master configures the slave.
    fn init(&mut self, cx: &mut InitContext<'_>) -> Result<()>;

    /// Copies inputs from the process data to pins.
    fn read(&mut self, cx: &mut CycleContext<'_>);

    /// Copies pins to the process data and starts SDO writes.
    fn write(&mut self, cx: &mut CycleContext<'_>);
}

/// Everything a [Driver] may touch during initialization.
pub struct InitContext<'a> {
    pub master_name: &'a str,
    pub slave_name: &'a str,
    pub position: SlavePos,
    pub id: SlaveId,
    pub modparams: &'a [ModParam],
    pub master: &'a mut dyn BusMaster,
    pub syncs: &'a mut Syncs,
    pub regs: &'a mut PdoEntryRegs,
    pub pins: &'a mut PinTable,
}

/// Everything a [Driver] may touch during one cycle.
pub struct CycleContext<'a> {
    pub master: &'a mut dyn BusMaster,
    pub pins: &'a mut PinTable,
    pub regs: &'a PdoEntryRegs,
}

impl<'a> InitContext<'a> {
    /// `<master>.<slave>`, as used in diagnostics.
    pub fn device(&self) -> String {
        format!("{}.{}", self.master_name, self.slave_name)
    }

    pub fn pin_name(&self, prefix: Option<&str>, name: &str) -> String {
        pin_name(self.master_name, self.slave_name, prefix, name)
    }

    pub fn add_pin(
        &mut self,
        prefix: Option<&str>,
        name: &str,
        ty: PinType,
        dir: PinDir,
    ) -> Result<PinId> {
        let name = self.pin_name(prefix, name);
        self.pins.add(name, ty, dir)
    }

    /// Uploads exactly `target.len()` bytes.
    pub fn read_sdo(&mut self, idx: SdoIdx, target: &mut [u8]) -> Result<()> {
        let actual = self.master.sdo_upload(self.position, idx, target).map_err(|e| {
            log::error!("slave {}: failed to read SDO {}: {}", self.device(), idx, e);
            e
        })?;
        if actual != target.len() {
            log::error!(
                "slave {}: invalid result size on SDO upload of {}, requested {} bytes, got {}",
                self.device(),
                idx,
                target.len(),
                actual
            );
            return Err(Error::SdoSize {
                idx,
                expected: target.len(),
                actual,
            });
        }
        Ok(())
    }

    pub fn read_sdo32(&mut self, idx: u16, sub_idx: u8) -> Result<u32> {
        let mut buf = [0; 4];
        self.read_sdo(SdoIdx::new(idx, sub_idx), &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Downloads `data` now and keeps it as a configuration SDO, so the
    /// master writes it again when the slave comes back.
    pub fn write_sdo(&mut self, idx: SdoIdx, data: &[u8]) -> Result<()> {
        let position = self.position;
        let result = self
            .master
            .sdo_download(position, idx, data)
            .and_then(|_| self.master.add_config_sdo(position, idx, data));
        if let Err(e) = &result {
            log::error!("slave {}: failed to write SDO {}: {}", self.device(), idx, e);
        }
        result
    }

    pub fn write_sdo8(&mut self, idx: u16, sub_idx: u8, value: u8) -> Result<()> {
        self.write_sdo(SdoIdx::new(idx, sub_idx), &[value])
    }

    pub fn write_sdo16(&mut self, idx: u16, sub_idx: u8, value: u16) -> Result<()> {
        self.write_sdo(SdoIdx::new(idx, sub_idx), &value.to_le_bytes())
    }

    pub fn write_sdo32(&mut self, idx: u16, sub_idx: u8, value: u32) -> Result<()> {
        self.write_sdo(SdoIdx::new(idx, sub_idx), &value.to_le_bytes())
    }

    fn log_modparam<T>(&self, result: Result<T>, modparam: &str) -> Result<T> {
        if result.is_err() {
            log::error!("slave {}: failed to apply modparam {}", self.device(), modparam);
        }
        result
    }

    pub fn write_sdo8_modparam(
        &mut self,
        idx: u16,
        sub_idx: u8,
        value: u8,
        modparam: &str,
    ) -> Result<()> {
        let r = self.write_sdo8(idx, sub_idx, value);
        self.log_modparam(r, modparam)
    }

    pub fn write_sdo16_modparam(
        &mut self,
        idx: u16,
        sub_idx: u8,
        value: u16,
        modparam: &str,
    ) -> Result<()> {
        let r = self.write_sdo16(idx, sub_idx, value);
        self.log_modparam(r, modparam)
    }

    pub fn write_sdo32_modparam(
        &mut self,
        idx: u16,
        sub_idx: u8,
        value: u32,
        modparam: &str,
    ) -> Result<()> {
        let r = self.write_sdo32(idx, sub_idx, value);
        self.log_modparam(r, modparam)
    }
}

/// Configuration of one slave, as read from the bus configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlaveConfig {
    pub name: String,
    pub position: SlavePos,
    pub device_type: String,
    pub vendor_id: Option<u32>,
    pub product_code: Option<u32>,
    pub modparams: Vec<(String, String)>,
}

impl SlaveConfig {
    pub fn new(name: impl Into<String>, position: u16, device_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: SlavePos::from(position),
            device_type: device_type.into(),
            vendor_id: None,
            product_code: None,
            modparams: Vec::new(),
        }
    }

    /// Overrides the identity declared by the device type.
    pub fn with_id(mut self, vendor_id: u32, product_code: u32) -> Self {
        self.vendor_id = Some(vendor_id);
        self.product_code = Some(product_code);
        self
    }

    pub fn with_modparam(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.modparams.push((name.into(), value.into()));
        self
    }
}

pub struct Slave {
    master_name: String,
    name: String,
    type_name: &'static str,
    position: SlavePos,
    id: SlaveId,
    modparams: Vec<ModParam>,
    syncs: Syncs,
    regs: PdoEntryRegs,
    pins: PinTable,
    driver: Box<dyn Driver>,
    state: SlaveConfigState,
    active: bool,
}

impl Slave {
    pub fn new(master_name: &str, config: &SlaveConfig, ty: &DeviceType) -> Result<Self> {
        let device = format!("{}.{}", master_name, config.name);
        let modparams = parse_modparams(&device, &ty.modparams, &config.modparams)?;
        let id = SlaveId::new(
            config.vendor_id.unwrap_or(ty.vendor_id),
            config.product_code.unwrap_or(ty.product_code),
        );
        Ok(Self {
            master_name: master_name.to_string(),
            name: config.name.clone(),
            type_name: ty.name,
            position: config.position,
            id,
            modparams,
            syncs: Syncs::new(device.clone()),
            regs: PdoEntryRegs::new(device, ty.pdo_entry_count),
            pins: PinTable::new(),
            driver: (ty.create)(ty),
            state: SlaveConfigState::default(),
            active: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_name(&self) -> String {
        format!("{}.{}", self.master_name, self.name)
    }

    pub fn type_name(&self) -> &str {
        self.type_name
    }

    pub fn position(&self) -> SlavePos {
        self.position
    }

    pub fn id(&self) -> SlaveId {
        self.id
    }

    pub fn modparams(&self) -> &[ModParam] {
        &self.modparams
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn state(&self) -> SlaveConfigState {
        self.state
    }

    pub fn syncs(&self) -> &Syncs {
        &self.syncs
    }

    pub fn regs(&self) -> &PdoEntryRegs {
        &self.regs
    }

    pub fn pins(&self) -> &PinTable {
        &self.pins
    }

    pub fn pins_mut(&mut self) -> &mut PinTable {
        &mut self.pins
    }

    /// Initializes the driver and has the master configure the slave.
    ///
    /// On failure the slave stays inactive and exposes no pins.
    pub fn activate(&mut self, master: &mut dyn BusMaster) -> Result<()> {
        self.active = false;
        let result = self.try_activate(master);
        match &result {
            Ok(()) => {
                log::info!(
                    "slave {} ({}) configured, {} PDO entries, {} pins",
                    self.device_name(),
                    self.type_name,
                    self.regs.len(),
                    self.pins.len()
                );
                self.active = true;
            }
            Err(e) => {
                log::error!("slave {} ({}) disabled: {}", self.device_name(), self.type_name, e);
                self.clear();
            }
        }
        result
    }

    fn clear(&mut self) {
        self.syncs.begin_device();
        self.regs = PdoEntryRegs::new(self.device_name(), self.regs.capacity());
        self.pins = PinTable::new();
    }

    fn try_activate(&mut self, master: &mut dyn BusMaster) -> Result<()> {
        self.clear();
        let mut cx = InitContext {
            master_name: &self.master_name,
            slave_name: &self.name,
            position: self.position,
            id: self.id,
            modparams: &self.modparams,
            master: &mut *master,
            syncs: &mut self.syncs,
            regs: &mut self.regs,
            pins: &mut self.pins,
        };
        self.driver.init(&mut cx)?;

        let table = self.syncs.finish()?;
        let infos = table.sync_infos();
        log::debug!("slave {}: {} sync managers", self.device_name(), infos.len() - 1);
        master.configure_slave(self.position, self.id, &infos)?;
        self.regs.resolve(master)
    }

    /// Refreshes the cached operational state. A failing query counts as not
    /// operational.
    pub fn update_state(&mut self, master: &mut dyn BusMaster) {
        self.state = master.slave_state(self.position).unwrap_or_default();
    }

    /// Whether cyclic process data may be touched this cycle.
    pub fn is_operational(&self) -> bool {
        self.active && self.state.operational
    }

    pub fn read(&mut self, master: &mut dyn BusMaster) {
        if !self.is_operational() {
            return;
        }
        let mut cx = CycleContext {
            master,
            pins: &mut self.pins,
            regs: &self.regs,
        };
        self.driver.read(&mut cx);
    }

    pub fn write(&mut self, master: &mut dyn BusMaster) {
        if !self.is_operational() {
            return;
        }
        let mut cx = CycleContext {
            master,
            pins: &mut self.pins,
            regs: &self.regs,
        };
        self.driver.write(&mut cx);
    }
}
