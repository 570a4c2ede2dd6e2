// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

//! Generic CiA 402 drive, configured entirely through modparams.
//!
//! The type has no real identity; every slave must set its own vendor ID
//! and product code.

use super::{DeviceFlags, DeviceType};
use crate::cia402::{self, Channel, Options};
use crate::feature::Feature;
use crate::modparam::{ModParamDesc, ModParamType, MAX_CHANNELS};
use crate::slave::{CycleContext, Driver, InitContext};
use crate::sync::MAX_PDO_ENTRY_COUNT;
use crate::types::*;
use std::convert::TryFrom;

const FAKE_ID: u32 = 0xffff_ffff;

const MP_CHANNELS: u32 = 0;
const MP_RX_PDO_ENTRY_LIMIT: u32 = 1;
const MP_TX_PDO_ENTRY_LIMIT: u32 = 2;
const MP_PDO_INCREMENT: u32 = 3;
const MP_PDO_AUTOFLOW: u32 = 4;
const MP_PDO_LIMIT: u32 = 5;
const MP_PDO_ENTRY_LIMIT: u32 = 6;

pub(super) fn types() -> Result<Vec<DeviceType>> {
    let device = [
        ModParamDesc::new("ciaChannels", MP_CHANNELS, ModParamType::U32)
            .with_default("1")
            .with_comment("Number of axes"),
        ModParamDesc::new("ciaRxPDOEntryLimit", MP_RX_PDO_ENTRY_LIMIT, ModParamType::U32)
            .with_default("8")
            .with_comment("Most objects mapped into one axis' RxPDOs"),
        ModParamDesc::new("ciaTxPDOEntryLimit", MP_TX_PDO_ENTRY_LIMIT, ModParamType::U32)
            .with_default("8")
            .with_comment("Most objects mapped into one axis' TxPDOs"),
        ModParamDesc::new("pdoIncrement", MP_PDO_INCREMENT, ModParamType::U32).with_default("1"),
        ModParamDesc::new("pdoAutoflow", MP_PDO_AUTOFLOW, ModParamType::Bit).with_default("false"),
        ModParamDesc::new("pdoLimit", MP_PDO_LIMIT, ModParamType::U32),
        ModParamDesc::new("pdoEntryLimit", MP_PDO_ENTRY_LIMIT, ModParamType::U32),
    ];
    Ok(vec![DeviceType {
        name: "basic_cia402",
        vendor_id: FAKE_ID,
        product_code: FAKE_ID,
        pdo_entry_count: MAX_PDO_ENTRY_COUNT,
        flags: DeviceFlags {
            axes: 1,
            ..DeviceFlags::default()
        },
        modparams: cia402::modparams(&device, &[], MAX_CHANNELS)?,
        docs: &[],
        create,
    }])
}

fn create(_: &DeviceType) -> Box<dyn Driver> {
    Box::new(BasicCia402::default())
}

#[derive(Debug, Default)]
struct BasicCia402 {
    channels: Vec<Channel>,
}

impl Driver for BasicCia402 {
    fn init(&mut self, cx: &mut InitContext<'_>) -> Result<()> {
        if cx.id.vendor_id == FAKE_ID || cx.id.product_code == FAKE_ID {
            log::error!(
                "basic_cia402 slave {} not configured correctly, vendor ID and product code \
                 must be set",
                cx.device()
            );
            return Err(Error::Unconfigured {
                device: cx.device(),
                reason: "vendor ID and product code not set".to_string(),
            });
        }

        let mut options = Options::new(1);
        options.rx_pdo_entry_limit = 8;
        options.tx_pdo_entry_limit = 8;
        for ch in options.channel.iter_mut() {
            ch.features.enable(Feature::Pv);
        }

        let params = cx.modparams;
        for p in params {
            match p.id {
                MP_CHANNELS => options.channels = p.value.as_u32() as usize,
                MP_RX_PDO_ENTRY_LIMIT => options.rx_pdo_entry_limit = p.value.as_u32() as usize,
                MP_TX_PDO_ENTRY_LIMIT => options.tx_pdo_entry_limit = p.value.as_u32() as usize,
                MP_PDO_INCREMENT => {
                    options.pdo_increment = u16::try_from(p.value.as_u32()).map_err(|_| {
                        log::error!(
                            "invalid value for modparam {} of slave {}",
                            p.name,
                            cx.device()
                        );
                        Error::InvalidModParam {
                            name: p.name.clone(),
                            value: p.value.to_string(),
                        }
                    })?
                }
                MP_PDO_AUTOFLOW => options.pdo_autoflow = p.value.as_bool(),
                MP_PDO_LIMIT => options.pdo_limit = p.value.as_u32() as usize,
                MP_PDO_ENTRY_LIMIT => options.pdo_entry_limit = p.value.as_u32() as usize,
                _ => {
                    if !cia402::handle_modparam(cx, &mut options, p)? {
                        log::error!("unknown modparam {} for slave {}", p.name, cx.device());
                        return Err(Error::UnknownModParam {
                            device: cx.device(),
                            name: p.name.clone(),
                        });
                    }
                }
            }
        }

        options.rename_multiaxis_channels();
        self.channels = cia402::configure(cx, &options)?;
        Ok(())
    }

    fn read(&mut self, cx: &mut CycleContext<'_>) {
        for ch in &self.channels {
            ch.read(cx);
        }
    }

    fn write(&mut self, cx: &mut CycleContext<'_>) {
        for ch in &mut self.channels {
            ch.write(cx);
        }
    }
}
