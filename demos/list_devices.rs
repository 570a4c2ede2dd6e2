// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

//! List every known device type with its identity and the modparams that
//! have a default, in a form that can be pasted into a bus configuration.

use ethercat_pdomap::DeviceRegistry;
use std::io;

pub fn main() -> Result<(), io::Error> {
    env_logger::init();

    let registry = DeviceRegistry::with_defaults()?;
    log::info!("{} device types known", registry.len());

    for ty in registry.iter() {
        print!("{}\t0x{:08x}\t0x{:08x}\t", ty.name, ty.vendor_id, ty.product_code);
        for (name, default, comment) in ty.documented_modparams() {
            print!("<modParam name=\"{}\" value=\"{}\"/>", name, default);
            if let Some(comment) = comment {
                print!("<!-- {} -->", comment);
            }
        }
        println!();
    }
    Ok(())
}
