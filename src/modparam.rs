// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

//! Typed per-device configuration values (`<modParam name=".." value=".."/>`).

use crate::types::{Error, Result};
use std::fmt;

/// Most axes a channelized parameter list can address.
pub const MAX_CHANNELS: usize = 8;

/// Low bits of a channelized ID holding the channel index.
pub const CHANNEL_MASK: u32 = (MAX_CHANNELS as u32) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModParamType {
    Bit,
    U32,
    S32,
    Float,
    String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModParamValue {
    Bit(bool),
    U32(u32),
    S32(i32),
    Float(f64),
    String(String),
}

impl ModParamValue {
    pub fn parse(ty: ModParamType, text: &str) -> Option<Self> {
        let text = text.trim();
        Some(match ty {
            ModParamType::Bit => ModParamValue::Bit(parse_bit(text)?),
            ModParamType::U32 => ModParamValue::U32(parse_int(text)?),
            ModParamType::S32 => ModParamValue::S32(parse_int(text)?),
            ModParamType::Float => ModParamValue::Float(text.parse().ok()?),
            ModParamType::String => ModParamValue::String(text.to_string()),
        })
    }

    pub fn as_bool(&self) -> bool {
        match *self {
            ModParamValue::Bit(b) => b,
            ModParamValue::U32(v) => v != 0,
            ModParamValue::S32(v) => v != 0,
            ModParamValue::Float(v) => v != 0.0,
            ModParamValue::String(ref s) => !s.is_empty(),
        }
    }

    pub fn as_u32(&self) -> u32 {
        match *self {
            ModParamValue::Bit(b) => b as u32,
            ModParamValue::U32(v) => v,
            ModParamValue::S32(v) => v as u32,
            ModParamValue::Float(v) => v as u32,
            ModParamValue::String(_) => 0,
        }
    }

    pub fn as_i32(&self) -> i32 {
        match *self {
            ModParamValue::Bit(b) => b as i32,
            ModParamValue::U32(v) => v as i32,
            ModParamValue::S32(v) => v,
            ModParamValue::Float(v) => v as i32,
            ModParamValue::String(_) => 0,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            ModParamValue::Bit(b) => b as u8 as f64,
            ModParamValue::U32(v) => v.into(),
            ModParamValue::S32(v) => v.into(),
            ModParamValue::Float(v) => v,
            ModParamValue::String(_) => 0.0,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ModParamValue::String(s) => s,
            _ => "",
        }
    }
}

impl fmt::Display for ModParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModParamValue::Bit(b) => write!(f, "{}", *b as u8),
            ModParamValue::U32(v) => write!(f, "{}", v),
            ModParamValue::S32(v) => write!(f, "{}", v),
            ModParamValue::Float(v) => write!(f, "{}", v),
            ModParamValue::String(s) => f.write_str(s),
        }
    }
}

fn parse_bit(text: &str) -> Option<bool> {
    const TRUE: &[&str] = &["1", "true", "on", "yes"];
    const FALSE: &[&str] = &["0", "false", "off", "no"];
    if TRUE.iter().any(|t| t.eq_ignore_ascii_case(text)) {
        Some(true)
    } else if FALSE.iter().any(|t| t.eq_ignore_ascii_case(text)) {
        Some(false)
    } else {
        None
    }
}

/// Decimal, or hexadecimal with a `0x` prefix.
fn parse_int<T: num_traits::Num>(text: &str) -> Option<T> {
    let (digits, radix) = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (text, 10),
    };
    T::from_str_radix(digits, radix).ok()
}

/// Declaration of one modparam a device type accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct ModParamDesc {
    pub name: String,
    pub id: u32,
    pub ty: ModParamType,
    pub default: Option<&'static str>,
    pub comment: Option<&'static str>,
}

impl ModParamDesc {
    pub fn new(name: impl Into<String>, id: u32, ty: ModParamType) -> Self {
        Self {
            name: name.into(),
            id,
            ty,
            default: None,
            comment: None,
        }
    }

    pub fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_comment(mut self, comment: &'static str) -> Self {
        self.comment = Some(comment);
        self
    }
}

/// Default and comment shown for a parameter the device declares elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModParamDoc {
    pub name: &'static str,
    pub default: &'static str,
    pub comment: &'static str,
}

/// A configured modparam of one slave.
#[derive(Debug, Clone, PartialEq)]
pub struct ModParam {
    pub id: u32,
    pub name: String,
    pub value: ModParamValue,
}

impl ModParam {
    /// Channel index and channel-less ID of a channelized parameter.
    pub fn split_channel(&self) -> (usize, u32) {
        ((self.id & CHANNEL_MASK) as usize, self.id & !CHANNEL_MASK)
    }
}

/// Replicates every entry of `base` for `channels` axes.
///
/// Each entry is followed by `ch1<name>` .. `ch<N><name>` with IDs
/// `id + 0` .. `id + N - 1`, so the bare name and `ch1<name>` both address
/// channel 0. Base IDs must keep the bits in [CHANNEL_MASK] clear.
pub fn channelize(base: &[ModParamDesc], channels: usize) -> Result<Vec<ModParamDesc>> {
    if channels > MAX_CHANNELS {
        return Err(Error::TooManyChannels {
            requested: channels,
            max: MAX_CHANNELS,
        });
    }
    let mut out = Vec::with_capacity(base.len() * (channels + 1));
    for desc in base {
        out.push(desc.clone());
        for ch in 0..channels {
            out.push(ModParamDesc {
                name: format!("ch{}{}", ch + 1, desc.name),
                id: desc.id + ch as u32,
                ..desc.clone()
            });
        }
    }
    Ok(out)
}

pub fn concat(a: &[ModParamDesc], b: &[ModParamDesc]) -> Vec<ModParamDesc> {
    a.iter().chain(b).cloned().collect()
}

pub fn find<'a>(descs: &'a [ModParamDesc], name: &str) -> Option<&'a ModParamDesc> {
    descs.iter().find(|d| d.name == name)
}

/// Checks and parses `(name, value)` pairs against a device's declarations.
pub fn parse_modparams(
    device: &str,
    descs: &[ModParamDesc],
    raw: &[(String, String)],
) -> Result<Vec<ModParam>> {
    raw.iter()
        .map(|(name, value)| {
            let desc = find(descs, name).ok_or_else(|| {
                log::error!("unknown modparam {} for slave {}", name, device);
                Error::UnknownModParam {
                    device: device.to_string(),
                    name: name.clone(),
                }
            })?;
            let value = ModParamValue::parse(desc.ty, value).ok_or_else(|| {
                log::error!("invalid value {:?} for modparam {} of slave {}", value, name, device);
                Error::InvalidModParam {
                    name: name.clone(),
                    value: value.clone(),
                }
            })?;
            Ok(ModParam {
                id: desc.id,
                name: name.clone(),
                value,
            })
        })
        .collect()
}

/// Value of the first configured parameter with `id`.
pub fn get(params: &[ModParam], id: u32) -> Option<&ModParamValue> {
    params.iter().find(|p| p.id == id).map(|p| &p.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Vec<ModParamDesc> {
        vec![
            ModParamDesc::new("aaa", 0x1000, ModParamType::S32),
            ModParamDesc::new("bbb", 0x1010, ModParamType::S32),
            ModParamDesc::new("ccc", 0x1020, ModParamType::S32),
        ]
    }

    #[test]
    fn channelize_eight_axes() {
        let mps = channelize(&base(), MAX_CHANNELS).unwrap();
        assert_eq!(mps.len(), 27);
        assert_eq!(mps[0].name, "aaa");
        assert_eq!(mps[0].id, 0x1000);
        for ch in 0..8 {
            assert_eq!(mps[1 + ch].name, format!("ch{}aaa", ch + 1));
            assert_eq!(mps[1 + ch].id, 0x1000 + ch as u32);
        }
        assert_eq!(mps[9].name, "bbb");
        assert_eq!(mps[9].id, 0x1010);
        assert_eq!(mps[10].name, "ch1bbb");
        assert_eq!(mps[10].id, 0x1010);
        assert_eq!(mps[14].id, 0x1014);
        assert_eq!(mps[17].name, "ch8bbb");
        assert_eq!(mps[17].id, 0x1017);
        assert_eq!(mps[26].name, "ch8ccc");

        let all = concat(&mps, &[ModParamDesc::new("ddd", 0x1, ModParamType::S32)]);
        assert_eq!(all.len(), 28);
        assert_eq!(all[27].name, "ddd");
    }

    #[test]
    fn channelized_ids_do_not_collide() {
        for n in 0..=MAX_CHANNELS {
            let mps = channelize(&base(), n).unwrap();
            assert_eq!(mps.len(), 3 * (n + 1));
            let mut ids: Vec<_> =
                mps.iter().filter(|d| d.name.starts_with("ch")).map(|d| d.id).collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), 3 * n);
        }
        assert!(matches!(
            channelize(&base(), 9),
            Err(Error::TooManyChannels { requested: 9, max: 8 })
        ));
    }

    #[test]
    fn bare_and_first_channel_are_the_same() {
        let mps = channelize(&base(), 2).unwrap();
        let raw = vec![
            ("bbb".to_string(), "5".to_string()),
            ("ch1bbb".to_string(), "6".to_string()),
            ("ch2bbb".to_string(), "7".to_string()),
        ];
        let params = parse_modparams("m.s", &mps, &raw).unwrap();
        assert_eq!(params[0].split_channel(), (0, 0x1010));
        assert_eq!(params[1].split_channel(), (0, 0x1010));
        assert_eq!(params[2].split_channel(), (1, 0x1010));
        assert_eq!(get(&params, 0x1011), Some(&ModParamValue::S32(7)));
    }

    #[test]
    fn parse_values() {
        use ModParamType::*;
        for t in &["1", "true", "ON", "Yes"] {
            assert_eq!(ModParamValue::parse(Bit, t), Some(ModParamValue::Bit(true)));
        }
        for t in &["0", "False", "off", "NO"] {
            assert_eq!(ModParamValue::parse(Bit, t), Some(ModParamValue::Bit(false)));
        }
        assert_eq!(ModParamValue::parse(Bit, "maybe"), None);
        assert_eq!(ModParamValue::parse(U32, "0x10"), Some(ModParamValue::U32(16)));
        assert_eq!(ModParamValue::parse(U32, "-1"), None);
        assert_eq!(ModParamValue::parse(S32, " -42 "), Some(ModParamValue::S32(-42)));
        assert_eq!(ModParamValue::parse(Float, "5.6"), Some(ModParamValue::Float(5.6)));
        assert_eq!(ModParamValue::parse(Float, "x"), None);
        assert_eq!(
            ModParamValue::parse(String, "closedloop"),
            Some(ModParamValue::String("closedloop".into()))
        );
    }

    #[test]
    fn unknown_and_invalid_params() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mps = base();
        let raw = vec![("zzz".to_string(), "1".to_string())];
        assert!(matches!(
            parse_modparams("m.s", &mps, &raw),
            Err(Error::UnknownModParam { .. })
        ));
        let raw = vec![("aaa".to_string(), "one".to_string())];
        assert!(matches!(
            parse_modparams("m.s", &mps, &raw),
            Err(Error::InvalidModParam { .. })
        ));
    }
}
