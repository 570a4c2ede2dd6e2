// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

//! Optional CiA 402 objects and operating modes, and the resolution of a
//! sparse request into the closed set of objects a channel maps.

use crate::pin::PinType;
use crate::types::{Error, Result};
use std::fmt;

/// How an optional object is transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Mapped into the input sync, copied to an `out` pin every cycle.
    ReadPdo,
    /// Mapped into the output sync, copied from an `in` pin every cycle.
    WritePdo,
    /// Not mapped; written through an asynchronous SDO request on change.
    WriteSdo,
}

/// Register layout of one optional object, relative to the channel base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectDesc {
    pub kind: ObjectKind,
    pub pin_name: &'static str,
    pub offset: u16,
    pub sub_idx: u8,
    pub bits: u8,
    pub signed: bool,
}

impl ObjectDesc {
    pub const fn pin_type(&self) -> PinType {
        if self.signed {
            PinType::S32
        } else {
            PinType::U32
        }
    }

    /// Object index for the channel whose objects start at `base`.
    pub const fn index(&self, base: u16) -> u16 {
        base + self.offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureDesc {
    pub feature: Feature,
    /// Name of the `enableXxx` modparam overriding this feature.
    pub config_name: &'static str,
    /// `None` for operating modes, which only imply other features.
    pub object: Option<ObjectDesc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    // operating modes
    Pp,
    Pv,
    Tq,
    Hm,
    Ip,
    Csp,
    Csv,
    Cst,
    Vl,
    // read PDOs
    ActualCurrent,
    ActualFollowingError,
    ActualPosition,
    ActualTorque,
    ActualVelocity,
    ActualVelocitySensor,
    ActualVl,
    ActualVoltage,
    ControlEffort,
    DemandVl,
    ErrorCode,
    OpmodeDisplay,
    PositionDemand,
    ProbeStatus,
    TorqueDemand,
    VelocityDemand,
    DigitalInput,
    // write PDOs
    Opmode,
    ProfileVelocity,
    TargetPosition,
    TargetTorque,
    TargetVelocity,
    TargetVl,
    DigitalOutput,
    // write SDOs
    FollowingErrorTimeout,
    FollowingErrorWindow,
    HomeAccel,
    HomeMethod,
    HomeVelocityFast,
    HomeVelocitySlow,
    InterpolationTimePeriod,
    MaximumAcceleration,
    MaximumCurrent,
    MaximumDeceleration,
    MaximumMotorRpm,
    MaximumSlippage,
    MaximumTorque,
    MotionProfile,
    MotorRatedCurrent,
    MotorRatedTorque,
    Polarity,
    PositioningTime,
    PositioningWindow,
    ProfileAccel,
    ProfileDecel,
    ProfileEndVelocity,
    ProfileMaxVelocity,
    TorqueProfileType,
    TorqueSlope,
    VelocityErrorTime,
    VelocityErrorWindow,
    VelocitySensorSelector,
    VelocityThresholdTime,
    VelocityThresholdWindow,
    VlAccel,
    VlDecel,
    VlMaximum,
    VlMinimum,
}

const fn mode(feature: Feature, config_name: &'static str) -> FeatureDesc {
    FeatureDesc {
        feature,
        config_name,
        object: None,
    }
}

const fn object(
    feature: Feature,
    config_name: &'static str,
    kind: ObjectKind,
    pin_name: &'static str,
    offset: u16,
    sub_idx: u8,
    bits: u8,
    signed: bool,
) -> FeatureDesc {
    FeatureDesc {
        feature,
        config_name,
        object: Some(ObjectDesc {
            kind,
            pin_name,
            offset,
            sub_idx,
            bits,
            signed,
        }),
    }
}

use self::Feature::*;
use self::ObjectKind::*;

const S: bool = true;
const U: bool = false;

/// One row per [Feature], in declaration order.
#[rustfmt::skip]
pub static FEATURES: [FeatureDesc; 67] = [
    mode(Pp, "enablePP"),
    mode(Pv, "enablePV"),
    mode(Tq, "enableTQ"),
    mode(Hm, "enableHM"),
    mode(Ip, "enableIP"),
    mode(Csp, "enableCSP"),
    mode(Csv, "enableCSV"),
    mode(Cst, "enableCST"),
    mode(Vl, "enableVL"),
    object(ActualCurrent, "enableActualCurrent", ReadPdo, "actual-current", 0x78, 0, 16, S),
    object(ActualFollowingError, "enableActualFollowingError", ReadPdo, "actual-following-error", 0xf4, 0, 32, U),
    object(ActualPosition, "enableActualPosition", ReadPdo, "actual-position", 0x64, 0, 32, S),
    object(ActualTorque, "enableActualTorque", ReadPdo, "actual-torque", 0x77, 0, 32, S),
    object(ActualVelocity, "enableActualVelocity", ReadPdo, "actual-velocity", 0x6c, 0, 32, S),
    object(ActualVelocitySensor, "enableActualVelocitySensor", ReadPdo, "actual-velocity-sensor", 0x69, 0, 32, S),
    object(ActualVl, "enableActualVL", ReadPdo, "actual-vl", 0x44, 0, 16, S),
    object(ActualVoltage, "enableActualVoltage", ReadPdo, "actual-voltage", 0x79, 0, 32, U),
    object(ControlEffort, "enableControlEffort", ReadPdo, "control-effort", 0xfa, 0, 32, S),
    object(DemandVl, "enableDemandVL", ReadPdo, "demand-vl", 0x43, 0, 16, S),
    object(ErrorCode, "enableErrorCode", ReadPdo, "error-code", 0x3f, 0, 16, U),
    object(OpmodeDisplay, "enableOpmodeDisplay", ReadPdo, "opmode-display", 0x61, 0, 8, S),
    object(PositionDemand, "enablePositionDemand", ReadPdo, "position-demand", 0x62, 0, 32, S),
    object(ProbeStatus, "enableProbeStatus", ReadPdo, "probe-status", 0xb9, 0, 16, U),
    object(TorqueDemand, "enableTorqueDemand", ReadPdo, "torque-demand", 0x74, 0, 16, S),
    object(VelocityDemand, "enableVelocityDemand", ReadPdo, "velocity-demand", 0x6b, 0, 32, S),
    object(DigitalInput, "enableDigitalInput", ReadPdo, "digital-input", 0xfd, 0, 32, U),
    object(Opmode, "enableOpmode", WritePdo, "opmode", 0x60, 0, 8, S),
    object(ProfileVelocity, "enableProfileVelocity", WritePdo, "profile-velocity", 0x81, 0, 32, U),
    object(TargetPosition, "enableTargetPosition", WritePdo, "target-position", 0x7a, 0, 32, S),
    object(TargetTorque, "enableTargetTorque", WritePdo, "target-torque", 0x71, 0, 16, S),
    object(TargetVelocity, "enableTargetVelocity", WritePdo, "target-velocity", 0xff, 0, 32, S),
    object(TargetVl, "enableTargetVL", WritePdo, "target-vl", 0x42, 0, 16, S),
    object(DigitalOutput, "enableDigitalOutput", WritePdo, "digital-output", 0xfe, 1, 32, U),
    object(FollowingErrorTimeout, "enableFollowingErrorTimeout", WriteSdo, "following-error-timeout", 0x66, 0, 16, U),
    object(FollowingErrorWindow, "enableFollowingErrorWindow", WriteSdo, "following-error-window", 0x65, 0, 32, U),
    object(HomeAccel, "enableHomeAccel", WriteSdo, "home-accel", 0x9a, 0, 32, U),
    object(HomeMethod, "enableHomeMethod", WriteSdo, "home-method", 0x98, 0, 8, S),
    object(HomeVelocityFast, "enableHomeVelocityFast", WriteSdo, "home-velocity-fast", 0x99, 1, 32, U),
    object(HomeVelocitySlow, "enableHomeVelocitySlow", WriteSdo, "home-velocity-slow", 0x99, 2, 32, U),
    object(InterpolationTimePeriod, "enableInterpolationTimePeriod", WriteSdo, "interpolation-time-period", 0xc2, 1, 8, U),
    object(MaximumAcceleration, "enableMaximumAcceleration", WriteSdo, "maximum-acceleration", 0xc5, 0, 32, U),
    object(MaximumCurrent, "enableMaximumCurrent", WriteSdo, "maximum-current", 0x73, 0, 16, U),
    object(MaximumDeceleration, "enableMaximumDeceleration", WriteSdo, "maximum-deceleration", 0xc6, 0, 32, U),
    object(MaximumMotorRpm, "enableMaximumMotorRPM", WriteSdo, "maximum-motor-rpm", 0x80, 0, 32, U),
    object(MaximumSlippage, "enableMaximumSlippage", WriteSdo, "maximum-slippage", 0xf8, 0, 32, S),
    object(MaximumTorque, "enableMaximumTorque", WriteSdo, "torque-maximum", 0x72, 0, 16, U),
    object(MotionProfile, "enableMotionProfile", WriteSdo, "motion-profile", 0x86, 0, 16, S),
    object(MotorRatedCurrent, "enableMotorRatedCurrent", WriteSdo, "motor-rated-current", 0x75, 0, 32, U),
    object(MotorRatedTorque, "enableMotorRatedTorque", WriteSdo, "motor-rated-torque", 0x76, 0, 32, U),
    object(Polarity, "enablePolarity", WriteSdo, "polarity", 0x7e, 0, 8, U),
    object(PositioningTime, "enablePositioningTime", WriteSdo, "positioning-time", 0x68, 0, 16, U),
    object(PositioningWindow, "enablePositioningWindow", WriteSdo, "positioning-window", 0x67, 0, 32, U),
    object(ProfileAccel, "enableProfileAccel", WriteSdo, "profile-accel", 0x83, 0, 32, U),
    object(ProfileDecel, "enableProfileDecel", WriteSdo, "profile-decel", 0x84, 0, 32, U),
    object(ProfileEndVelocity, "enableProfileEndVelocity", WriteSdo, "profile-end-velocity", 0x82, 0, 32, U),
    object(ProfileMaxVelocity, "enableProfileMaxVelocity", WriteSdo, "profile-max-velocity", 0x7f, 0, 32, U),
    object(TorqueProfileType, "enableTorqueProfileType", WriteSdo, "torque-profile-type", 0x88, 0, 16, S),
    object(TorqueSlope, "enableTorqueSlope", WriteSdo, "torque-slope", 0x87, 0, 32, U),
    object(VelocityErrorTime, "enableVelocityErrorTime", WriteSdo, "velocity-error-time", 0x6e, 0, 16, U),
    object(VelocityErrorWindow, "enableVelocityErrorWindow", WriteSdo, "velocity-error-window", 0x6d, 0, 16, U),
    object(VelocitySensorSelector, "enableVelocitySensorSelector", WriteSdo, "velocity-sensor-selector", 0x6a, 0, 16, S),
    object(VelocityThresholdTime, "enableVelocityThresholdTime", WriteSdo, "velocity-threshold-time", 0x70, 0, 16, U),
    object(VelocityThresholdWindow, "enableVelocityThresholdWindow", WriteSdo, "velocity-threshold-window", 0x6f, 0, 16, U),
    object(VlAccel, "enableVLAccel", WriteSdo, "vl-accel", 0x48, 0, 32, U),
    object(VlDecel, "enableVLDecel", WriteSdo, "vl-decel", 0x49, 0, 32, U),
    object(VlMaximum, "enableVLMaximum", WriteSdo, "vl-maximum", 0x46, 2, 16, S),
    object(VlMinimum, "enableVLMinimum", WriteSdo, "vl-minimum", 0x46, 1, 16, S),
];

/// Mode or object flag together with everything it requires.
pub static IMPLICATIONS: &[(Feature, &[Feature])] = &[
    (Opmode, &[OpmodeDisplay]),
    (Pp, &[ActualPosition, TargetPosition]),
    (Csp, &[ActualPosition, TargetPosition]),
    (Pv, &[ActualVelocity, TargetVelocity]),
    (Csv, &[ActualVelocity, TargetVelocity]),
    (Tq, &[ActualTorque, TargetTorque]),
    (Cst, &[ActualTorque, TargetTorque]),
    (Vl, &[ActualVl, TargetVl, DemandVl]),
    (Hm, &[HomeMethod, HomeVelocityFast, HomeVelocitySlow, HomeAccel]),
    (Ip, &[InterpolationTimePeriod, ActualPosition, TargetPosition]),
];

impl Feature {
    pub fn desc(self) -> &'static FeatureDesc {
        &FEATURES[self as usize]
    }

    pub fn object(self) -> Option<&'static ObjectDesc> {
        self.desc().object.as_ref()
    }

    pub fn config_name(self) -> &'static str {
        self.desc().config_name
    }

    /// Looks up a feature by its `enableXxx` name, ignoring case.
    pub fn from_config_name(name: &str) -> Option<Feature> {
        FEATURES
            .iter()
            .find(|d| d.config_name.eq_ignore_ascii_case(name))
            .map(|d| d.feature)
    }

    pub fn iter() -> impl Iterator<Item = Feature> {
        FEATURES.iter().map(|d| d.feature)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}

/// Bitmap keyed by [Feature].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FeatureSet(u128);

impl FeatureSet {
    pub const fn empty() -> Self {
        FeatureSet(0)
    }

    pub fn contains(&self, f: Feature) -> bool {
        self.0 & Self::bit(f) != 0
    }

    pub fn insert(&mut self, f: Feature) {
        self.0 |= Self::bit(f);
    }

    pub fn remove(&mut self, f: Feature) {
        self.0 &= !Self::bit(f);
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_superset(&self, other: &FeatureSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Members in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        Feature::iter().filter(move |f| self.contains(*f))
    }

    /// Members that are objects of the given kind, in declaration order.
    pub fn objects(
        &self,
        kind: ObjectKind,
    ) -> impl Iterator<Item = (Feature, &'static ObjectDesc)> + '_ {
        self.iter()
            .filter_map(|f| f.object().map(|o| (f, o)))
            .filter(move |(_, o)| o.kind == kind)
    }

    fn bit(f: Feature) -> u128 {
        1 << (f as u32)
    }
}

impl std::iter::FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        let mut set = FeatureSet::empty();
        for f in iter {
            set.insert(f);
        }
        set
    }
}

/// Features requested for one channel by a driver or by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureRequest {
    requested: FeatureSet,
}

impl FeatureRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, f: Feature) -> Self {
        self.enable(f);
        self
    }

    pub fn enable(&mut self, f: Feature) {
        self.requested.insert(f);
    }

    pub fn disable(&mut self, f: Feature) {
        self.requested.remove(f);
    }

    pub fn set(&mut self, f: Feature, enabled: bool) {
        if enabled {
            self.enable(f)
        } else {
            self.disable(f)
        }
    }

    pub fn is_requested(&self, f: Feature) -> bool {
        self.requested.contains(f)
    }

    /// Sets a feature by its `enableXxx` name.
    pub fn set_by_name(&mut self, name: &str, enabled: bool) -> Result<()> {
        let f = Feature::from_config_name(name)
            .ok_or_else(|| Error::UnknownFeature(name.to_string()))?;
        self.set(f, enabled);
        Ok(())
    }

    /// Closes the request under [IMPLICATIONS].
    pub fn resolve(&self) -> FeatureSet {
        let mut enabled = self.requested;
        loop {
            let before = enabled;
            for (trigger, implied) in IMPLICATIONS {
                if enabled.contains(*trigger) {
                    for f in implied.iter() {
                        enabled.insert(*f);
                    }
                }
            }
            if enabled == before {
                return enabled;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_feature() {
        for (i, d) in FEATURES.iter().enumerate() {
            assert_eq!(d.feature as usize, i, "{:?}", d.feature);
        }
        assert!(FEATURES.len() <= 128);
    }

    #[test]
    fn table_names_are_unique() {
        let mut names: Vec<_> =
            FEATURES.iter().map(|d| d.config_name.to_ascii_lowercase()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), FEATURES.len());

        let mut pins: Vec<_> =
            FEATURES.iter().filter_map(|d| d.object).map(|o| o.pin_name).collect();
        let n = pins.len();
        pins.sort();
        pins.dedup();
        assert_eq!(pins.len(), n);
    }

    #[test]
    fn object_layout() {
        let o = Feature::TargetPosition.object().unwrap();
        assert_eq!(o.index(0x6000), 0x607a);
        assert_eq!(o.index(0x6800), 0x687a);
        assert_eq!(o.pin_type(), PinType::S32);
        let o = Feature::ErrorCode.object().unwrap();
        assert_eq!((o.bits, o.pin_type()), (16, PinType::U32));
        assert_eq!(Feature::MaximumTorque.object().unwrap().pin_name, "torque-maximum");
        assert!(Feature::Csp.object().is_none());
    }

    #[test]
    fn lookup_by_config_name() {
        assert_eq!(Feature::from_config_name("enableCSP"), Some(Feature::Csp));
        assert_eq!(Feature::from_config_name("enablecsp"), Some(Feature::Csp));
        assert_eq!(
            Feature::from_config_name("enableMaximumMotorRPM"),
            Some(Feature::MaximumMotorRpm)
        );
        assert_eq!(Feature::from_config_name("enableWarpDrive"), None);

        let mut req = FeatureRequest::new();
        req.set_by_name("enableVLAccel", true).unwrap();
        assert!(req.is_requested(Feature::VlAccel));
        assert!(matches!(req.set_by_name("enableNothing", true), Err(Error::UnknownFeature(_))));
    }

    #[test]
    fn pp_implies_position_only() {
        let enabled = FeatureRequest::new().with(Feature::Pp).resolve();
        assert!(enabled.contains(Feature::ActualPosition));
        assert!(enabled.contains(Feature::TargetPosition));
        assert!(!enabled.contains(Feature::ActualVelocity));
        assert!(!enabled.contains(Feature::TargetVelocity));
        assert!(!enabled.contains(Feature::Opmode));
        assert_eq!(enabled.len(), 3);
    }

    #[test]
    fn mode_rules() {
        let e = FeatureRequest::new().with(Feature::Opmode).resolve();
        assert!(e.contains(Feature::OpmodeDisplay));

        let e = FeatureRequest::new().with(Feature::Vl).resolve();
        for f in &[Feature::ActualVl, Feature::TargetVl, Feature::DemandVl] {
            assert!(e.contains(*f));
        }

        let e = FeatureRequest::new().with(Feature::Hm).resolve();
        let sdos: Vec<_> = e.objects(ObjectKind::WriteSdo).map(|(f, _)| f).collect();
        assert_eq!(
            sdos,
            vec![
                Feature::HomeAccel,
                Feature::HomeMethod,
                Feature::HomeVelocityFast,
                Feature::HomeVelocitySlow
            ]
        );

        let e = FeatureRequest::new().with(Feature::Ip).resolve();
        assert!(e.contains(Feature::InterpolationTimePeriod));
        assert!(e.contains(Feature::TargetPosition));

        let e = FeatureRequest::new().with(Feature::Cst).resolve();
        assert!(e.contains(Feature::ActualTorque) && e.contains(Feature::TargetTorque));
    }

    #[test]
    fn prerequisites_survive_explicit_disable() {
        let mut req = FeatureRequest::new().with(Feature::Csp);
        req.disable(Feature::TargetPosition);
        assert!(req.resolve().contains(Feature::TargetPosition));
    }

    #[test]
    fn resolution_is_idempotent() {
        let req = FeatureRequest::new()
            .with(Feature::Csv)
            .with(Feature::Opmode)
            .with(Feature::DigitalInput);
        let a = req.resolve();
        let b = req.resolve();
        assert_eq!(a, b);

        // resolving an already closed set changes nothing
        let again: FeatureRequest = a.iter().fold(FeatureRequest::new(), |r, f| r.with(f));
        assert_eq!(again.resolve(), a);
    }

    #[test]
    fn resolution_is_monotone() {
        let modes = [Feature::Pp, Feature::Pv, Feature::Tq, Feature::Hm, Feature::Ip, Feature::Vl];
        for (i, &m) in modes.iter().enumerate() {
            let small = FeatureRequest::new().with(m);
            let mut big = small.with(Feature::ErrorCode);
            for &other in &modes[i..] {
                big.enable(other);
            }
            assert!(big.resolve().is_superset(&small.resolve()), "{:?}", m);
        }
    }

    #[test]
    fn objects_iterate_in_table_order() {
        let set: FeatureSet = vec![Feature::TargetVelocity, Feature::Opmode, Feature::DigitalOutput]
            .into_iter()
            .collect();
        let writes: Vec<_> = set.objects(ObjectKind::WritePdo).map(|(_, o)| o.pin_name).collect();
        assert_eq!(writes, vec!["opmode", "target-velocity", "digital-output"]);
        assert_eq!(set.objects(ObjectKind::ReadPdo).count(), 0);
    }
}
