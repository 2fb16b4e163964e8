// hn-core/src/units.rs

use uom::si::f64::{
    Area as UomArea, Energy as UomEnergy, Length as UomLength, Power as UomPower, Time as UomTime,
    Volume as UomVolume, VolumeRate as UomVolumeRate,
};

// Public canonical unit types (SI, f64)
pub type Area = UomArea;
pub type Energy = UomEnergy;
pub type Length = UomLength;
pub type Power = UomPower;
pub type Time = UomTime;
pub type Volume = UomVolume;
pub type VolumeRate = UomVolumeRate;

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn mm(v: f64) -> Length {
    use uom::si::length::millimeter;
    Length::new::<millimeter>(v)
}

#[inline]
pub fn lps(v: f64) -> VolumeRate {
    use uom::si::volume_rate::liter_per_second;
    VolumeRate::new::<liter_per_second>(v)
}

#[inline]
pub fn m3ps(v: f64) -> VolumeRate {
    use uom::si::volume_rate::cubic_meter_per_second;
    VolumeRate::new::<cubic_meter_per_second>(v)
}

#[inline]
pub fn kw(v: f64) -> Power {
    use uom::si::power::kilowatt;
    Power::new::<kilowatt>(v)
}

#[inline]
pub fn hours(v: f64) -> Time {
    use uom::si::time::hour;
    Time::new::<hour>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

/// Length in meters.
#[inline]
pub fn to_m(v: Length) -> f64 {
    use uom::si::length::meter;
    v.get::<meter>()
}

/// Volume rate in liters per second.
#[inline]
pub fn to_lps(v: VolumeRate) -> f64 {
    use uom::si::volume_rate::liter_per_second;
    v.get::<liter_per_second>()
}

/// Volume rate in cubic meters per second.
#[inline]
pub fn to_m3ps(v: VolumeRate) -> f64 {
    use uom::si::volume_rate::cubic_meter_per_second;
    v.get::<cubic_meter_per_second>()
}

/// Energy in kilowatt-hours.
#[inline]
pub fn to_kwh(v: Energy) -> f64 {
    use uom::si::energy::kilowatt_hour;
    v.get::<kilowatt_hour>()
}

/// Volume in cubic meters.
#[inline]
pub fn to_m3(v: Volume) -> f64 {
    use uom::si::volume::cubic_meter;
    v.get::<cubic_meter>()
}

/// Area in square meters.
#[inline]
pub fn to_m2(v: Area) -> f64 {
    use uom::si::area::square_meter;
    v.get::<square_meter>()
}

/// Circular cross-section area of a pipe or tank of the given diameter.
#[inline]
pub fn circle_area(diameter: Length) -> Area {
    diameter * diameter * (core::f64::consts::PI / 4.0)
}

pub mod constants {
    /// Standard gravity (m/s²).
    pub const G: f64 = 9.806_65;
    /// Density of water used for pump power (kg/m³).
    pub const RHO_WATER: f64 = 1000.0;
    /// Liters per second to cubic meters per hour.
    pub const LPS_TO_M3PH: f64 = 3.6;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_conversions() {
        assert!((to_m3ps(lps(50.0)) - 0.05).abs() < 1e-12);
        assert!((to_lps(m3ps(0.002)) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn millimeters_to_meters() {
        assert!((to_m(mm(300.0)) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn power_over_time_is_kwh() {
        let e: Energy = kw(15.0) * hours(2.0);
        assert!((to_kwh(e) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn tank_volume_from_area_and_level() {
        let v: Volume = circle_area(m(10.0)) * m(1.0);
        assert!((to_m3(v) - 78.539_816).abs() < 1e-5);
    }

    #[test]
    fn lps_hours_matches_volume_constant() {
        // 1 L/s for one hour is 3.6 m³
        let v: Volume = lps(1.0) * hours(1.0);
        assert!((to_m3(v) - constants::LPS_TO_M3PH).abs() < 1e-9);
    }
}
