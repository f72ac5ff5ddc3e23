//! # Solar Position
//!
//! Low-precision solar ephemeris (Meeus, *Astronomical Algorithms*, ch. 25) evaluated at
//! local noon. It is accurate to well under a minute of time for prayer purposes between
//! 1950 and 2050, which is all a wall clock needs.
//!
//! ## Quantities
//! - **Declination**: angle of the sun north (+) or south (−) of the celestial equator
//! - **Equation of time**: apparent minus mean solar time, in minutes
//! - **Solar noon**: local clock time of the sun's transit, in fractional hours
//!
//! ## Hour Angles
//! Every prayer except Dhuhr is "the moment the sun reaches altitude `a`", which is solar
//! noon ± an hour angle. [`hour_angle`] solves that and reports when it has no solution:
//! near the poles, or when the sun never rises or sets far enough that day.

use crate::config::Location;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use thiserror::Error;

/// Latitudes beyond this are treated as polar; the hour-angle denominator vanishes at ±90°.
pub const MAX_LATITUDE: f64 = 89.9;

const J2000: f64 = 2_451_545.0;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum UnsolvableGeometry {
    #[error("latitude {latitude:.3}° is too close to a pole")]
    PolarLatitude { latitude: f64 },
    #[error("the sun never reaches {altitude:.3}° (cos h = {argument:.4})")]
    AltitudeNotReached { altitude: f64, argument: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolarPosition {
    /// 1-based day of the year
    pub day_of_year: u32,
    /// Degrees
    pub declination: f64,
    /// Minutes
    pub equation_of_time: f64,
    /// Local clock hours (may exceed 24 or go negative for extreme offsets)
    pub solar_noon: f64,
}

/// Julian day number at 0h UT of `date`.
pub fn julian_day(date: NaiveDate) -> f64 {
    // JD of 0001-01-01 (proleptic Gregorian) is 1721425.5; num_days_from_ce counts it as day 1
    1_721_424.5 + f64::from(date.num_days_from_ce())
}

/// Sun position at local noon on `date` for `location`.
///
/// The instant used is noon in the location's effective offset (daylight saving
/// included), and so is the returned `solar_noon`.
pub fn solar_position(
    date: NaiveDate,
    location: &Location,
) -> Result<SolarPosition, UnsolvableGeometry> {
    if location.latitude.abs() > MAX_LATITUDE {
        return Err(UnsolvableGeometry::PolarLatitude {
            latitude: location.latitude,
        });
    }

    let offset = location.offset_hours_on(date);
    let jd = julian_day(date) + 0.5 - offset / 24.0;
    let t = (jd - J2000) / 36_525.0;

    let mean_longitude = (280.46646 + 36_000.76983 * t + 0.000_303_2 * t * t).rem_euclid(360.0);
    let mean_anomaly = (357.52911 + 35_999.05029 * t - 0.000_153_7 * t * t).rem_euclid(360.0);
    let m = mean_anomaly.to_radians();

    let center = (1.914_602 - 0.004_817 * t - 0.000_014 * t * t) * m.sin()
        + (0.019_993 - 0.000_101 * t) * (2.0 * m).sin()
        + 0.000_289 * (3.0 * m).sin();
    let true_longitude = (mean_longitude + center).to_radians();
    let obliquity = (23.439_291 - 0.013_004_2 * t).to_radians();

    let declination = (obliquity.sin() * true_longitude.sin()).asin().to_degrees();
    let right_ascension = (obliquity.cos() * true_longitude.sin())
        .atan2(true_longitude.cos())
        .to_degrees()
        .rem_euclid(360.0);

    let equation_of_time = normalize_degrees(mean_longitude - right_ascension) * 4.0;
    let solar_noon = 12.0 + offset - location.longitude / 15.0 - equation_of_time / 60.0;

    Ok(SolarPosition {
        day_of_year: date.ordinal(),
        declination,
        equation_of_time,
        solar_noon,
    })
}

/// Wrap an angle into (−180°, 180°].
fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Hours between solar noon and the moment the sun sits at `altitude` degrees.
pub fn hour_angle(
    latitude: f64,
    declination: f64,
    altitude: f64,
) -> Result<f64, UnsolvableGeometry> {
    if latitude.abs() > MAX_LATITUDE {
        return Err(UnsolvableGeometry::PolarLatitude { latitude });
    }
    let argument = hour_angle_argument(latitude, declination, altitude);
    if !(-1.0..=1.0).contains(&argument) {
        return Err(UnsolvableGeometry::AltitudeNotReached { altitude, argument });
    }
    Ok(argument.acos().to_degrees() / 15.0)
}

/// Like [`hour_angle`], but clamps an out-of-range argument to the nearest extreme:
/// 0 h when the sun never climbs that high, 12 h when it never sinks that low.
pub fn clamped_hour_angle(latitude: f64, declination: f64, altitude: f64) -> f64 {
    let latitude = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let argument = hour_angle_argument(latitude, declination, altitude);
    if argument.is_nan() {
        return 0.0;
    }
    argument.clamp(-1.0, 1.0).acos().to_degrees() / 15.0
}

fn hour_angle_argument(latitude: f64, declination: f64, altitude: f64) -> f64 {
    let (lat, dec, alt) = (
        latitude.to_radians(),
        declination.to_radians(),
        altitude.to_radians(),
    );
    (alt.sin() - lat.sin() * dec.sin()) / (lat.cos() * dec.cos())
}

/// Sun altitude at which an object's shadow is `shadow_factor` times its length plus
/// its noon shadow.
///
/// `None` when the sun stays below the horizon at noon: there is no noon shadow to
/// measure from.
pub fn asr_altitude(latitude: f64, declination: f64, shadow_factor: f64) -> Option<f64> {
    let noon_zenith = (latitude - declination).abs();
    if noon_zenith >= 90.0 {
        return None;
    }
    let altitude = (1.0 / (shadow_factor + noon_zenith.to_radians().tan()))
        .atan()
        .to_degrees();
    (altitude > 0.0).then_some(altitude)
}
