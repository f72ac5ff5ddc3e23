//! Built-in city table for the settings tab's location picker.

use crate::config::{DstRule, Location};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct City {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    pub utc_offset_hours: f64,
    pub dst: DstRule,
}

impl City {
    pub fn to_location(&self) -> Location {
        Location {
            name: self.name.to_string(),
            latitude: self.latitude,
            longitude: self.longitude,
            utc_offset_hours: self.utc_offset_hours,
            dst: self.dst,
        }
    }
}

const fn us(name: &'static str, latitude: f64, longitude: f64, utc_offset_hours: f64) -> City {
    City {
        name,
        latitude,
        longitude,
        utc_offset_hours,
        dst: DstRule::UnitedStates,
    }
}

pub const CITIES: [City; 25] = [
    us("New York", 40.7128, -74.0060, -5.0),
    us("Los Angeles", 34.0522, -118.2437, -8.0),
    us("Chicago", 41.8781, -87.6298, -6.0),
    us("Houston", 29.7604, -95.3698, -6.0),
    // Arizona stays on MST
    City {
        name: "Phoenix",
        latitude: 33.4484,
        longitude: -112.0740,
        utc_offset_hours: -7.0,
        dst: DstRule::None,
    },
    us("Philadelphia", 39.9526, -75.1652, -5.0),
    us("San Antonio", 29.4241, -98.4936, -6.0),
    us("San Diego", 32.7157, -117.1611, -8.0),
    us("Dallas", 32.7767, -96.7970, -6.0),
    us("Detroit", 42.3314, -83.0458, -5.0),
    us("Miami", 25.7617, -80.1918, -5.0),
    us("Boston", 42.3601, -71.0589, -5.0),
    us("Seattle", 47.6062, -122.3321, -8.0),
    us("Denver", 39.7392, -104.9903, -7.0),
    us("Washington DC", 38.9072, -77.0369, -5.0),
    us("Atlanta", 33.7490, -84.3880, -5.0),
    us("Las Vegas", 36.1699, -115.1398, -8.0),
    us("San Francisco", 37.7749, -122.4194, -8.0),
    us("Portland", 45.5152, -122.6784, -8.0),
    us("Minneapolis", 44.9778, -93.2650, -6.0),
    us("Salt Lake City", 40.7608, -111.8910, -7.0),
    us("Kansas City", 39.0997, -94.5786, -6.0),
    us("St. Louis", 38.6270, -90.1994, -6.0),
    us("Orlando", 28.5383, -81.3792, -5.0),
    us("Tampa", 27.9506, -82.4572, -5.0),
];

pub fn find(name: &str) -> Option<&'static City> {
    CITIES.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

/// The city after `name` in the table, wrapping around.
///
/// A custom location that is not in the table steps to the first city.
pub fn next_after(name: &str) -> &'static City {
    match CITIES.iter().position(|c| c.name == name) {
        Some(i) => &CITIES[(i + 1) % CITIES.len()],
        None => &CITIES[0],
    }
}

/// The city before `name` in the table, wrapping around.
pub fn previous_before(name: &str) -> &'static City {
    match CITIES.iter().position(|c| c.name == name) {
        Some(i) => &CITIES[(i + CITIES.len() - 1) % CITIES.len()],
        None => &CITIES[CITIES.len() - 1],
    }
}
