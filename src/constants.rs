//! Single source of truth for every physical constant used by the force model.
//!
//! §3 invariant (iii): GM values, `c`, and the ephemeris scale factor come from this module
//! alone. No force term may hand-code a constant that also appears here.

use crate::frame::Frame;
use lazy_static::lazy_static;

/// 1 AU in kilometers (IAU 2012 definition).
pub const AU_KM: f64 = 149_597_870.700;

/// Speed of light, AU/day.
pub const C_AU_PER_DAY: f64 = 173.144_632_674_240_31;

/// Gravitational constant, AU^3 * Msun^-1 * day^-2.
pub const G: f64 = 2.959_122_082_841_196e-4;

/// Seconds per day, for unit conversions at the ephemeris boundary (not used internally:
/// rescaling raw ephemeris units is the `PlanetaryEphemeris` implementor's job).
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Earth equatorial radius, AU.
pub const R_EARTH_EQ_AU: f64 = 6378.1366 / AU_KM;
pub const J2_EARTH: f64 = 1.082_625_390_0e-3; // DE441-aligned (spec Open Question iii)
pub const J4_EARTH: f64 = -1.619_898e-6;

/// Sun equatorial radius, AU.
pub const R_SUN_EQ_AU: f64 = 696_000.0 / AU_KM;
pub const J2_SUN: f64 = 2.196_139e-7;

pub const N_EPHEM: usize = 11;
pub const N_AST: usize = 16;
pub const N_PERTURBERS: usize = N_EPHEM + N_AST;

/// Index of the Sun and Earth within the planetary-ephemeris block, fixed by convention
/// across the whole crate (façade, aggregator, force terms).
pub const SUN: usize = 0;
pub const EARTH: usize = 3;

/// GM of every planetary-ephemeris body, AU^3/day^2. Converted from the standard
/// DE440/DE441 km^3/s^2 values via `km3_s2_to_au3_day2`.
pub const PLANETARY_GM_KM3_S2: [f64; N_EPHEM] = [
    1.327_124_400_18e11, // Sun
    2.203_186_855_1e4,   // Mercury
    3.248_585_920_0e5,   // Venus
    3.986_004_355_07e5,  // Earth
    4.902_800_118e3,     // Moon
    4.282_837_362_069e4, // Mars (system)
    1.267_127_648_00e8,  // Jupiter (system)
    3.794_058_520_00e7,  // Saturn (system)
    5.794_549_000_00e6,  // Uranus (system)
    6.836_534_064_00e6,  // Neptune (system)
    9.770_000_000_00e2,  // Pluto (system)
];

pub const PLANETARY_NAMES: [&str; N_EPHEM] = [
    "Sun", "Mercury", "Venus", "Earth", "Moon", "Mars", "Jupiter", "Saturn", "Uranus", "Neptune",
    "Pluto",
];

/// GM of the 16 massive main-belt asteroids tracked by the default `sb441-n16.bsp` ephemeris,
/// in km^3/s^2 (public-domain mass estimates, e.g. Baer, Chesley & Matson 2011).
pub const ASTEROID_GM_KM3_S2: [f64; N_AST] = [
    62.6325,  // 1 Ceres
    13.63,    // 2 Pallas
    1.81,     // 3 Juno
    17.288,   // 4 Vesta
    5.78,     // 10 Hygiea
    2.1,      // 15 Eunomia
    1.53,     // 16 Psyche
    1.06,     // 31 Euphrosyne
    1.59,     // 52 Europa
    1.07,     // 65 Cybele
    3.04,     // 87 Sylvia
    0.817,    // 88 Thisbe
    1.12,     // 107 Camilla
    2.37,     // 511 Davida
    2.03,     // 704 Interamnia
    0.876,    // 7 Iris
];

pub const ASTEROID_NAMES: [&str; N_AST] = [
    "Ceres",
    "Pallas",
    "Juno",
    "Vesta",
    "Hygiea",
    "Eunomia",
    "Psyche",
    "Euphrosyne",
    "Europa",
    "Cybele",
    "Sylvia",
    "Thisbe",
    "Camilla",
    "Davida",
    "Interamnia",
    "Iris",
];

/// Converts a GM expressed in km^3/s^2 to AU^3/day^2 using the `AU_KM`/`SECONDS_PER_DAY`
/// constants above, so every perturber's GM is derived from the same table rather than
/// hand-converted ad hoc.
pub const fn km3_s2_to_au3_day2(gm_km3_s2: f64) -> f64 {
    let day_s = SECONDS_PER_DAY;
    gm_km3_s2 * (day_s * day_s) / (AU_KM * AU_KM * AU_KM)
}

/// GM, AU^3/day^2, for perturber index `i` (`0..N_PERTURBERS`). This is the single
/// entry point every force term and the façade use to look up a perturber's mass.
pub fn perturber_gm(i: usize) -> Option<f64> {
    if i < N_EPHEM {
        Some(km3_s2_to_au3_day2(PLANETARY_GM_KM3_S2[i]))
    } else if i < N_PERTURBERS {
        Some(km3_s2_to_au3_day2(ASTEROID_GM_KM3_S2[i - N_EPHEM]))
    } else {
        None
    }
}

pub fn perturber_name(i: usize) -> Option<&'static str> {
    if i < N_EPHEM {
        Some(PLANETARY_NAMES[i])
    } else if i < N_PERTURBERS {
        Some(ASTEROID_NAMES[i - N_EPHEM])
    } else {
        None
    }
}

lazy_static! {
    /// Earth's body-fixed frame at J2000: pole along the ICRF z-axis, up to the
    /// sub-arcsecond drift the spec explicitly declines to model (§4.B).
    pub static ref EARTH_POLE: Frame = Frame::from_pole(0.0, 90.0);
    /// Sun's body-fixed frame, pole RA/Dec from the IAU working-group report.
    pub static ref SUN_POLE: Frame = Frame::from_pole(286.13, 63.87);
}
