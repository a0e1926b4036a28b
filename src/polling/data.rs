use chrono::{Local, NaiveDateTime, Timelike};

/// Full-scale raw register value.
pub const RAW_FULL_SCALE: f64 = 65535.0;
/// Current loop range in mA: 4 mA at raw 0, 20 mA at full scale.
pub const LOOP_MIN_MA: f64 = 4.0;
pub const LOOP_SPAN_MA: f64 = 16.0;
/// Mass range covered by the 4-20 mA span, in kg.
pub const MASS_MAX_KG: f64 = 163.0;
pub const MASS_MIN_KG: f64 = 5.0;

/// Loop current ("toc") for a raw register value. Not clamped.
pub fn toc_from_raw(raw: u16) -> f64 {
    (LOOP_SPAN_MA * f64::from(raw)) / RAW_FULL_SCALE + LOOP_MIN_MA
}

/// Mass in kg for a loop current. Not clamped.
pub fn mass_from_toc(toc: f64) -> f64 {
    ((toc - LOOP_MIN_MA) * (MASS_MAX_KG - MASS_MIN_KG)) / LOOP_SPAN_MA
}

/// One successful reading
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: NaiveDateTime, // local wall clock, whole seconds
    pub raw: u16,
    pub toc: f64,
    pub p_kg: f64,
}

impl Sample {
    pub fn from_raw(raw: u16, timestamp: NaiveDateTime) -> Self {
        let toc = toc_from_raw(raw);
        Sample {
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
            raw,
            toc,
            p_kg: mass_from_toc(toc),
        }
    }

    pub fn now(raw: u16) -> Self {
        Self::from_raw(raw, Local::now().naive_local())
    }
}
