//! Decimal-degree to EXIF DMS rational conversion.
//!
//! EXIF stores a coordinate as three unsigned rationals (degrees, minutes,
//! seconds) plus a one-letter hemisphere reference. [`to_dms`] is the pure
//! encoder; [`DmsTriple::to_decimal`] reconstructs the absolute value for
//! round-trip checks.

/// Denominator applied to the seconds rational.
///
/// 1/10000 of a second of arc is roughly 3 mm on the ground, comfortably
/// below GPS receiver accuracy.
pub const SECONDS_SCALE: u32 = 10_000;

/// Sign of a coordinate, carried separately from its DMS magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    Positive,
    Negative,
}

impl Hemisphere {
    /// EXIF GPSLatitudeRef value for this sign.
    pub fn latitude_ref(self) -> &'static str {
        match self {
            Hemisphere::Positive => "N",
            Hemisphere::Negative => "S",
        }
    }

    /// EXIF GPSLongitudeRef value for this sign.
    pub fn longitude_ref(self) -> &'static str {
        match self {
            Hemisphere::Positive => "E",
            Hemisphere::Negative => "W",
        }
    }
}

/// Degrees, minutes, and seconds of an unsigned coordinate, each as a
/// `(numerator, denominator)` pair. Degrees and minutes use denominator 1;
/// seconds use [`SECONDS_SCALE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmsTriple {
    pub degrees: (u32, u32),
    pub minutes: (u32, u32),
    pub seconds: (u32, u32),
}

impl DmsTriple {
    /// Reconstruct the absolute decimal-degree value.
    pub fn to_decimal(&self) -> f64 {
        let degrees = self.degrees.0 as f64 / self.degrees.1 as f64;
        let minutes = self.minutes.0 as f64 / self.minutes.1 as f64;
        let seconds = self.seconds.0 as f64 / self.seconds.1 as f64;
        degrees + minutes / 60.0 + seconds / 3600.0
    }

    /// The three rationals in EXIF field order.
    pub fn rationals(&self) -> [(u32, u32); 3] {
        [self.degrees, self.minutes, self.seconds]
    }
}

/// Split a signed decimal-degree coordinate into a DMS rational triple and a
/// hemisphere sign.
///
/// Total over finite doubles: out-of-range magnitudes still produce a
/// mathematically valid triple (range enforcement is the caller's job).
/// Zero is treated as positive, so `0.0` maps to `N`/`E`.
///
/// When the scaled seconds round up to a full minute the carry is propagated
/// into minutes (and degrees), so the seconds numerator is always below
/// `60 * SECONDS_SCALE`.
pub fn to_dms(value: f64) -> (DmsTriple, Hemisphere) {
    let sign = if value >= 0.0 {
        Hemisphere::Positive
    } else {
        Hemisphere::Negative
    };

    let abs = value.abs();
    let mut degrees = abs.floor() as u32;
    let minutes_float = (abs - abs.floor()) * 60.0;
    let mut minutes = minutes_float.floor() as u32;
    let mut seconds = ((minutes_float - minutes_float.floor()) * 60.0 * SECONDS_SCALE as f64)
        .round() as u32;

    if seconds == 60 * SECONDS_SCALE {
        seconds = 0;
        minutes += 1;
        if minutes == 60 {
            minutes = 0;
            degrees += 1;
        }
    }

    (
        DmsTriple {
            degrees: (degrees, 1),
            minutes: (minutes, 1),
            seconds: (seconds, SECONDS_SCALE),
        },
        sign,
    )
}
