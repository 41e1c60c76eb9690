use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, AddAssign, Sub};

/// A totally ordered simulation timestamp.
///
/// See the [module-level documentation](crate::time) for more details.
#[derive(Copy, Clone, Default)]
pub struct SimTime(f64);

impl SimTime {
    /// The origin of simulation time.
    pub const ZERO: Self = Self(0.0);

    /// A timestamp that lies after any finite timestamp.
    pub const INFINITY: Self = Self(f64::INFINITY);

    /// Creates a timestamp from a floating-point value.
    ///
    /// # Panics
    ///
    /// This function panics if `time` is `NaN`. See [`SimTime::try_new`] for a
    /// non-panicking alternative.
    pub fn new(time: f64) -> Self {
        match Self::try_new(time) {
            Some(t) => t,
            None => panic!("simulation time cannot be NaN"),
        }
    }

    /// Creates a timestamp from a floating-point value, or returns `None` if
    /// the value is `NaN`.
    pub fn try_new(time: f64) -> Option<Self> {
        if time.is_nan() {
            return None;
        }
        // Normalize -0.0 so that both zeros map to the same moment.
        if time == 0.0 {
            return Some(Self::ZERO);
        }

        Some(Self(time))
    }

    /// Returns the timestamp as a floating-point value.
    pub const fn as_f64(self) -> f64 {
        self.0
    }

    /// Returns `true` if the timestamp is neither infinite nor `NaN`.
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// Adds a (possibly negative) offset, returning `None` if the result is
    /// `NaN`.
    pub fn checked_add(self, offset: f64) -> Option<Self> {
        Self::try_new(self.0 + offset)
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for SimTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl From<f64> for SimTime {
    /// Converts a floating-point value to a timestamp.
    ///
    /// # Panics
    ///
    /// This panics if the value is `NaN`.
    fn from(time: f64) -> Self {
        Self::new(time)
    }
}

impl From<SimTime> for f64 {
    fn from(time: SimTime) -> Self {
        time.0
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SimTime {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for SimTime {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let time = f64::deserialize(deserializer)?;

        Self::try_new(time)
            .ok_or_else(|| serde::de::Error::custom("simulation time cannot be NaN"))
    }
}

impl Add<f64> for SimTime {
    type Output = Self;

    /// Offsets the timestamp.
    ///
    /// # Panics
    ///
    /// This panics if the result is `NaN`, which happens when adding an
    /// infinite offset of opposite sign to an infinite timestamp.
    fn add(self, offset: f64) -> Self {
        Self::new(self.0 + offset)
    }
}

impl AddAssign<f64> for SimTime {
    fn add_assign(&mut self, offset: f64) {
        *self = *self + offset;
    }
}

impl Sub for SimTime {
    type Output = f64;

    fn sub(self, other: Self) -> f64 {
        self.0 - other.0
    }
}

impl fmt::Debug for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
