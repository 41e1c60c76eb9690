use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The category of a [`Priority`].
///
/// At equal rank, events of a lower category are raised first, following the
/// declaration order of the variants.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PriorityCategory {
    /// Bookkeeping events that must observe the state before user events
    /// mutate it.
    System,
    /// Ordinary domain events.
    #[default]
    User,
    /// Events that must observe the state after all user events of the same
    /// rank were raised, such as statistics collectors.
    Observer,
}

/// An ordering key used to break ties between events filed at the same time.
///
/// Priorities are ordered by ascending rank, then by [`PriorityCategory`].
/// Events with equal priorities are raised in the order they were filed.
///
/// # Examples
///
/// ```
/// use eventide::event::{Priority, PriorityCategory};
///
/// assert!(Priority::user(0.0) < Priority::user(1.0));
/// assert!(Priority::system(1.0) < Priority::user(1.0));
/// assert!(Priority::user(1.0) < Priority::observer(1.0));
/// assert_eq!(Priority::from(2.0), Priority::new(2.0, PriorityCategory::User));
/// ```
#[derive(Copy, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Priority {
    rank: f64,
    category: PriorityCategory,
}

impl Priority {
    /// Creates a priority with the specified rank and category.
    ///
    /// # Panics
    ///
    /// This function panics if `rank` is `NaN`.
    pub fn new(rank: f64, category: PriorityCategory) -> Self {
        assert!(!rank.is_nan(), "a priority rank cannot be NaN");

        // Normalize -0.0 so that both zeros compare equal.
        let rank = if rank == 0.0 { 0.0 } else { rank };

        Self { rank, category }
    }

    /// Creates a priority of the [`PriorityCategory::User`] category.
    pub fn user(rank: f64) -> Self {
        Self::new(rank, PriorityCategory::User)
    }

    /// Creates a priority of the [`PriorityCategory::System`] category.
    pub fn system(rank: f64) -> Self {
        Self::new(rank, PriorityCategory::System)
    }

    /// Creates a priority of the [`PriorityCategory::Observer`] category.
    pub fn observer(rank: f64) -> Self {
        Self::new(rank, PriorityCategory::Observer)
    }

    /// Returns the numeric rank.
    pub fn rank(&self) -> f64 {
        self.rank
    }

    /// Returns the category.
    pub fn category(&self) -> PriorityCategory {
        self.category
    }
}

impl From<f64> for Priority {
    fn from(rank: f64) -> Self {
        Self::user(rank)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Priority {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        struct RawPriority {
            rank: f64,
            #[serde(default)]
            category: PriorityCategory,
        }

        let raw = RawPriority::deserialize(deserializer)?;
        if raw.rank.is_nan() {
            return Err(serde::de::Error::custom("a priority rank cannot be NaN"));
        }

        Ok(Self::new(raw.rank, raw.category))
    }
}

impl PartialEq for Priority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Priority {}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .total_cmp(&other.rank)
            .then_with(|| self.category.cmp(&other.category))
    }
}

impl Hash for Priority {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank.to_bits().hash(state);
        self.category.hash(state);
    }
}

impl fmt::Debug for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Priority")
            .field("rank", &self.rank)
            .field("category", &self.category)
            .finish()
    }
}
