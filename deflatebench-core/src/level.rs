//! Level-indexed containers
//!
//! Compression levels form a small, dense, inclusive range. `LevelMap` stores
//! exactly one value per level in ascending order so lookups never go through
//! string keys.

use std::ops::{Index, IndexMut, RangeInclusive};

/// Inclusive range of compression levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelRange {
    min: u32,
    max: u32,
}

impl LevelRange {
    /// Create a range; returns `None` when `min > max`
    pub fn new(min: u32, max: u32) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    /// Lowest level
    pub fn min(&self) -> u32 {
        self.min
    }

    /// Highest level
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Number of levels in the range
    pub fn len(&self) -> usize {
        (self.max - self.min) as usize + 1
    }

    /// Always false; a range holds at least one level
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `level` lies inside the range
    pub fn contains(&self, level: u32) -> bool {
        (self.min..=self.max).contains(&level)
    }

    /// Ascending iterator over all levels
    pub fn iter(&self) -> RangeInclusive<u32> {
        self.min..=self.max
    }

    fn offset(&self, level: u32) -> Option<usize> {
        self.contains(level).then(|| (level - self.min) as usize)
    }
}

impl IntoIterator for LevelRange {
    type Item = u32;
    type IntoIter = RangeInclusive<u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One value per level of a `LevelRange`
#[derive(Debug, Clone, PartialEq)]
pub struct LevelMap<T> {
    range: LevelRange,
    values: Vec<T>,
}

impl<T> LevelMap<T> {
    /// Build a map by evaluating `f` for every level in ascending order
    pub fn from_fn(range: LevelRange, f: impl FnMut(u32) -> T) -> Self {
        Self {
            range,
            values: range.iter().map(f).collect(),
        }
    }

    /// Fallible variant of [`LevelMap::from_fn`]; stops at the first error
    pub fn try_from_fn<E>(
        range: LevelRange,
        f: impl FnMut(u32) -> Result<T, E>,
    ) -> Result<Self, E> {
        Ok(Self {
            range,
            values: range.iter().map(f).collect::<Result<_, _>>()?,
        })
    }

    /// Level range covered by this map
    pub fn range(&self) -> LevelRange {
        self.range
    }

    /// Value for `level`, if it is in range
    pub fn get(&self, level: u32) -> Option<&T> {
        self.range.offset(level).map(|i| &self.values[i])
    }

    /// Mutable value for `level`, if it is in range
    pub fn get_mut(&mut self, level: u32) -> Option<&mut T> {
        self.range.offset(level).map(|i| &mut self.values[i])
    }

    /// `(level, value)` pairs in ascending level order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.range.iter().zip(self.values.iter())
    }

    /// Values in ascending level order
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    /// Transform every value, keeping the range
    pub fn map<U>(&self, mut f: impl FnMut(u32, &T) -> U) -> LevelMap<U> {
        LevelMap {
            range: self.range,
            values: self.iter().map(|(level, v)| f(level, v)).collect(),
        }
    }
}

impl<T> Index<u32> for LevelMap<T> {
    type Output = T;

    fn index(&self, level: u32) -> &T {
        match self.get(level) {
            Some(v) => v,
            None => panic!("level {level} outside range {:?}", self.range),
        }
    }
}

impl<T> IndexMut<u32> for LevelMap<T> {
    fn index_mut(&mut self, level: u32) -> &mut T {
        let range = self.range;
        match self.get_mut(level) {
            Some(v) => v,
            None => panic!("level {level} outside range {range:?}"),
        }
    }
}
