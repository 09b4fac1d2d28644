//! Per-biome tables mapping a raw noise value to a ground height and material.

use strata_blocks::MaterialId;
use thiserror::Error;

use crate::biome::{BIOME_COUNT, BiomeType};

#[derive(Clone, Debug, PartialEq)]
pub struct Decoration {
    pub item: String,
    pub material: MaterialId,
    pub weight: f32,
}

/// One band of a landscape table, active from `threshold` up to the next entry.
#[derive(Clone, Debug, PartialEq)]
pub struct LandscapeEntry {
    pub threshold: f32,
    pub height: f32,
    pub material: MaterialId,
    pub decorations: Vec<Decoration>,
}

impl LandscapeEntry {
    pub fn new(threshold: f32, height: f32, material: MaterialId) -> Self {
        Self {
            threshold,
            height,
            material,
            decorations: Vec::new(),
        }
    }

    pub fn decoration_weight(&self) -> f32 {
        self.decorations.iter().map(|d| d.weight.max(0.0)).sum()
    }

    /// Weighted pick with `r` in `[0, 1)`.
    pub fn pick_decoration(&self, r: f32) -> Option<&Decoration> {
        let total = self.decoration_weight();
        if total <= 0.0 {
            return None;
        }
        let target = r * total;
        let mut acc = 0.0_f32;
        for d in &self.decorations {
            acc += d.weight.max(0.0);
            if target < acc {
                return Some(d);
            }
        }
        self.decorations.last()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LandscapeError {
    #[error("landscape table is empty")]
    Empty,
    #[error("landscape thresholds must ascend (entry {index}: {threshold} after {previous})")]
    Unordered {
        index: usize,
        threshold: f32,
        previous: f32,
    },
    #[error("landscape value out of [0, 1] at entry {index}")]
    OutOfRange { index: usize },
}

#[derive(Clone, Copy, Debug)]
pub struct Bracket<'a> {
    pub lower: &'a LandscapeEntry,
    pub upper: &'a LandscapeEntry,
    pub fraction: f32,
}

impl Bracket<'_> {
    #[inline]
    pub fn height(&self) -> f32 {
        self.lower.height + (self.upper.height - self.lower.height) * self.fraction
    }
}

/// Entries sorted by ascending threshold; immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct LandscapeTable {
    entries: Vec<LandscapeEntry>,
}

impl LandscapeTable {
    pub fn new(entries: Vec<LandscapeEntry>) -> Result<Self, LandscapeError> {
        if entries.is_empty() {
            return Err(LandscapeError::Empty);
        }
        for (index, e) in entries.iter().enumerate() {
            if !(0.0..=1.0).contains(&e.threshold) || !(0.0..=1.0).contains(&e.height) {
                return Err(LandscapeError::OutOfRange { index });
            }
            if index > 0 {
                let previous = entries[index - 1].threshold;
                if e.threshold < previous {
                    return Err(LandscapeError::Unordered {
                        index,
                        threshold: e.threshold,
                        previous,
                    });
                }
            }
        }
        Ok(Self { entries })
    }

    /// Single flat entry carrying the missing-material sentinel.
    pub fn missing() -> Self {
        Self {
            entries: vec![LandscapeEntry::new(0.0, 0.0, MaterialId::MISSING)],
        }
    }

    pub fn entries(&self) -> &[LandscapeEntry] {
        &self.entries
    }

    pub fn is_missing(&self) -> bool {
        self.entries.len() == 1 && self.entries[0].material == MaterialId::MISSING
    }

    /// Entries around `raw`: the last one with `threshold <= raw` and its successor.
    pub fn bracket(&self, raw: f32) -> Bracket<'_> {
        let idx = self.entries.partition_point(|e| e.threshold <= raw);
        let lo = idx.saturating_sub(1);
        let hi = if idx == 0 { 0 } else { idx.min(self.entries.len() - 1) };
        let lower = &self.entries[lo];
        let upper = &self.entries[hi];
        let span = upper.threshold - lower.threshold;
        let fraction = if lo == hi || span <= 0.0 {
            0.0
        } else {
            ((raw - lower.threshold) / span).clamp(0.0, 1.0)
        };
        Bracket {
            lower,
            upper,
            fraction,
        }
    }

    #[inline]
    pub fn height(&self, raw: f32) -> f32 {
        self.bracket(raw).height()
    }
}

/// One table per biome type.
#[derive(Clone, Debug)]
pub struct LandscapeSet {
    tables: [LandscapeTable; BIOME_COUNT],
}

impl Default for LandscapeSet {
    fn default() -> Self {
        Self {
            tables: std::array::from_fn(|_| LandscapeTable::missing()),
        }
    }
}

impl LandscapeSet {
    pub fn set(&mut self, biome: BiomeType, table: LandscapeTable) {
        self.tables[biome.index()] = table;
    }

    #[inline]
    pub fn table(&self, biome: BiomeType) -> &LandscapeTable {
        &self.tables[biome.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LandscapeTable {
        LandscapeTable::new(vec![
            LandscapeEntry::new(0.0, 0.1, MaterialId(2)),
            LandscapeEntry::new(0.5, 0.3, MaterialId(3)),
            LandscapeEntry::new(0.5, 0.35, MaterialId(4)),
            LandscapeEntry::new(1.0, 0.9, MaterialId(5)),
        ])
        .unwrap()
    }

    #[test]
    fn interpolates_inside_a_band() {
        let t = table();
        let b = t.bracket(0.25);
        assert_eq!(b.lower.material, MaterialId(2));
        assert_eq!(b.upper.material, MaterialId(3));
        assert!((b.height() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn equal_thresholds_do_not_divide_by_zero() {
        let t = table();
        let b = t.bracket(0.5);
        assert_eq!(b.lower.material, MaterialId(4));
        assert!(b.fraction.is_finite());
        assert!((b.height() - (0.35 + (0.9 - 0.35) * 0.0)).abs() < 1e-6);
    }

    #[test]
    fn ends_clamp_to_the_outer_entries() {
        let t = table();
        assert_eq!(t.bracket(1.0).fraction, 0.0);
        assert!((t.height(1.0) - 0.9).abs() < 1e-6);
        let below = LandscapeTable::new(vec![LandscapeEntry::new(0.2, 0.4, MaterialId(2))]).unwrap();
        let b = below.bracket(0.1);
        assert_eq!(b.fraction, 0.0);
        assert!((b.height() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn rejects_unsorted_tables() {
        let err = LandscapeTable::new(vec![
            LandscapeEntry::new(0.6, 0.1, MaterialId(2)),
            LandscapeEntry::new(0.2, 0.3, MaterialId(3)),
        ])
        .unwrap_err();
        assert!(matches!(err, LandscapeError::Unordered { index: 1, .. }));
        assert_eq!(LandscapeTable::new(Vec::new()), Err(LandscapeError::Empty));
    }

    #[test]
    fn decoration_pick_follows_weights() {
        let mut e = LandscapeEntry::new(0.0, 0.0, MaterialId(2));
        e.decorations = vec![
            Decoration { item: "a".into(), material: MaterialId(7), weight: 1.0 },
            Decoration { item: "b".into(), material: MaterialId(8), weight: 3.0 },
        ];
        assert_eq!(e.pick_decoration(0.1).map(|d| d.item.as_str()), Some("a"));
        assert_eq!(e.pick_decoration(0.5).map(|d| d.item.as_str()), Some("b"));
        assert_eq!(e.pick_decoration(0.999).map(|d| d.item.as_str()), Some("b"));
        assert!(LandscapeEntry::new(0.0, 0.0, MaterialId(2)).pick_decoration(0.5).is_none());
    }
}
