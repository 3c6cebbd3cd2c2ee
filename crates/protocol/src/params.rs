//! Functional Parameter Block
//!
//! Several payloads carry up to four functional parameters (FP1..FP4) next
//! to the main parameter. A slot either holds a value inside the normal
//! range or is unknown; anything outside the range is never treated as data.
//!
//! Two layouts exist on the wire:
//!
//! ```text
//! positional: [FP1: u16][FP2: u16][FP3: u16][FP4: u16]
//! indexed:    ([ParameterId: u8][Value: u16])*   id 0 = main parameter, 1..=4 = FP1..FP4
//! ```

use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};

/// Number of functional parameter slots
pub const PARAMETER_COUNT: usize = 4;

/// Smallest normal value
pub const MIN_VALUE: u16 = 0x0000;

/// Largest normal value
pub const MAX_VALUE: u16 = 0xC800;

/// Marker for a slot without a value
pub const UNKNOWN_VALUE: u16 = 0xF7FF;

/// Size of one indexed record
pub const INDEXED_RECORD_SIZE: usize = 3;

/// Bits reported by [`FunctionalParameters::write_positional`], FP1 first
const SLOT_BITS: [u8; PARAMETER_COUNT] = [0x80, 0x40, 0x20, 0x10];

/// Fixed set of four functional parameter slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionalParameters {
    values: [u16; PARAMETER_COUNT],
}

impl Default for FunctionalParameters {
    fn default() -> Self {
        Self {
            values: [UNKNOWN_VALUE; PARAMETER_COUNT],
        }
    }
}

impl FunctionalParameters {
    /// Whether `value` lies inside the normal range
    #[inline]
    pub fn is_normal(value: u16) -> bool {
        (MIN_VALUE..=MAX_VALUE).contains(&value)
    }

    /// Build a block from raw slot values; values outside the normal range become unknown
    pub fn from_values(values: [u16; PARAMETER_COUNT]) -> Self {
        Self {
            values: values.map(|v| if Self::is_normal(v) { v } else { UNKNOWN_VALUE }),
        }
    }

    /// A block with exactly one normal slot
    ///
    /// Returns `None` when `index` is not a slot or `value` is not normal.
    pub fn set(index: usize, value: u16) -> Option<Self> {
        if index >= PARAMETER_COUNT || !Self::is_normal(value) {
            return None;
        }
        let mut block = Self::default();
        block.values[index] = value;
        Some(block)
    }

    /// Normal value of slot `index`
    pub fn get(&self, index: usize) -> Option<u16> {
        self.values
            .get(index)
            .copied()
            .filter(|&v| Self::is_normal(v))
    }

    /// Raw slot values, unknown slots as [`UNKNOWN_VALUE`]
    pub fn values(&self) -> [u16; PARAMETER_COUNT] {
        self.values
    }

    /// Number of normal slots
    pub fn normal_count(&self) -> usize {
        self.values.iter().filter(|&&v| Self::is_normal(v)).count()
    }

    fn usable(self) -> Option<Self> {
        (self.normal_count() > 0).then_some(self)
    }

    /// Apply `substitute` on top of `foundation`
    ///
    /// Each slot takes the substitute's value if normal, else the
    /// foundation's value if normal, else stays unknown.
    pub fn merge(foundation: Option<Self>, substitute: Option<Self>) -> Option<Self> {
        match (foundation, substitute) {
            (None, None) => None,
            (Some(block), None) | (None, Some(block)) => Some(block),
            (Some(base), Some(update)) => {
                let mut merged = Self::default();
                for slot in 0..PARAMETER_COUNT {
                    merged.values[slot] = update.get(slot).or(base.get(slot)).unwrap_or(UNKNOWN_VALUE);
                }
                Some(merged)
            }
        }
    }

    /// Read four positional fields at `offset`
    ///
    /// Returns `None` if the buffer is too short or no slot is normal.
    pub fn read_positional(buffer: &[u8], offset: usize) -> Option<Self> {
        let fields = buffer.get(offset..offset + 2 * PARAMETER_COUNT)?;
        let mut values = [UNKNOWN_VALUE; PARAMETER_COUNT];
        for (slot, value) in values.iter_mut().enumerate() {
            *value = BigEndian::read_u16(&fields[2 * slot..]);
        }
        Self::from_values(values).usable()
    }

    /// Read [`PARAMETER_COUNT`] indexed records at `offset`
    pub fn read_indexed(buffer: &[u8], offset: usize) -> Option<Self> {
        Self::read_indexed_records(buffer, offset, PARAMETER_COUNT)
    }

    /// Read `count` indexed records at `offset`
    ///
    /// Records for the main parameter or unknown ids are skipped, as are
    /// records past the end of the buffer.
    pub fn read_indexed_records(buffer: &[u8], offset: usize, count: usize) -> Option<Self> {
        let mut block = Self::default();
        for record in 0..count {
            let start = offset + record * INDEXED_RECORD_SIZE;
            let Some(bytes) = buffer.get(start..start + INDEXED_RECORD_SIZE) else {
                break;
            };
            let id = bytes[0] as usize;
            let value = BigEndian::read_u16(&bytes[1..]);
            if (1..=PARAMETER_COUNT).contains(&id) && Self::is_normal(value) {
                block.values[id - 1] = value;
            }
        }
        block.usable()
    }

    /// Write the normal slots as positional fields at `offset`
    ///
    /// Unknown slots leave the buffer untouched. The returned bitmask has one
    /// bit per slot written (FP1 = `0x80` .. FP4 = `0x10`).
    pub fn write_positional(&self, buffer: &mut [u8], offset: usize) -> u8 {
        let mut mask = 0;
        for (slot, bit) in SLOT_BITS.iter().enumerate() {
            let Some(value) = self.get(slot) else {
                continue;
            };
            let start = offset + 2 * slot;
            if let Some(field) = buffer.get_mut(start..start + 2) {
                BigEndian::write_u16(field, value);
                mask |= bit;
            }
        }
        mask
    }
}

impl std::fmt::Display for FunctionalParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots: Vec<String> = (0..PARAMETER_COUNT)
            .map(|slot| match self.get(slot) {
                Some(value) => format!("FP{}={:#06x}", slot + 1, value),
                None => format!("FP{}=unknown", slot + 1),
            })
            .collect();
        write!(f, "{}", slots.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_normal_bounds() {
        assert!(FunctionalParameters::is_normal(0));
        assert!(FunctionalParameters::is_normal(MAX_VALUE));
        assert!(!FunctionalParameters::is_normal(MAX_VALUE + 1));
        assert!(!FunctionalParameters::is_normal(UNKNOWN_VALUE));
    }

    #[test]
    fn test_set_single_slot() {
        let block = FunctionalParameters::set(2, 0x1234).unwrap();
        assert_eq!(block.get(2), Some(0x1234));
        assert_eq!(block.normal_count(), 1);
        assert!(FunctionalParameters::set(4, 0x1234).is_none());
        assert!(FunctionalParameters::set(0, 0xD200).is_none());
    }

    #[test]
    fn test_out_of_range_values_are_unknown() {
        let block = FunctionalParameters::from_values([0xD100, 5, UNKNOWN_VALUE, 0xFFFF]);
        assert_eq!(block.get(0), None);
        assert_eq!(block.get(1), Some(5));
        assert_eq!(block, FunctionalParameters::from_values([UNKNOWN_VALUE, 5, 0xF000, 0xC801]));
    }

    #[test]
    fn test_merge_prefers_substitute() {
        let base = FunctionalParameters::from_values([1, 2, UNKNOWN_VALUE, UNKNOWN_VALUE]);
        let update = FunctionalParameters::from_values([UNKNOWN_VALUE, 20, 30, UNKNOWN_VALUE]);
        let merged = FunctionalParameters::merge(Some(base), Some(update)).unwrap();
        assert_eq!(merged.values(), [1, 20, 30, UNKNOWN_VALUE]);
    }

    #[test]
    fn test_merge_with_none() {
        let block = FunctionalParameters::set(0, 7).unwrap();
        assert_eq!(FunctionalParameters::merge(Some(block), None), Some(block));
        assert_eq!(FunctionalParameters::merge(None, Some(block)), Some(block));
        assert_eq!(FunctionalParameters::merge(None, None), None);
    }

    #[test]
    fn test_read_positional() {
        let buffer = [0xAA, 0xF7, 0xFF, 0xF7, 0xFF, 0x00, 0x00, 0xF7, 0xFF];
        let block = FunctionalParameters::read_positional(&buffer, 1).unwrap();
        assert_eq!(block.values(), [UNKNOWN_VALUE, UNKNOWN_VALUE, 0, UNKNOWN_VALUE]);
    }

    #[test]
    fn test_read_positional_nothing_usable() {
        let buffer = [0xF7, 0xFF, 0xF7, 0xFF, 0xF7, 0xFF, 0xF7, 0xFF];
        assert!(FunctionalParameters::read_positional(&buffer, 0).is_none());
        assert!(FunctionalParameters::read_positional(&buffer, 2).is_none());
    }

    #[test]
    fn test_read_indexed_ignores_main_and_unknown_ids() {
        let buffer = [
            0x00, 0xC8, 0x00, // main parameter
            0x03, 0x63, 0x4F, // FP3
            0x09, 0x00, 0x01, // no such slot
            0x01, 0x00, 0x10, // FP1
        ];
        let block = FunctionalParameters::read_indexed(&buffer, 0).unwrap();
        assert_eq!(block.values(), [0x0010, UNKNOWN_VALUE, 0x634F, UNKNOWN_VALUE]);
    }

    #[test]
    fn test_read_indexed_records_short_buffer() {
        let buffer = [0x02, 0x00, 0x05, 0x04];
        let block = FunctionalParameters::read_indexed_records(&buffer, 0, 3).unwrap();
        assert_eq!(block.get(1), Some(5));
        assert_eq!(block.normal_count(), 1);
    }

    #[test]
    fn test_write_positional_mask() {
        let block = FunctionalParameters::from_values([0x0100, UNKNOWN_VALUE, 0x0200, UNKNOWN_VALUE]);
        let mut buffer = [0xEE; 8];
        let mask = block.write_positional(&mut buffer, 0);
        assert_eq!(mask, 0x80 | 0x20);
        assert_eq!(buffer, [0x01, 0x00, 0xEE, 0xEE, 0x02, 0x00, 0xEE, 0xEE]);
    }

    #[test]
    fn test_write_then_read_positional() {
        let block = FunctionalParameters::from_values([UNKNOWN_VALUE, 0x4000, UNKNOWN_VALUE, 0xC800]);
        let mut buffer = [0xF7, 0xFF, 0xF7, 0xFF, 0xF7, 0xFF, 0xF7, 0xFF];
        block.write_positional(&mut buffer, 0);
        assert_eq!(FunctionalParameters::read_positional(&buffer, 0), Some(block));
    }
}
