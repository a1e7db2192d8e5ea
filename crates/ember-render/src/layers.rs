//! Layer membership bitmasks.
//!
//! Every object and every pass carries a 32-bit mask. A pass draws an object
//! when the two masks share at least one bit.

/// Bit every object starts with; the base pass renders it.
pub const DEFAULT_LAYER: u32 = 0;
/// Bit selecting objects for the bloom pass.
pub const BLOOM_LAYER: u32 = 1;

/// A set of layer bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Layers(u32);

impl Layers {
    /// No layer enabled.
    pub const NONE: Layers = Layers(0);
    /// Every layer enabled.
    pub const ALL: Layers = Layers(u32::MAX);

    /// Mask from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// A mask holding only `bit`. Bits past 31 give an empty mask.
    pub const fn layer(bit: u32) -> Self {
        match 1u32.checked_shl(bit) {
            Some(bits) => Self(bits),
            None => Self::NONE,
        }
    }

    /// Raw bits of the mask.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Enable one layer bit. Bits past 31 are ignored.
    pub fn enable(&mut self, bit: u32) {
        self.0 |= Self::layer(bit).0;
    }

    /// Disable one layer bit.
    pub fn disable(&mut self, bit: u32) {
        self.0 &= !Self::layer(bit).0;
    }

    /// Replace the whole mask with a single bit.
    pub fn set(&mut self, bit: u32) {
        *self = Self::layer(bit);
    }

    /// Whether `bit` is enabled.
    pub fn contains(self, bit: u32) -> bool {
        self.0 & Self::layer(bit).0 != 0
    }

    /// Whether the masks intersect.
    pub fn test(self, other: Layers) -> bool {
        self.0 & other.0 != 0
    }

    /// Layers enabled in either mask.
    pub fn union(self, other: Layers) -> Layers {
        Layers(self.0 | other.0)
    }
}

impl Default for Layers {
    fn default() -> Self {
        Self::layer(DEFAULT_LAYER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_layer_zero() {
        assert_eq!(Layers::default().bits(), 1);
        assert!(Layers::default().contains(DEFAULT_LAYER));
        assert!(!Layers::default().contains(BLOOM_LAYER));
    }

    #[test]
    fn test_enable_disable() {
        let mut layers = Layers::default();
        layers.enable(BLOOM_LAYER);
        assert_eq!(layers.bits(), 0b11);
        layers.disable(DEFAULT_LAYER);
        assert_eq!(layers.bits(), 0b10);
        layers.disable(DEFAULT_LAYER);
        assert_eq!(layers.bits(), 0b10);
    }

    #[test]
    fn test_intersection() {
        let bloom = Layers::layer(BLOOM_LAYER);
        let both = Layers::default().union(bloom);
        assert!(both.test(bloom));
        assert!(both.test(Layers::default()));
        assert!(!Layers::default().test(bloom));
        assert!(!Layers::NONE.test(Layers::ALL));
    }

    #[test]
    fn test_out_of_range_bit_is_ignored() {
        let mut layers = Layers::default();
        layers.enable(40);
        assert_eq!(layers, Layers::default());
        assert_eq!(Layers::layer(32), Layers::NONE);
    }

    #[test]
    fn test_set_replaces_mask() {
        let mut layers = Layers::from_bits(0b1011);
        layers.set(BLOOM_LAYER);
        assert_eq!(layers.bits(), 0b10);
    }
}
