//! Reinterpretation between floating point values and their raw bit patterns. No
//! numeric conversion happens: every payload, signed zero and infinity survives.

pub trait BitwiseCast: Copy {
    type Bits: Copy;

    fn to_raw_bits(self) -> Self::Bits;
    fn from_raw_bits(bits: Self::Bits) -> Self;
}

macro_rules! impl_ {
    ($($t: ident => $bits: ident)*) => {
        $(
            impl BitwiseCast for $t {
                type Bits = $bits;

                #[inline(always)]
                fn to_raw_bits(self) -> $bits {
                    self.to_bits()
                }

                #[inline(always)]
                fn from_raw_bits(bits: $bits) -> Self {
                    $t::from_bits(bits)
                }
            }
        )*
    };
}

impl_! {f32 => u32 f64 => u64}

#[inline(always)]
pub fn float_to_bits(value: f32) -> u32 {
    value.to_raw_bits()
}

#[inline(always)]
pub fn double_to_bits(value: f64) -> u64 {
    value.to_raw_bits()
}

#[inline(always)]
pub fn bits_to_float(bits: u32) -> f32 {
    f32::from_raw_bits(bits)
}

#[inline(always)]
pub fn bits_to_double(bits: u64) -> f64 {
    f64::from_raw_bits(bits)
}
