use zerocopy::{FromBytes, Immutable, IntoBytes};

/// Trait for memory primitives.
///
/// A primitive is either a byte, half-word, word or double word.
/// That is, [`u8`], [`u16`], [`u32`] or [`u64`] (or a signed counterpart).
pub trait Primitive:
    std::fmt::Debug + std::fmt::UpperHex + Copy + Immutable + FromBytes + IntoBytes + Default + 'static
{
    /// Reads a value of this primitive from the start of `buf`, in native endian. If `buf` does
    /// not contain enough data, the missing bytes are taken to be zero.
    fn read_ne_bytes(buf: &[u8]) -> Self;

    /// Writes this primitive to the start of `buf`, in native endian. If `buf` is not big enough,
    /// the excess bytes are silently dropped.
    fn write_ne_bytes(self, buf: &mut [u8]);
}

macro_rules! impl_primitive {
    ($($type:ty),*) => {
        $(
            impl Primitive for $type {
                #[inline(always)]
                fn read_ne_bytes(buf: &[u8]) -> Self {
                    let mut bytes = [0u8; size_of::<$type>()];
                    let len = buf.len().min(bytes.len());
                    bytes[..len].copy_from_slice(&buf[..len]);

                    <$type>::from_ne_bytes(bytes)
                }

                #[inline(always)]
                fn write_ne_bytes(self, buf: &mut [u8]) {
                    let bytes = self.to_ne_bytes();
                    let len = buf.len().min(bytes.len());
                    buf[..len].copy_from_slice(&bytes[..len]);
                }
            }
        )*
    };
}

impl_primitive! {
    u8,
    u16,
    u32,
    u64,

    i8,
    i16,
    i32,
    i64
}

#[cfg(test)]
mod tests {
    use super::Primitive;

    #[test]
    fn round_trip() {
        let mut buf = [0u8; 8];
        0xDEAD_BEEFu32.write_ne_bytes(&mut buf);
        assert_eq!(u32::read_ne_bytes(&buf), 0xDEAD_BEEF);
    }

    #[test]
    fn short_buffer_pads_with_zeros() {
        let buf = [0xFFu8; 2];
        assert_eq!(u32::read_ne_bytes(&buf), u32::from_ne_bytes([0xFF, 0xFF, 0, 0]));
    }
}
