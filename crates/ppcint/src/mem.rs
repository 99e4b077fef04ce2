//! The guest memory abstraction.

use easyerr::Error;
use ppc32::{Address, Primitive};

/// A failed guest memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("memory access fault at {addr} ({len} bytes)")]
pub struct BusFault {
    pub addr: Address,
    pub len: u32,
}

/// A flat, byte-addressable view of guest memory.
///
/// Primitives cross the bus in native byte order; the interpreter applies the
/// byte-order conversions the ISA requires on top of this.
pub trait Bus {
    /// Reads a primitive from the given guest address.
    fn read<P: Primitive>(&mut self, addr: Address) -> Result<P, BusFault>;

    /// Writes a primitive to the given guest address.
    fn write<P: Primitive>(&mut self, addr: Address, value: P) -> Result<(), BusFault>;
}

/// Flat RAM mapped at a base address. Accesses outside the window fault.
pub struct Ram {
    base: Address,
    bytes: Box<[u8]>,
}

impl Ram {
    pub fn new(base: Address, len: usize) -> Self {
        Self {
            base,
            bytes: vec![0; len].into_boxed_slice(),
        }
    }

    /// Copies `data` into RAM at the given guest address.
    ///
    /// # Panics
    /// Panics if the range falls outside the RAM window.
    pub fn load(&mut self, addr: Address, data: &[u8]) {
        let offset = addr.value().wrapping_sub(self.base.value()) as usize;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    fn window<P: Primitive>(&self, addr: Address) -> Result<usize, BusFault> {
        let offset = addr.value().wrapping_sub(self.base.value()) as usize;
        if offset.checked_add(size_of::<P>()).is_none_or(|end| end > self.bytes.len()) {
            return Err(BusFault {
                addr,
                len: size_of::<P>() as u32,
            });
        }

        Ok(offset)
    }
}

impl Bus for Ram {
    fn read<P: Primitive>(&mut self, addr: Address) -> Result<P, BusFault> {
        let offset = self.window::<P>(addr)?;
        Ok(P::read_ne_bytes(&self.bytes[offset..]))
    }

    fn write<P: Primitive>(&mut self, addr: Address, value: P) -> Result<(), BusFault> {
        let offset = self.window::<P>(addr)?;
        value.write_ne_bytes(&mut self.bytes[offset..]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Bus, Ram};
    use ppc32::Address;

    #[test]
    fn reads_and_writes_round_trip() {
        let mut ram = Ram::new(Address(0x1000), 0x100);
        ram.write(Address(0x1010), 0xAABB_CCDDu32).unwrap();
        assert_eq!(ram.read::<u32>(Address(0x1010)).unwrap(), 0xAABB_CCDD);
        assert_eq!(
            ram.read::<u8>(Address(0x1013)).unwrap(),
            0xAABB_CCDDu32.to_ne_bytes()[3]
        );
    }

    #[test]
    fn out_of_window_accesses_fault() {
        let mut ram = Ram::new(Address(0x1000), 0x100);
        assert!(ram.read::<u32>(Address(0x0FFF)).is_err());
        assert!(ram.read::<u32>(Address(0x10FD)).is_err());
        assert!(ram.read::<u32>(Address(0x10FC)).is_ok());
        assert!(ram.write(Address(0xFFFF_FFFF), 0u8).is_err());
    }
}
