//! Data memory

use crate::error::MemoryError;
use crate::error::MemoryErrorKind;
use crate::error::SimulatorResult;

/// Number of addressable data words
pub const DATA_MEMORY_SIZE: usize = 4000;

/// Flat, word-addressed data memory.
/// Every access is validated against the extent before touching it
#[derive(Clone, Debug)]
pub struct DataMemory {
    data: Box<[i32; DATA_MEMORY_SIZE]>,
}

impl Default for DataMemory {
    fn default() -> Self {
        Self::make()
    }
}

impl DataMemory {
    /// Make a zeroed data memory
    pub fn make() -> Self {
        Self { data: Box::new([0; DATA_MEMORY_SIZE]) }
    }

    /// Maps an effective address to a slot, rejecting anything outside the extent
    fn slot(address: i32) -> SimulatorResult<usize> {
        usize::try_from(address)
            .ok()
            .filter(|&a| a < DATA_MEMORY_SIZE)
            .ok_or_else(|| {
                MemoryError::AccessError {
                    address: address.into(),
                    kind: MemoryErrorKind::OutOfBounds,
                }
                .into()
            })
    }

    /// Read the word at the given address
    pub fn load(&self, address: i32) -> SimulatorResult<i32> {
        Ok(self.data[Self::slot(address)?])
    }

    /// Write the word at the given address
    pub fn store(&mut self, address: i32, value: i32) -> SimulatorResult<()> {
        self.data[Self::slot(address)?] = value;
        Ok(())
    }

    /// Whole memory, for reports and comparisons
    pub fn words(&self) -> &[i32] {
        &self.data[..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimulatorError;

    #[test]
    fn test_store_load() {
        let mut memory = DataMemory::make();
        memory.store(100, 7).unwrap();
        assert_eq!(memory.load(100).unwrap(), 7);
        assert_eq!(memory.load(101).unwrap(), 0);
    }

    #[test]
    fn test_edges() {
        let mut memory = DataMemory::make();
        memory.store(0, -1).unwrap();
        memory.store(3999, 42).unwrap();
        assert_eq!(memory.load(0).unwrap(), -1);
        assert_eq!(memory.load(3999).unwrap(), 42);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut memory = DataMemory::make();
        for address in [4000, 4001, -1, i32::MIN, i32::MAX] {
            match memory.store(address, 9) {
                Err(SimulatorError::MemoryError(MemoryError::AccessError { address: a, kind })) => {
                    assert_eq!(a, address as i64);
                    assert_eq!(kind, MemoryErrorKind::OutOfBounds);
                }
                other => panic!("expected bounds violation, got {:?}", other),
            }
            assert!(memory.load(address).is_err());
        }
        assert!(memory.words().iter().all(|&w| w == 0));
    }
}
