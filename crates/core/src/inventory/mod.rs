use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::domain::blood_type::BloodType;
use crate::domain::inventory::InventoryRecord;
use crate::errors::DomainError;

/// Per-blood-type unit counters.
///
/// Each blood type has its own lock, so mutations of one type are serialized
/// while unrelated types proceed concurrently. Counts are stored unsigned and
/// every mutation is validated before it is written, so a count can never be
/// observed below zero.
pub struct InventoryStore {
    slots: [Mutex<u32>; BloodType::COUNT],
}

/// Exclusive access to one blood type's counter.
///
/// Holding the guard is the critical section: the request manager keeps it
/// alive across the stock check, the decrement and the status write.
pub struct StockGuard<'a> {
    blood_type: BloodType,
    units: MutexGuard<'a, u32>,
}

impl StockGuard<'_> {
    pub fn blood_type(&self) -> BloodType {
        self.blood_type
    }

    pub fn units(&self) -> u32 {
        *self.units
    }

    /// Applies `units += delta`, rejecting results below zero or past the
    /// counter limit.
    pub fn adjust(&mut self, delta: i64) -> Result<u32, DomainError> {
        let capacity_exceeded = || DomainError::CapacityExceeded {
            blood_type: self.blood_type,
            available: *self.units,
            delta,
        };
        let next = i64::from(*self.units).checked_add(delta).ok_or_else(capacity_exceeded)?;

        if next < 0 {
            return Err(DomainError::InsufficientStock {
                blood_type: self.blood_type,
                available: *self.units,
                requested: delta.unsigned_abs(),
            });
        }

        let next = u32::try_from(next).map_err(|_| capacity_exceeded())?;
        *self.units = next;
        debug!(
            event_name = "inventory.adjusted",
            blood_type = %self.blood_type,
            delta,
            units_available = next,
            "inventory counter adjusted"
        );
        Ok(next)
    }

    pub fn set(&mut self, value: i64) -> Result<u32, DomainError> {
        let value = u32::try_from(value).map_err(|_| DomainError::InvalidValue { value })?;
        *self.units = value;
        Ok(value)
    }

    pub fn record(&self) -> InventoryRecord {
        InventoryRecord::new(self.blood_type, *self.units)
    }
}

impl InventoryStore {
    /// Store with every blood type at zero units.
    pub fn new() -> Self {
        Self { slots: std::array::from_fn(|_| Mutex::new(0)) }
    }

    pub fn with_units(initial: impl IntoIterator<Item = (BloodType, u32)>) -> Self {
        let store = Self::new();
        for (blood_type, units) in initial {
            *store.lock(blood_type).units = units;
        }
        store
    }

    /// Acquires the blood type's lock, blocking while another caller holds it.
    pub fn lock(&self, blood_type: BloodType) -> StockGuard<'_> {
        // Writes are single validated assignments, so a poisoned slot still
        // holds a valid count.
        let units = match self.slots[blood_type.index()].lock() {
            Ok(units) => units,
            Err(poisoned) => poisoned.into_inner(),
        };
        StockGuard { blood_type, units }
    }

    pub fn get_units(&self, blood_type: BloodType) -> u32 {
        self.lock(blood_type).units()
    }

    pub fn adjust(&self, blood_type: BloodType, delta: i64) -> Result<u32, DomainError> {
        self.lock(blood_type).adjust(delta)
    }

    pub fn set_units(
        &self,
        blood_type: BloodType,
        value: i64,
    ) -> Result<InventoryRecord, DomainError> {
        let mut guard = self.lock(blood_type);
        guard.set(value)?;
        Ok(guard.record())
    }

    pub fn record(&self, blood_type: BloodType) -> InventoryRecord {
        self.lock(blood_type).record()
    }

    /// All records in canonical blood type order. Each record is read under
    /// its own lock; the list is not a cross-type atomic snapshot.
    pub fn snapshot(&self) -> Vec<InventoryRecord> {
        BloodType::ALL.iter().map(|blood_type| self.record(*blood_type)).collect()
    }

    pub fn total_units(&self) -> u64 {
        self.snapshot().iter().map(|record| u64::from(record.units_available)).sum()
    }
}

impl Default for InventoryStore {
    fn default() -> Self {
        Self::new()
    }
}
