use crate::ap::AccessPointRecord;
use heapless::Vec;
use rustyfarian_network_pure::{FsmError, FsmResult};

pub const SCAN_TABLE_CAPACITY: usize = 16;

/// Fixed-capacity snapshot of the most recent scan. Overwritten wholesale on
/// each completed scan; stable in between.
#[derive(Debug, Default)]
pub struct ScanResultTable {
    records: Vec<AccessPointRecord, SCAN_TABLE_CAPACITY>,
    /// Provider-reported total, which may exceed `records.len()`.
    total_seen_count: usize,
}

impl ScanResultTable {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            total_seen_count: 0,
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.total_seen_count = 0;
    }

    /// Overwrite the table with a freshly collected scan. `total_seen` is
    /// the provider's reported AP count, which may be larger than what fits
    /// in the fixed-capacity table.
    pub fn populate(&mut self, found: &[AccessPointRecord], total_seen: usize) {
        self.records.clear();
        for ap in found.iter().take(SCAN_TABLE_CAPACITY) {
            // Capacity is enforced by `take`; this cannot fail.
            let _ = self.records.push(ap.clone());
        }
        self.total_seen_count = total_seen;
    }

    pub fn collected_count(&self) -> usize {
        self.records.len()
    }

    pub fn total_seen_count(&self) -> usize {
        self.total_seen_count
    }

    pub fn get(&self, index: usize) -> Option<&AccessPointRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, AccessPointRecord> {
        self.records.iter()
    }

    /// Serializes the record at `index` into `buffer`, for application-facing
    /// `serialize_ap`.
    pub fn serialize_ap(&self, index: usize, buffer: &mut [u8]) -> FsmResult<usize> {
        self.records
            .get(index)
            .ok_or(FsmError::BadParameter)?
            .encode(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ap::AuthMode;

    #[test]
    fn populate_caps_at_table_capacity() {
        let mut table = ScanResultTable::new();
        let many: Vec<AccessPointRecord, 32> = (0..32)
            .map(|i| AccessPointRecord::new("net", -50 - i as i8, 1, AuthMode::Wpa2Psk))
            .collect();
        table.populate(&many, 32);
        assert_eq!(table.collected_count(), SCAN_TABLE_CAPACITY);
        assert_eq!(table.total_seen_count(), 32);
    }

    #[test]
    fn clear_resets_counts() {
        let mut table = ScanResultTable::new();
        table.populate(&[AccessPointRecord::new("a", -40, 1, AuthMode::Open)], 1);
        table.clear();
        assert_eq!(table.collected_count(), 0);
        assert_eq!(table.total_seen_count(), 0);
    }
}
