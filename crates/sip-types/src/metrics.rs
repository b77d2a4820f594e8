use serde::{Deserialize, Serialize};

/// Running counters for the SIP currently being assembled.
///
/// All sizes are uncompressed byte counts. Counters start at zero when a
/// container is opened and never decrease while it stays open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SipMetrics {
    num_aius: u64,
    num_digital_objects: u64,
    pdi_size: u64,
    digital_objects_size: u64,
}

impl SipMetrics {
    /// Metrics for an empty container.
    pub const fn new() -> Self {
        Self {
            num_aius: 0,
            num_digital_objects: 0,
            pdi_size: 0,
            digital_objects_size: 0,
        }
    }

    /// Metrics with explicit counter values.
    pub const fn from_counts(
        num_aius: u64,
        num_digital_objects: u64,
        pdi_size: u64,
        digital_objects_size: u64,
    ) -> Self {
        Self {
            num_aius,
            num_digital_objects,
            pdi_size,
            digital_objects_size,
        }
    }

    /// Archival information units added so far.
    pub fn num_aius(&self) -> u64 {
        self.num_aius
    }

    /// Digital objects embedded so far.
    pub fn num_digital_objects(&self) -> u64 {
        self.num_digital_objects
    }

    /// Bytes of PDI XML written so far.
    pub fn pdi_size(&self) -> u64 {
        self.pdi_size
    }

    /// Bytes of digital-object content embedded so far.
    pub fn digital_objects_size(&self) -> u64 {
        self.digital_objects_size
    }

    /// PDI plus content bytes.
    pub fn sip_size(&self) -> u64 {
        self.pdi_size.saturating_add(self.digital_objects_size)
    }

    /// `true` until the first AIU is recorded.
    pub fn is_empty(&self) -> bool {
        self.num_aius == 0
    }

    /// Count one more archival information unit.
    pub fn record_aiu(&mut self) {
        self.num_aius += 1;
    }

    /// Count one embedded digital object of `size` bytes.
    pub fn record_digital_object(&mut self, size: u64) {
        self.num_digital_objects += 1;
        self.digital_objects_size = self.digital_objects_size.saturating_add(size);
    }

    /// Update the PDI size. Smaller values are ignored.
    pub fn update_pdi_size(&mut self, size: u64) {
        self.pdi_size = self.pdi_size.max(size);
    }
}
