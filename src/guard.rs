//! Resource guard owning device selection and the memory budget source.
//!
//! Budgets are queried fresh before each image rather than trusted from a
//! stale snapshot: availability shifts between images in a batch. Between
//! images the guard fires the model's allocator-reset hook — the single
//! mutation point for shared cached state — so fragmentation cannot
//! accumulate over a long batch.
use crate::inpaint::Inpainter;
use crate::planner::MemoryBudget;
use log::debug;
use serde::{Deserialize, Serialize};

/// Compute device the model runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    Gpu,
    /// Vendor-specific accelerator, addressed by index.
    Accelerator(u32),
}

impl Default for Device {
    fn default() -> Self {
        Device::Cpu
    }
}

/// Source of "bytes currently available" for a device.
///
/// Production callers wire this to their allocator or device runtime; the
/// fixed implementation serves tests and hosts without a query API.
pub trait MemoryProbe: Send + Sync {
    fn available_bytes(&self, device: Device) -> u64;
}

/// A probe reporting a constant budget regardless of device.
#[derive(Clone, Copy, Debug)]
pub struct FixedBudgetProbe {
    pub bytes: u64,
}

impl MemoryProbe for FixedBudgetProbe {
    fn available_bytes(&self, _device: Device) -> u64 {
        self.bytes
    }
}

/// Default working budget when the caller configures nothing: 2 GiB.
pub const DEFAULT_BUDGET_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Owns the budget source and device for a run or batch.
pub struct ResourceGuard {
    device: Device,
    probe: Box<dyn MemoryProbe>,
    copies: f32,
    safety_margin: f32,
}

impl ResourceGuard {
    pub fn new(device: Device, probe: Box<dyn MemoryProbe>, copies: f32, safety_margin: f32) -> Self {
        Self {
            device,
            probe,
            copies,
            safety_margin,
        }
    }

    pub fn with_fixed_budget(device: Device, bytes: u64, copies: f32, safety_margin: f32) -> Self {
        Self::new(device, Box::new(FixedBudgetProbe { bytes }), copies, safety_margin)
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Query the probe now and build the budget for the next image.
    pub fn current_budget(&self) -> MemoryBudget {
        let available = self.probe.available_bytes(self.device);
        debug!(
            "guard: {:?} reports {} bytes available",
            self.device, available
        );
        MemoryBudget::new(available, self.copies, self.safety_margin)
    }

    /// Between-images reset: ask the model to drop cached allocations.
    ///
    /// Runs with exclusive access (`&mut` model) so no image's compositing
    /// can overlap the next image's detection.
    pub fn reset_between_images<I>(&self, inpainter: &mut I)
    where
        I: Inpainter + ?Sized,
    {
        debug!("guard: releasing cached allocator state");
        inpainter.release_cached();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_reflects_the_probe_each_time() {
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::sync::Arc;

        struct Shrinking(Arc<AtomicU64>);
        impl MemoryProbe for Shrinking {
            fn available_bytes(&self, _d: Device) -> u64 {
                self.0.fetch_sub(1000, Ordering::Relaxed)
            }
        }

        let counter = Arc::new(AtomicU64::new(10_000));
        let guard = ResourceGuard::new(Device::Cpu, Box::new(Shrinking(counter)), 4.0, 1.5);
        let first = guard.current_budget().available;
        let second = guard.current_budget().available;
        assert_eq!(first, 10_000);
        assert_eq!(second, 9_000);
    }
}
