//! Volume-key taps on top of a device volume control.
//!
//! Each press moves the device level away from the baseline. The driver turns
//! the change into a tap through [`VolumeTapListener`] and writes the baseline
//! back so the keys never change the real volume.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, warn};

use airpointer_core::AirPointerError;
use airpointer_core::signal::{TapEvent, VolumeDirection, VolumeTapListener};

/// Device volume level, in `[0, 1]`.
#[async_trait]
pub trait VolumeControl: Send + Sync {
    async fn level(&self) -> Result<f64, AirPointerError>;
    async fn set_level(&self, level: f64) -> Result<(), AirPointerError>;
}

/// In-memory volume control used by replays and tests.
#[derive(Debug)]
pub struct SimulatedVolume {
    step: f64,
    level: Mutex<f64>,
    writes: Mutex<Vec<f64>>,
}

impl SimulatedVolume {
    pub fn new(level: f64, step: f64) -> Self {
        Self {
            step,
            level: Mutex::new(level.clamp(0.0, 1.0)),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Simulate one key press; returns the new level.
    pub fn press(&self, direction: VolumeDirection) -> Result<f64, AirPointerError> {
        let mut level = self.lock_level()?;
        *level = match direction {
            VolumeDirection::Up => (*level + self.step).min(1.0),
            VolumeDirection::Down => (*level - self.step).max(0.0),
        };
        Ok(*level)
    }

    /// Levels written through [`VolumeControl::set_level`], oldest first.
    pub fn writes(&self) -> Vec<f64> {
        match self.writes.lock() {
            Ok(writes) => writes.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn lock_level(&self) -> Result<std::sync::MutexGuard<'_, f64>, AirPointerError> {
        self.level
            .lock()
            .map_err(|_| AirPointerError::Other("volume level poisoned".into()))
    }
}

impl Default for SimulatedVolume {
    fn default() -> Self {
        Self::new(0.5, 1.0 / 15.0)
    }
}

#[async_trait]
impl VolumeControl for SimulatedVolume {
    async fn level(&self) -> Result<f64, AirPointerError> {
        Ok(*self.lock_level()?)
    }

    async fn set_level(&self, level: f64) -> Result<(), AirPointerError> {
        *self.lock_level()? = level;
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(level);
        }
        Ok(())
    }
}

/// Feeds level changes to a [`VolumeTapListener`] on the tokio clock.
pub struct VolumeDriver {
    listener: VolumeTapListener,
    control: Arc<dyn VolumeControl>,
    epoch: Instant,
}

impl VolumeDriver {
    /// Read the current level and use it as the baseline.
    pub async fn new(
        control: Arc<dyn VolumeControl>,
        window_ms: u64,
    ) -> Result<Self, AirPointerError> {
        let baseline = control.level().await?;
        debug!(baseline, window_ms, "volume driver ready");
        Ok(Self {
            listener: VolumeTapListener::new(baseline, window_ms),
            control,
            epoch: Instant::now(),
        })
    }

    pub fn baseline(&self) -> f64 {
        self.listener.baseline()
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Handle a level reported by the device.
    ///
    /// Any change away from the baseline is written back. A failed write is
    /// logged and the baseline kept.
    pub async fn observe(&mut self, level: f64) -> Vec<TapEvent> {
        let fired = self.listener.observe(level, self.now_ms());
        let baseline = self.listener.baseline();
        if level != baseline
            && let Err(e) = self.control.set_level(baseline).await
        {
            warn!("failed to restore volume to {baseline}: {e}");
        }
        fired
    }

    /// When the next pending single tap fires.
    pub fn deadline(&self) -> Option<Instant> {
        self.listener
            .next_deadline()
            .map(|ms| self.epoch + Duration::from_millis(ms))
    }

    /// Wait for the next pending single tap. Never resolves when nothing is
    /// pending. Cancel-safe.
    pub async fn expired(&mut self) -> Vec<TapEvent> {
        match self.deadline() {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.listener.poll(self.now_ms())
            }
            None => std::future::pending().await,
        }
    }

    /// Wait until every pending tap has fired.
    pub async fn flush(&mut self) -> Vec<TapEvent> {
        let mut fired = Vec::new();
        while self.listener.has_pending() {
            fired.extend(self.expired().await);
        }
        fired
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use airpointer_core::signal::TapKind;

    async fn driver(volume: &Arc<SimulatedVolume>) -> VolumeDriver {
        VolumeDriver::new(volume.clone(), 300).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn two_quick_presses_make_a_double() {
        let volume = Arc::new(SimulatedVolume::default());
        let mut driver = driver(&volume).await;

        let level = volume.press(VolumeDirection::Up).unwrap();
        assert!(driver.observe(level).await.is_empty());
        tokio::time::sleep(Duration::from_millis(200)).await;
        let level = volume.press(VolumeDirection::Up).unwrap();
        let fired = driver.observe(level).await;

        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].kind, TapKind::Double);
        assert_eq!(fired[0].direction, VolumeDirection::Up);
        assert!(driver.flush().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_presses_make_two_singles() {
        let volume = Arc::new(SimulatedVolume::default());
        let mut driver = driver(&volume).await;

        let level = volume.press(VolumeDirection::Up).unwrap();
        driver.observe(level).await;
        let first = driver.expired().await;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].kind, TapKind::Single);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let level = volume.press(VolumeDirection::Up).unwrap();
        driver.observe(level).await;
        let second = driver.flush().await;
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].kind, TapKind::Single);
    }

    #[tokio::test(start_paused = true)]
    async fn baseline_is_restored_after_each_press() {
        let volume = Arc::new(SimulatedVolume::default());
        let mut driver = driver(&volume).await;

        let level = volume.press(VolumeDirection::Down).unwrap();
        driver.observe(level).await;
        assert_eq!(volume.level().await.unwrap(), 0.5);

        // the write-back echo is not a press
        assert!(driver.observe(0.5).await.is_empty());
        assert_eq!(volume.writes(), vec![0.5]);

        let fired = driver.flush().await;
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].direction, VolumeDirection::Down);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_waits_while_idle() {
        let volume = Arc::new(SimulatedVolume::default());
        let mut driver = driver(&volume).await;
        assert!(driver.deadline().is_none());

        let idle = tokio::time::timeout(Duration::from_secs(5), driver.expired()).await;
        assert!(idle.is_err());
    }
}
