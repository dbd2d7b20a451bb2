//! Shared pin registry
//!
//! Holds every configured pin in configuration order. Clones share the same
//! underlying state, so the server loop and every connection handler see the
//! same values. With a [`PinDriver`] attached, output writes go through to the
//! hardware and input pins can be re-sampled from it.

use crate::config::ConfigError;
use crate::gpio::driver::PinDriver;
use crate::gpio::pin::{normalize, Direction, Pin, PinError, PinId, PinReading};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct PinRegistry {
    pins: Arc<Mutex<Vec<Pin>>>,
    driver: Option<Arc<dyn PinDriver>>,
}

impl PinRegistry {
    /// Build the registry from the boot-time pin list.
    ///
    /// Display order follows the order of `pins`. Fails if an id appears twice.
    pub fn configure(pins: impl IntoIterator<Item = Pin>) -> Result<Self, ConfigError> {
        let mut configured: Vec<Pin> = Vec::new();

        for pin in pins {
            if configured.iter().any(|p| p.id == pin.id) {
                return Err(ConfigError::DuplicatePin(pin.id));
            }
            configured.push(pin);
        }

        tracing::debug!(count = configured.len(), "Pin registry configured");

        Ok(Self {
            pins: Arc::new(Mutex::new(configured)),
            driver: None,
        })
    }

    /// Attach the hardware behind the pins.
    pub fn with_driver(mut self, driver: Arc<dyn PinDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    pub async fn get(&self, id: PinId) -> Result<Pin, PinError> {
        self.pins
            .lock()
            .await
            .iter()
            .find(|p| p.id == id)
            .copied()
            .ok_or(PinError::NotFound(id))
    }

    /// Drive an output pin.
    pub async fn set_value(&self, id: PinId, value: u8) -> Result<(), PinError> {
        self.update(id, Direction::Output, value).await?;

        if let Some(driver) = &self.driver {
            driver.set_state(id, normalize(value) == 1).map_err(|e| {
                warn!(pin = id, error = %e, "Pin write failed");
                PinError::Driver(id)
            })?;
        }
        Ok(())
    }

    /// Write every output pin's current value to the hardware.
    pub async fn apply_outputs(&self) -> Result<(), PinError> {
        let outputs: Vec<Pin> = self
            .pins
            .lock()
            .await
            .iter()
            .filter(|p| p.is_output())
            .copied()
            .collect();

        for pin in outputs {
            self.set_value(pin.id, pin.value).await?;
        }
        Ok(())
    }

    /// Re-sample one input pin from the driver.
    ///
    /// Without a driver, or when the pin cannot be read, the last value is
    /// kept.
    pub async fn refresh_input(&self, id: PinId) -> Result<(), PinError> {
        let Some(driver) = &self.driver else {
            return Ok(());
        };

        if self.get(id).await?.direction != Direction::Input {
            return Err(PinError::InvalidDirection(id));
        }

        match driver.is_high(id) {
            Some(high) => self.sample(id, high as u8).await,
            None => Ok(()),
        }
    }

    /// Re-sample every input pin.
    pub async fn refresh_inputs(&self) {
        if self.driver.is_none() {
            return;
        }

        let inputs: Vec<PinId> = self
            .pins
            .lock()
            .await
            .iter()
            .filter(|p| !p.is_output())
            .map(|p| p.id)
            .collect();

        for id in inputs {
            let _ = self.refresh_input(id).await;
        }
    }

    /// Record a hardware sample for an input pin.
    pub async fn sample(&self, id: PinId, value: u8) -> Result<(), PinError> {
        self.update(id, Direction::Input, value).await
    }

    /// Owned copy of every pin's value, in configuration order.
    pub async fn snapshot(&self) -> Vec<PinReading> {
        self.pins.lock().await.iter().map(Pin::reading).collect()
    }

    pub async fn len(&self) -> usize {
        self.pins.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pins.lock().await.is_empty()
    }

    async fn update(&self, id: PinId, expected: Direction, value: u8) -> Result<(), PinError> {
        let mut pins = self.pins.lock().await;

        let pin = pins
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(PinError::NotFound(id))?;

        if pin.direction != expected {
            return Err(PinError::InvalidDirection(id));
        }

        pin.value = normalize(value);
        Ok(())
    }
}
