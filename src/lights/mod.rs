use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Error;
use log::{debug, info};
use smart_leds::RGB8;

use crate::{config::Config, error::NeopixelError};

#[cfg(feature = "pi")]
pub mod spi;

/// A strip of addressable pixels. Colours are staged with `set` and only
/// reach the hardware on `commit`.
pub trait PixelDriver: Send {
    fn len(&self) -> usize;

    fn set(&mut self, index: usize, color: RGB8) -> Result<(), NeopixelError>;

    fn commit(&mut self) -> Result<(), NeopixelError>;
}

/// Owns the pixel driver. Only the actuator holds one of these, so frames
/// are never interleaved.
pub struct LightController {
    driver: Box<dyn PixelDriver>,
}

impl LightController {
    pub fn init(config: &Config) -> Result<Self, Error> {
        let pixels = config.lights.pixel_count;
        info!("Lights: initializing {} pixel(s)", pixels);

        #[cfg(feature = "pi")]
        let driver: Box<dyn PixelDriver> = Box::new(spi::SpiDriver::new(
            pixels,
            config.lights.spi_clock_hz,
        )?);

        // Without the hardware, frames are kept in memory and logged
        #[cfg(not(feature = "pi"))]
        let driver: Box<dyn PixelDriver> = Box::new(MemoryDriver::new(pixels));

        Ok(Self { driver })
    }

    pub fn new(driver: impl PixelDriver + 'static) -> Self {
        Self {
            driver: Box::new(driver),
        }
    }

    pub fn len(&self) -> usize {
        self.driver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set every pixel to `color` and commit the frame
    pub fn fill(&mut self, color: RGB8) -> Result<(), NeopixelError> {
        for i in 0..self.driver.len() {
            self.driver.set(i, color)?;
        }
        self.driver.commit()
    }
}

/// Frames committed to a `MemoryDriver`, readable from another thread.
#[derive(Clone, Default)]
pub struct FrameLog {
    inner: Arc<Mutex<FrameLogInner>>,
}

#[derive(Default)]
struct FrameLogInner {
    frames: Vec<Vec<RGB8>>,
    failures: usize,
}

impl FrameLog {
    fn lock(&self) -> MutexGuard<'_, FrameLogInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn frames(&self) -> Vec<Vec<RGB8>> {
        self.lock().frames.clone()
    }

    pub fn last(&self) -> Option<Vec<RGB8>> {
        self.lock().frames.last().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next `count` commits fail
    pub fn fail_next(&self, count: usize) {
        self.lock().failures = count;
    }
}

/// A driver with no hardware behind it
pub struct MemoryDriver {
    pixels: Vec<RGB8>,
    log: FrameLog,
}

impl MemoryDriver {
    pub fn new(len: usize) -> Self {
        Self {
            pixels: vec![RGB8::default(); len],
            log: FrameLog::default(),
        }
    }

    pub fn frame_log(&self) -> FrameLog {
        self.log.clone()
    }
}

impl PixelDriver for MemoryDriver {
    fn len(&self) -> usize {
        self.pixels.len()
    }

    fn set(&mut self, index: usize, color: RGB8) -> Result<(), NeopixelError> {
        let len = self.pixels.len();
        let pixel = self.pixels.get_mut(index).ok_or_else(|| {
            NeopixelError::ActuationWriteFailure(format!(
                "pixel {} out of range for {} pixel(s)",
                index, len
            ))
        })?;
        *pixel = color;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), NeopixelError> {
        let mut log = self.log.lock();
        if log.failures > 0 {
            log.failures -= 1;
            return Err(NeopixelError::ActuationWriteFailure(
                "injected commit failure".to_string(),
            ));
        }

        debug!("Lights: frame {:?}", self.pixels);
        log.frames.push(self.pixels.clone());
        Ok(())
    }
}
