//! WS2812 pixels driven from the SPI0 MOSI line.
//!
//! Each data bit becomes four SPI bits, `1110` for a one and `1000` for a
//! zero, so at 3.2 MHz every SPI bit lasts 312.5 ns and the pulse widths
//! land inside the WS2812 timing window.

use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use smart_leds::RGB8;

use super::PixelDriver;
use crate::error::NeopixelError;

/// Low time after a frame, in bytes of zeros (~80us at 3.2 MHz)
const RESET_BYTES: usize = 32;

pub struct SpiDriver {
    spi: Spi,
    pixels: Vec<RGB8>,
    buffer: Vec<u8>,
}

impl SpiDriver {
    pub fn new(len: usize, clock_hz: u32) -> Result<Self, anyhow::Error> {
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, clock_hz, Mode::Mode0)?;

        Ok(SpiDriver {
            spi,
            pixels: vec![RGB8::default(); len],
            buffer: Vec::with_capacity(len * 12 + RESET_BYTES),
        })
    }
}

/// Expand one byte into four SPI bytes, most significant bit first
fn encode_byte(byte: u8, out: &mut Vec<u8>) {
    for pair in (0..4).rev() {
        let hi = byte >> (pair * 2 + 1) & 1;
        let lo = byte >> (pair * 2) & 1;
        let nibble = |bit: u8| if bit == 1 { 0b1110 } else { 0b1000 };
        out.push(nibble(hi) << 4 | nibble(lo));
    }
}

impl PixelDriver for SpiDriver {
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
        self.buffer.clear();
        // WS2812 wants green first
        for pixel in &self.pixels {
            encode_byte(pixel.g, &mut self.buffer);
            encode_byte(pixel.r, &mut self.buffer);
            encode_byte(pixel.b, &mut self.buffer);
        }
        self.buffer.extend_from_slice(&[0; RESET_BYTES]);

        self.spi
            .write(&self.buffer)
            .map_err(|e| NeopixelError::ActuationWriteFailure(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_byte() {
        let mut out = Vec::new();
        encode_byte(0b1000_0001, &mut out);
        assert_eq!(out, vec![0b1110_1000, 0b1000_1000, 0b1000_1000, 0b1000_1110]);
    }
}
