//! Status LED strip driver.
//!
//! The cabinet carries an addressable strip that is always driven as one
//! block of colour.  This driver tracks the last colour written and the
//! pixel count; the actual bus write is delegated to a frame writer so
//! the same driver runs against a real strip or the log.

use std::sync::Mutex;

use log::trace;

use crate::app::ports::{IndicatorError, IndicatorPort};
use crate::drivers::led_patterns::{OFF, Rgb};

/// Pushes one frame (one colour per pixel) to the strip.
pub trait FrameWriter: Send {
    fn write_frame(&mut self, frame: &[Rgb]) -> Result<(), IndicatorError>;
}

/// Writer used when no strip is attached: frames go to the trace log.
pub struct LogFrameWriter;

impl FrameWriter for LogFrameWriter {
    fn write_frame(&mut self, frame: &[Rgb]) -> Result<(), IndicatorError> {
        trace!("strip <- {:?} x{}", frame.first().copied().unwrap_or(OFF), frame.len());
        Ok(())
    }
}

struct StripState<W> {
    writer: W,
    frame: Vec<Rgb>,
}

pub struct StatusStrip<W: FrameWriter> {
    state: Mutex<StripState<W>>,
}

impl<W: FrameWriter> StatusStrip<W> {
    pub fn new(pixels: usize, writer: W) -> Self {
        Self {
            state: Mutex::new(StripState {
                writer,
                frame: vec![OFF; pixels],
            }),
        }
    }

    pub fn pixels(&self) -> usize {
        self.lock().frame.len()
    }

    pub fn current_colour(&self) -> Rgb {
        self.lock().frame.first().copied().unwrap_or(OFF)
    }

    pub fn off(&self) -> Result<(), IndicatorError> {
        self.fill(OFF)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StripState<W>> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<W: FrameWriter> IndicatorPort for StatusStrip<W> {
    fn fill(&self, colour: Rgb) -> Result<(), IndicatorError> {
        let mut state = self.lock();
        let StripState { writer, frame } = &mut *state;
        frame.fill(colour);
        writer.write_frame(frame)
    }
}
