//! Mock device implementations for testing and development.
//!
//! This module provides simulated device implementations that can be controlled
//! programmatically without requiring physical hardware.

pub mod camera;
pub mod display;
pub mod gpio;
pub mod i2c;
pub mod keypad;

// Re-export commonly used types
pub use camera::{CaptureEvent, MockCamera, MockCameraHandle, solid_frame};
pub use display::{MockDisplay, MockDisplayHandle};
pub use gpio::{MockGpio, MockGpioHandle};
pub use i2c::{MockI2cBus, MockI2cHandle};
pub use keypad::{KeypadEvent, MockKeypad, MockKeypadHandle};
