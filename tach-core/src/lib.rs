#![no_std]

// Shared logic for the fan tach capture and synthesis subsystem.
//
// Everything here stays portable across the MCU firmware and the host emulator:
// hardware access goes through the traits in `irq`, `pin`, `timebase` and
// `synth`, and all buffers are bounded.

pub mod capture;
pub mod config;
pub mod console;
pub mod controller;
pub mod diag;
pub mod duty;
pub mod irq;
pub mod pin;
pub mod synth;
pub mod timebase;

pub use controller::TachController;
