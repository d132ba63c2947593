//! Build-time configuration for the tach subsystem.
//!
//! Nothing here is adjustable at runtime. Boards override the defaults by
//! declaring their own `const` values and handing them to the components at
//! init.

/// Capture-side configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TachConfig {
    /// Base address of the GPIO port hosting the tach pin (reported in the banner).
    pub gpio_base: u32,
    /// Bit mask of the tach pin within its port.
    pub pin_mask: u32,
    /// Edges closer than this are rejected as coupling glitches.
    pub min_edge_us: u32,
    /// Length of one reporting window.
    pub report_period_ms: u32,
    /// Multiplier turning a per-window pulse count into RPM.
    ///
    /// A 2 pulse/rev fan measured over 0.5 s gives `60 * pulses`.
    pub rpm_per_pulse: u32,
}

impl TachConfig {
    pub const DEFAULT: Self = Self {
        gpio_base: 0,
        pin_mask: 0,
        min_edge_us: 200,
        report_period_ms: 500,
        rpm_per_pulse: 60,
    };

    /// Returns a copy bound to the supplied GPIO port and pin.
    #[must_use]
    pub const fn with_pin(self, gpio_base: u32, pin_mask: u32) -> Self {
        Self {
            gpio_base,
            pin_mask,
            ..self
        }
    }
}

impl Default for TachConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Synthesizer-side configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SynthConfig {
    /// Carrier frequency used during the pulse phase of a burst.
    pub carrier_hz: u32,
    /// Lower bound on the carrier period in timer ticks.
    pub min_carrier_period: u32,
}

impl SynthConfig {
    pub const DEFAULT: Self = Self {
        carrier_hz: 21_500,
        min_carrier_period: 10,
    };
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
