//! Ownership of the shared tach pin.
//!
//! The tach line is wired to one GPIO that either listens for falling edges
//! (capture) or carries the synthesized waveform (synth). [`PinArbiter`] holds
//! the pin, the edge interrupt line and the current owner; every role change
//! goes through [`PinArbiter::assign`] so the edge interrupt can never stay
//! armed against a pin that is being driven.

use core::fmt;

use crate::capture::PulseAccumulator;
use crate::irq::IrqLine;

/// Logical owner of the tach pin.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PinRole {
    /// Nobody drives or listens; the edge interrupt is masked.
    Unowned,
    /// Input with pull-up, falling-edge interrupt armed.
    Capture,
    /// Output driven by the burst synthesizer.
    Synth,
}

impl PinRole {
    /// Upper-case label used by the console.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            PinRole::Unowned => "UNOWNED",
            PinRole::Capture => "CAPTURE",
            PinRole::Synth => "SYNTH",
        }
    }
}

/// Pin configuration hooks. Implementations only touch the pad and its
/// alternate-function routing; interrupt masking lives in [`IrqLine`].
pub trait TachPin {
    /// Digital input, weak pull-up, falling-edge detection selected.
    fn into_capture_input(&mut self);

    /// Routes the pin to the carrier timer output.
    fn into_carrier_output(&mut self);

    /// Plain GPIO output held low.
    fn drive_low(&mut self);
}

/// Returned when capture is requested while the synthesizer owns the pin.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PinBusy {
    pub owner: PinRole,
}

impl fmt::Display for PinBusy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tach pin owned by {}", self.owner.label())
    }
}

/// Single arbitration point for the tach pin.
pub struct PinArbiter<'a, P, E> {
    pin: P,
    edge_irq: E,
    pulses: &'a PulseAccumulator,
    role: PinRole,
}

impl<'a, P: TachPin, E: IrqLine> PinArbiter<'a, P, E> {
    /// Takes the pin in the idle state: plain low output, edge interrupt masked.
    #[must_use]
    pub fn new(mut pin: P, mut edge_irq: E, pulses: &'a PulseAccumulator) -> Self {
        edge_irq.mask();
        pin.drive_low();
        Self {
            pin,
            edge_irq,
            pulses,
            role: PinRole::Unowned,
        }
    }

    /// Current owner.
    #[must_use]
    pub fn role(&self) -> PinRole {
        self.role
    }

    /// Reconfigures the pin for `role` and returns the previous owner.
    ///
    /// The edge interrupt is masked before the pad changes and is unmasked only
    /// once the pad is a capture input again. Handing the pin back from the
    /// synthesizer restarts the pulse accumulator, since anything counted
    /// before the handover belongs to a stale window.
    pub fn assign(&mut self, role: PinRole) -> PinRole {
        let previous = self.role;
        if previous == role {
            return previous;
        }

        self.edge_irq.mask();
        match role {
            PinRole::Unowned => {}
            PinRole::Synth => self.pin.drive_low(),
            PinRole::Capture => {
                self.pin.into_capture_input();
                if previous == PinRole::Synth {
                    self.pulses.reset();
                }
                self.edge_irq.clear_pending();
                self.edge_irq.unmask();
            }
        }

        self.role = role;
        previous
    }

    /// Grants pin access to `role` if it is the current owner.
    pub fn pin_for(&mut self, role: PinRole) -> Option<&mut P> {
        if self.role == role {
            Some(&mut self.pin)
        } else {
            None
        }
    }

    /// Edge interrupt line guarding the pulse accumulator.
    pub fn edge_irq_mut(&mut self) -> &mut E {
        &mut self.edge_irq
    }

    /// Pulse accumulator fed by the edge interrupt.
    #[must_use]
    pub fn pulses(&self) -> &'a PulseAccumulator {
        self.pulses
    }
}
