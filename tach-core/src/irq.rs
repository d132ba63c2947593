//! Interrupt masking primitives.
//!
//! Each ISR-shared resource names the single interrupt source that may touch
//! it. Code running outside that ISR opens a [`MaskedSection`] on the source
//! before reading or clearing the shared state, so every such access site is
//! visible in the source.

/// A single maskable interrupt source (an NVIC line, an EXTI line, a timer
/// update interrupt, ...).
pub trait IrqLine {
    /// Prevents the interrupt from being taken. Pending requests stay latched.
    fn mask(&mut self);

    /// Allows the interrupt to be taken again.
    fn unmask(&mut self);

    /// Drops any latched request without running the handler.
    fn clear_pending(&mut self);

    /// Returns `true` while the interrupt is masked.
    fn is_masked(&self) -> bool;
}

impl<T: IrqLine + ?Sized> IrqLine for &mut T {
    fn mask(&mut self) {
        (**self).mask();
    }

    fn unmask(&mut self) {
        (**self).unmask();
    }

    fn clear_pending(&mut self) {
        (**self).clear_pending();
    }

    fn is_masked(&self) -> bool {
        (**self).is_masked()
    }
}

/// Scoped guard that keeps an interrupt masked for its lifetime.
///
/// The previous mask state is restored on drop, so nesting a section inside a
/// path that already masked the line leaves it masked.
pub struct MaskedSection<'a, L: IrqLine> {
    line: &'a mut L,
    was_masked: bool,
}

impl<'a, L: IrqLine> MaskedSection<'a, L> {
    /// Masks `line` until the returned guard is dropped.
    #[must_use]
    pub fn enter(line: &'a mut L) -> Self {
        let was_masked = line.is_masked();
        if !was_masked {
            line.mask();
        }
        Self { line, was_masked }
    }
}

impl<L: IrqLine> Drop for MaskedSection<'_, L> {
    fn drop(&mut self) {
        if !self.was_masked {
            self.line.unmask();
        }
    }
}
