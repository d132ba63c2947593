//! Duty-to-burst lookup table.

/// One calibration point: at `duty_percent` the fan emits `pulses_per_burst`
/// carrier cycles followed by `tail_us` of idle line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BurstPoint {
    pub duty_percent: u8,
    pub pulses_per_burst: u16,
    pub tail_us: u16,
}

impl BurstPoint {
    #[must_use]
    pub const fn new(duty_percent: u8, pulses_per_burst: u16, tail_us: u16) -> Self {
        Self {
            duty_percent,
            pulses_per_burst,
            tail_us,
        }
    }
}

/// Parameters of a single burst.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BurstTarget {
    pub pulses: u32,
    pub tail_us: u32,
}

/// A validated, ascending-by-duty burst table.
#[derive(Copy, Clone, Debug)]
pub struct BurstTable {
    points: &'static [BurstPoint],
}

impl BurstTable {
    /// Validates `points`. Evaluated in a `const` item, a malformed table is a
    /// compile error.
    ///
    /// # Panics
    ///
    /// Panics if there are fewer than two points or the duties are not
    /// strictly ascending.
    #[must_use]
    pub const fn new(points: &'static [BurstPoint]) -> Self {
        assert!(points.len() >= 2, "burst table needs at least two points");
        let mut i = 1;
        while i < points.len() {
            assert!(
                points[i - 1].duty_percent < points[i].duty_percent,
                "burst table duties must be strictly ascending"
            );
            i += 1;
        }
        Self { points }
    }

    /// Burst parameters for `duty` percent.
    ///
    /// Duties outside the table return the nearest end point unchanged.
    /// Between two points each output is interpolated linearly with half-up
    /// rounding of the scaled delta; the division truncates toward zero, so a
    /// falling segment rounds differently from a rising one. The first
    /// segment containing `duty` wins, so an interior point that ends a
    /// falling segment is not reproduced exactly.
    #[must_use]
    pub fn interpolate(&self, duty: u8) -> BurstTarget {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];

        if duty <= first.duty_percent {
            return target_of(first);
        }
        if duty >= last.duty_percent {
            return target_of(last);
        }

        for pair in self.points.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if duty >= lo.duty_percent && duty <= hi.duty_percent {
                let dx = i64::from(hi.duty_percent - lo.duty_percent);
                let xn = i64::from(duty - lo.duty_percent);
                let pulses = lerp(lo.pulses_per_burst, hi.pulses_per_burst, xn, dx);
                let tail = lerp(lo.tail_us, hi.tail_us, xn, dx);
                return BurstTarget {
                    pulses: clamp_u32(pulses, 1),
                    tail_us: clamp_u32(tail, 0),
                };
            }
        }

        target_of(last)
    }
}

fn target_of(point: BurstPoint) -> BurstTarget {
    BurstTarget {
        pulses: u32::from(point.pulses_per_burst),
        tail_us: u32::from(point.tail_us),
    }
}

fn lerp(y0: u16, y1: u16, xn: i64, dx: i64) -> i64 {
    let (y0, y1) = (i64::from(y0), i64::from(y1));
    y0 + ((y1 - y0) * xn + dx / 2) / dx
}

fn clamp_u32(value: i64, floor: u32) -> u32 {
    let clamped = u32::try_from(value).unwrap_or(if value < 0 { 0 } else { u32::MAX });
    clamped.max(floor)
}

const DEFAULT_POINTS: [BurstPoint; 7] = [
    BurstPoint::new(6, 98, 37),
    BurstPoint::new(15, 50, 93),
    BurstPoint::new(25, 36, 92),
    BurstPoint::new(40, 29, 103),
    BurstPoint::new(50, 28, 102),
    BurstPoint::new(62, 23, 102),
    BurstPoint::new(80, 19, 102),
];

/// Calibration measured on the reference fan.
pub const DEFAULT_BURST_TABLE: BurstTable = BurstTable::new(&DEFAULT_POINTS);

#[cfg(test)]
mod tests {
    use super::*;

    const PAIR: BurstTable = BurstTable::new(&[
        BurstPoint::new(25, 36, 92),
        BurstPoint::new(40, 29, 103),
    ]);

    fn target(pulses: u32, tail_us: u32) -> BurstTarget {
        BurstTarget { pulses, tail_us }
    }

    #[test]
    fn end_points_and_clamping() {
        assert_eq!(PAIR.interpolate(25), target(36, 92));
        assert_eq!(PAIR.interpolate(40), target(29, 103));
        assert_eq!(PAIR.interpolate(10), target(36, 92));
        assert_eq!(PAIR.interpolate(60), target(29, 103));
    }

    #[test]
    fn midpoint_rounding_is_asymmetric() {
        // Falling pulses: (-35 + 7) / 15 truncates to -1.
        // Rising tail: (55 + 7) / 15 truncates to 4.
        assert_eq!(PAIR.interpolate(30), target(35, 96));
    }

    #[test]
    fn default_table_covers_full_duty_range() {
        assert_eq!(DEFAULT_BURST_TABLE.interpolate(0), target(98, 37));
        assert_eq!(DEFAULT_BURST_TABLE.interpolate(100), target(19, 102));
        for duty in 0..=100 {
            assert!(DEFAULT_BURST_TABLE.interpolate(duty).pulses >= 1);
        }
    }

    #[test]
    fn interior_point_is_matched_by_the_segment_it_ends() {
        // 40..50 falls: 29 + (-10 + 5) / 10 truncates back to 29.
        assert_eq!(DEFAULT_BURST_TABLE.interpolate(50), target(29, 103));
        // 6..15: 98 + (-432 + 4) / 9 = 51 and 37 + (504 + 4) / 9 = 93.
        assert_eq!(DEFAULT_BURST_TABLE.interpolate(15), target(51, 93));
        // Rising tail on 50..62 is exact once the segment starts there.
        assert_eq!(DEFAULT_BURST_TABLE.interpolate(51), target(28, 102));
    }

    #[test]
    fn end_points_pass_through_while_interior_pulses_floor_at_one() {
        const ZERO: BurstTable =
            BurstTable::new(&[BurstPoint::new(10, 0, 5), BurstPoint::new(20, 0, 0)]);
        assert_eq!(ZERO.interpolate(5), target(0, 5));
        assert_eq!(ZERO.interpolate(25), target(0, 0));
        assert_eq!(ZERO.interpolate(15), target(1, 3));
    }
}
