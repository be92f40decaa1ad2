//! Load Cell Sources

/// Raw load-cell ADC
pub trait LoadCell {
    /// Whether a conversion is available
    fn is_ready(&self) -> bool;

    /// Read one raw conversion
    fn read_raw(&mut self) -> i64;
}

impl<L: LoadCell + ?Sized> LoadCell for Box<L> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn read_raw(&mut self) -> i64 {
        (**self).read_raw()
    }
}

/// Simulated load cell sweeping a triangle wave between two raw values
#[derive(Debug, Clone)]
pub struct SimulatedLoadCell {
    low: i64,
    high: i64,
    step: i64,
    current: i64,
    rising: bool,
    ready: bool,
}

impl SimulatedLoadCell {
    /// Constant raw reading
    pub fn constant(raw: i64) -> Self {
        Self::ramp(raw, raw, 0)
    }

    /// Sweep from `low` to `high` and back, moving `step` counts per read
    pub fn ramp(low: i64, high: i64, step: i64) -> Self {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        Self {
            low,
            high,
            step: step.abs(),
            current: low,
            rising: true,
            ready: true,
        }
    }

    /// Place an offset load on the cell (shifts the whole sweep)
    pub fn shift(&mut self, counts: i64) {
        self.low += counts;
        self.high += counts;
        self.current += counts;
    }

    /// Toggle conversion availability
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    fn advance(&mut self) {
        if self.step == 0 || self.low == self.high {
            return;
        }
        if self.rising {
            self.current = (self.current + self.step).min(self.high);
            if self.current == self.high {
                self.rising = false;
            }
        } else {
            self.current = (self.current - self.step).max(self.low);
            if self.current == self.low {
                self.rising = true;
            }
        }
    }
}

impl LoadCell for SimulatedLoadCell {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn read_raw(&mut self) -> i64 {
        let raw = self.current;
        self.advance();
        raw
    }
}
