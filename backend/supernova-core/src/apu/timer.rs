use bincode::{Decode, Encode};

/// Free-running interval timer clocked at a fixed subdivision of the APU
/// step counter, with a 4-bit rollover output.
#[derive(Debug, Clone, Encode, Decode)]
pub(crate) struct Timer<const STEP_DIVIDER: u16> {
    enabled: bool,
    step_counter: u16,
    counter: u16,
    target: u16,
    output: u8,
}

impl<const STEP_DIVIDER: u16> Timer<STEP_DIVIDER> {
    pub fn new() -> Self {
        Self { enabled: true, step_counter: 0, counter: 0, target: 256, output: 0 }
    }

    pub fn tick(&mut self) {
        if !self.enabled {
            return;
        }

        self.step_counter += 1;
        if self.step_counter >= STEP_DIVIDER {
            self.step_counter = 0;
            self.clock();
        }
    }

    fn clock(&mut self) {
        self.counter += 1;
        if self.counter >= self.target {
            self.counter = 0;
            self.output = (self.output + 1) & 0x0F;
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.counter = 0;
            self.output = 0;
        }
    }

    /// A divider of 0 selects the maximum interval of 256.
    pub fn set_target(&mut self, divider: u8) {
        self.target = if divider == 0 { 256 } else { divider.into() };
    }

    pub fn output(&self) -> u8 {
        self.output
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
