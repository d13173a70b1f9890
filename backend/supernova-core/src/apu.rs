//! APU stub: the four CPU-visible mailbox ports and internal timing, with no
//! SPC700 execution or DSP synthesis behind them.

mod timer;

use crate::apu::timer::Timer;
use bincode::{Decode, Encode};
use supernova_common::boxedarray::BoxedByteArray;

const AUDIO_RAM_LEN: usize = 64 * 1024;
const DSP_REGISTER_LEN: usize = 128;

// Timers 0/1 and timer 2 run at fixed subdivisions of the step counter
type SlowTimer = Timer<125>;
type SampleTimer = Timer<16000>;

// One silence sample pair roughly every 32kHz period at the master rate
const SAMPLE_INTERVAL_STEPS: u16 = 672;

// Cap the buffer at one second of unconsumed stereo output
const SAMPLE_BUFFER_CAP: usize = 2 * 32_000;

#[derive(Debug, Clone, Encode, Decode)]
pub(crate) struct Apu {
    cpu_to_apu_ports: [u8; 4],
    apu_to_cpu_ports: [u8; 4],
    audio_ram: BoxedByteArray<AUDIO_RAM_LEN>,
    dsp_registers: BoxedByteArray<DSP_REGISTER_LEN>,
    timer_0: SlowTimer,
    timer_1: SlowTimer,
    timer_2: SampleTimer,
    cycles: u64,
    sample_divider: u16,
    sample_buffer: Vec<i16>,
    sample_overflow_reported: bool,
}

impl Apu {
    pub fn new() -> Self {
        Self {
            cpu_to_apu_ports: [0; 4],
            apu_to_cpu_ports: [0; 4],
            audio_ram: BoxedByteArray::new(),
            dsp_registers: BoxedByteArray::new(),
            timer_0: SlowTimer::new(),
            timer_1: SlowTimer::new(),
            timer_2: SampleTimer::new(),
            cycles: 0,
            sample_divider: 0,
            sample_buffer: Vec::new(),
            sample_overflow_reported: false,
        }
    }

    pub fn step(&mut self) {
        self.cycles += 1;

        self.timer_0.tick();
        self.timer_1.tick();
        self.timer_2.tick();

        self.sample_divider += 1;
        if self.sample_divider == SAMPLE_INTERVAL_STEPS {
            self.sample_divider = 0;
            self.push_sample(0, 0);
        }
    }

    // Silence until a DSP produces real output
    fn push_sample(&mut self, left: i16, right: i16) {
        if self.sample_buffer.len() >= SAMPLE_BUFFER_CAP {
            if !self.sample_overflow_reported {
                log::warn!("Audio sample buffer full; dropping samples until drained");
                self.sample_overflow_reported = true;
            }
            return;
        }

        self.sample_buffer.push(left);
        self.sample_buffer.push(right);
    }

    /// Drain queued stereo samples (interleaved L/R).
    pub fn take_audio_samples(&mut self) -> Vec<i16> {
        self.sample_overflow_reported = false;
        std::mem::take(&mut self.sample_buffer)
    }

    /// CPU read of a mailbox port: observes the APU-to-CPU direction.
    pub fn read_port(&self, address: u16) -> u8 {
        self.apu_to_cpu_ports[usize::from(address & 0x03)]
    }

    /// CPU write of a mailbox port: deposits in the CPU-to-APU direction.
    pub fn write_port(&mut self, address: u16, value: u8) {
        self.cpu_to_apu_ports[usize::from(address & 0x03)] = value;
    }

    pub fn reset(&mut self) {
        self.cpu_to_apu_ports = [0; 4];
        self.apu_to_cpu_ports = [0; 4];
        self.audio_ram.fill(0);
        self.dsp_registers.fill(0);
        self.timer_0.reset();
        self.timer_1.reset();
        self.timer_2.reset();
        self.sample_divider = 0;
        self.sample_buffer.clear();
        self.sample_overflow_reported = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn mailbox_directions_are_independent() {
        let mut apu = Apu::new();

        apu.write_port(0x4000, 0x12);
        apu.write_port(0x4003, 0x34);

        assert_eq!(apu.cpu_to_apu_ports, [0x12, 0x00, 0x00, 0x34]);
        // The CPU-visible read side is driven by the (absent) SPC700
        assert_eq!(apu.read_port(0x4000), 0x00);
        assert_eq!(apu.read_port(0x4003), 0x00);

        apu.apu_to_cpu_ports[1] = 0x56;
        assert_eq!(apu.read_port(0x4001), 0x56);
    }

    #[test]
    fn samples_accumulate_at_the_output_rate() {
        let mut apu = Apu::new();

        for _ in 0..u32::from(SAMPLE_INTERVAL_STEPS) * 10 {
            apu.step();
        }

        let samples = apu.take_audio_samples();
        assert_eq!(samples.len(), 20);
        assert!(samples.iter().all(|&sample| sample == 0));
        assert!(apu.take_audio_samples().is_empty());
    }

    #[test]
    fn sample_buffer_is_bounded() {
        let mut apu = Apu::new();

        for _ in 0..u64::from(SAMPLE_INTERVAL_STEPS) * 40_000 {
            apu.step();
        }

        assert_eq!(apu.take_audio_samples().len(), SAMPLE_BUFFER_CAP);
    }
}
