//! Lock, LED and buzzer patterns

use crate::devices::{Indicators, Output};
use std::time::Duration;
use tokio::time::sleep;

const GRANT_BEEPS: usize = 3;
const GRANT_BEEP_ON: Duration = Duration::from_millis(200);
const GRANT_BEEP_OFF: Duration = Duration::from_millis(100);

const DENY_BLINKS: usize = 5;
const DENY_BLINK: Duration = Duration::from_millis(100);

const BOOT_BLINK: Duration = Duration::from_millis(200);
const BOOT_BEEP: Duration = Duration::from_millis(100);

/// Timed output patterns. Every pattern leaves the outputs it touched off,
/// except where noted.
pub struct Feedback {
    indicators: Box<dyn Indicators>,
}

impl Feedback {
    pub fn new(indicators: Box<dyn Indicators>) -> Self {
        Self { indicators }
    }

    pub fn set(&mut self, output: Output, on: bool) {
        self.indicators.set(output, on);
    }

    /// Drive every output low: lock engaged, LEDs and buzzer off.
    pub fn all_off(&mut self) {
        for output in Output::ALL {
            self.indicators.set(output, false);
        }
    }

    pub async fn pulse(&mut self, output: Output, length: Duration) {
        self.indicators.set(output, true);
        sleep(length).await;
        self.indicators.set(output, false);
    }

    pub async fn beep(&mut self, length: Duration) {
        self.pulse(Output::Buzzer, length).await;
    }

    /// Release the lock for `window`, then engage it again.
    pub async fn unlock(&mut self, window: Duration) {
        self.pulse(Output::Lock, window).await;
    }

    /// Three short beeps.
    pub async fn grant_chime(&mut self) {
        for _ in 0..GRANT_BEEPS {
            self.indicators.set(Output::Buzzer, true);
            sleep(GRANT_BEEP_ON).await;
            self.indicators.set(Output::Buzzer, false);
            sleep(GRANT_BEEP_OFF).await;
        }
    }

    /// Red LED and buzzer flashing together, about one second.
    pub async fn deny_alarm(&mut self) {
        for _ in 0..DENY_BLINKS {
            self.indicators.set(Output::RedLed, true);
            self.indicators.set(Output::Buzzer, true);
            sleep(DENY_BLINK).await;
            self.indicators.set(Output::RedLed, false);
            self.indicators.set(Output::Buzzer, false);
            sleep(DENY_BLINK).await;
        }
    }

    /// Ready signal at the end of boot.
    pub async fn boot_blink(&mut self) {
        self.pulse(Output::GreenLed, BOOT_BLINK).await;
        self.pulse(Output::RedLed, BOOT_BLINK).await;
        self.beep(BOOT_BEEP).await;
    }
}
