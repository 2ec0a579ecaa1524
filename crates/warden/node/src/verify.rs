//! Biometric verification pipeline
//!
//! One pipeline runs per scan cycle, after the credential has been resolved.
//! It prompts the operator, then polls the sensor for a bounded window.
//! A window that expires without a match costs one attempt; the pipeline
//! fails once every attempt is used.

use crate::config::BiometricConfig;
use crate::devices::{BiometricMatch, BiometricSensor};
use crate::feedback::Feedback;
use crate::panel::Panel;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};
use warden_types::CredentialUid;

const PROMPT_BEEP: Duration = Duration::from_millis(100);
const MATCH_HOLD: Duration = Duration::from_secs(1);

/// State of the two-factor check for one presentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationAttempt {
    pub credential_uid: CredentialUid,
    pub biometric_id: Option<u16>,
    pub attempts_used: u32,
}

impl VerificationAttempt {
    fn new(credential_uid: CredentialUid) -> Self {
        Self {
            credential_uid,
            biometric_id: None,
            attempts_used: 0,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.biometric_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    /// Prompting and waiting for a finger
    Start,
    /// Matched the given template
    Verified(u16),
    /// Every attempt expired
    Failed,
}

impl VerificationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, VerificationState::Start)
    }
}

pub struct VerificationPipeline<'a> {
    config: &'a BiometricConfig,
    attempt: VerificationAttempt,
    state: VerificationState,
}

impl<'a> VerificationPipeline<'a> {
    pub fn new(config: &'a BiometricConfig, credential_uid: CredentialUid) -> Self {
        Self {
            config,
            attempt: VerificationAttempt::new(credential_uid),
            state: VerificationState::Start,
        }
    }

    pub fn state(&self) -> VerificationState {
        self.state
    }

    /// Drive the pipeline to a terminal state.
    #[instrument(skip_all, fields(uid = %self.attempt.credential_uid))]
    pub async fn run(
        mut self,
        sensor: &mut dyn BiometricSensor,
        panel: &mut Panel,
        feedback: &mut Feedback,
    ) -> VerificationAttempt {
        while !self.state.is_terminal() {
            self.state = self.attempt_once(sensor, panel, feedback).await;
        }

        if self.state == VerificationState::Failed {
            warn!(
                attempts = self.attempt.attempts_used,
                "Biometric verification failed"
            );
        }
        self.attempt
    }

    async fn attempt_once(
        &mut self,
        sensor: &mut dyn BiometricSensor,
        panel: &mut Panel,
        feedback: &mut Feedback,
    ) -> VerificationState {
        let max = self.config.max_attempts;
        panel.show(
            "Place Finger",
            &format!("Try {}/{}", self.attempt.attempts_used + 1, max),
        );
        feedback.beep(PROMPT_BEEP).await;

        if let Some(found) = self.await_match(sensor).await {
            info!(
                template_id = found.template_id,
                confidence = found.confidence,
                "Fingerprint matched"
            );
            self.attempt.biometric_id = Some(found.template_id);
            panel.show("Finger OK", &format!("ID: {}", found.template_id));
            sleep(MATCH_HOLD).await;
            return VerificationState::Verified(found.template_id);
        }

        self.attempt.attempts_used += 1;
        debug!(attempts = self.attempt.attempts_used, "Biometric window expired");
        if self.attempt.attempts_used < max {
            panel.show("Try Again", "");
            sleep(self.config.retry_pause()).await;
            VerificationState::Start
        } else {
            VerificationState::Failed
        }
    }

    /// Poll the sensor until it reports a match or the window closes.
    async fn await_match(&self, sensor: &mut dyn BiometricSensor) -> Option<BiometricMatch> {
        let opened = Instant::now();
        while opened.elapsed() < self.config.window() {
            match sensor.scan().await {
                Ok(Some(found)) => return Some(found),
                Ok(None) => {}
                Err(e) => debug!(error = %e, "Biometric read failed"),
            }
            sleep(self.config.poll_interval()).await;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::devices::sim::{self, SensorReply, SimHandles};
    use crate::devices::Devices;
    use crate::error::BiometricError;

    struct Rig {
        sensor: Box<dyn BiometricSensor>,
        handles: SimHandles,
        panel: Panel,
        feedback: Feedback,
    }

    fn rig() -> Rig {
        let (devices, handles) = sim::devices(&SimulationConfig::default());
        let Devices {
            sensor,
            display,
            indicators,
            ..
        } = devices;
        Rig {
            sensor,
            handles,
            panel: Panel::new(display),
            feedback: Feedback::new(indicators),
        }
    }

    fn uid() -> CredentialUid {
        CredentialUid::parse("04A1B2C3").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_matching_sensor_uses_three_bounded_attempts() {
        let mut rig = rig();
        rig.handles.sensor.set_fallback(SensorReply::NoMatch);
        let config = BiometricConfig::default();

        let start = Instant::now();
        let attempt = VerificationPipeline::new(&config, uid())
            .run(rig.sensor.as_mut(), &mut rig.panel, &mut rig.feedback)
            .await;
        let elapsed = start.elapsed();

        assert!(!attempt.is_verified());
        assert_eq!(attempt.attempts_used, 3);
        // 50 polls per 5 s window at 100 ms
        assert_eq!(rig.handles.sensor.scans(), 150);
        // three windows with prompt beeps, two retry pauses
        assert!(elapsed >= Duration::from_millis(18_300));
        assert!(elapsed < Duration::from_millis(18_400));

        let prompts: Vec<_> = rig
            .handles
            .display
            .screens()
            .into_iter()
            .filter(|(top, _)| top == "Place Finger")
            .map(|(_, bottom)| bottom)
            .collect();
        assert_eq!(prompts, vec!["Try 1/3", "Try 2/3", "Try 3/3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_match_in_second_window() {
        let mut rig = rig();
        // the whole first window plus one poll of the second
        for _ in 0..51 {
            rig.handles.sensor.push(SensorReply::NoMatch);
        }
        rig.handles.sensor.set_fallback(SensorReply::Match(7));
        let config = BiometricConfig::default();

        let attempt = VerificationPipeline::new(&config, uid())
            .run(rig.sensor.as_mut(), &mut rig.panel, &mut rig.feedback)
            .await;

        assert_eq!(attempt.biometric_id, Some(7));
        assert_eq!(attempt.attempts_used, 1);
        assert!(rig.handles.display.showed("Try Again"));
        assert_eq!(
            rig.handles.display.last(),
            Some(("Finger OK".to_string(), "ID: 7".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_errors_count_as_no_match() {
        let mut rig = rig();
        rig.handles.sensor.push(SensorReply::Error(BiometricError::ImageConversion));
        rig.handles.sensor.push(SensorReply::Error(BiometricError::Search(9)));
        rig.handles.sensor.set_fallback(SensorReply::Match(2));
        let config = BiometricConfig::default();

        let attempt = VerificationPipeline::new(&config, uid())
            .run(rig.sensor.as_mut(), &mut rig.panel, &mut rig.feedback)
            .await;

        assert_eq!(attempt.biometric_id, Some(2));
        assert_eq!(attempt.attempts_used, 0);
        assert_eq!(rig.handles.sensor.scans(), 3);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!VerificationState::Start.is_terminal());
        assert!(VerificationState::Verified(1).is_terminal());
        assert!(VerificationState::Failed.is_terminal());
    }
}
