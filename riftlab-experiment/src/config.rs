use riftlab_core::{IntensityRange, Rgb, SetupError, Waveform};
use serde::{Deserialize, Serialize};

/// Whether a response observed while the stimulus is still flickering ends
/// the remaining frames early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponsePolicy {
    EndsStimulus,
    RunsToCompletion,
}

impl Default for ResponsePolicy {
    fn default() -> Self {
        Self::RunsToCompletion
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default = "ExperimentConfig::default_background")]
    pub background: Rgb,
    #[serde(default = "ExperimentConfig::default_stimulus_radius_px")]
    pub stimulus_radius_px: u32,
    #[serde(default = "ExperimentConfig::default_edge_sigma")]
    pub edge_sigma: f32,

    #[serde(default = "ExperimentConfig::default_cue_duration_s")]
    pub cue_duration_s: f64,
    #[serde(default = "ExperimentConfig::default_left_frequency_hz")]
    pub left_frequency_hz: f64,
    #[serde(default = "ExperimentConfig::default_right_frequency_hz")]
    pub right_frequency_hz: f64,
    #[serde(default = "ExperimentConfig::default_waveform")]
    pub waveform: Waveform,

    #[serde(default = "ExperimentConfig::default_color_a")]
    pub color_a: Rgb,
    #[serde(default = "ExperimentConfig::default_color_b")]
    pub color_b: Rgb,
    #[serde(default)]
    pub intensity: IntensityRange,
    #[serde(default = "ExperimentConfig::default_luminance_multiplier")]
    pub luminance_multiplier: f32,
    #[serde(default = "ExperimentConfig::default_saturation_level")]
    pub saturation_level: f32,

    #[serde(default = "ExperimentConfig::default_probe_duration_s")]
    pub probe_duration_s: f64,
    #[serde(default = "ExperimentConfig::default_probe_radius_px")]
    pub probe_radius_px: f32,

    #[serde(default = "ExperimentConfig::default_fixation_range_s")]
    pub fixation_range_s: (f64, f64),
    #[serde(default = "ExperimentConfig::default_response_timeout_s")]
    pub response_timeout_s: f64,
    #[serde(default)]
    pub response_policy: ResponsePolicy,
    #[serde(default = "ExperimentConfig::default_feedback_duration_s")]
    pub feedback_duration_s: f64,
    #[serde(default = "ExperimentConfig::default_intertrial_range_s")]
    pub intertrial_range_s: (f64, f64),

    #[serde(default = "ExperimentConfig::default_miss_threshold_fraction")]
    pub miss_threshold_fraction: f64,
    #[serde(default = "ExperimentConfig::default_response_poll_interval_s")]
    pub response_poll_interval_s: f64,

    #[serde(default = "ExperimentConfig::default_cue_trigger_code")]
    pub cue_trigger_code: u8,
    #[serde(default = "ExperimentConfig::default_probe_trigger_code")]
    pub probe_trigger_code: u8,

    #[serde(default = "ExperimentConfig::default_trial_count")]
    pub trial_count: usize,
    #[serde(default = "ExperimentConfig::default_output_path")]
    pub output_path: String,
}

impl ExperimentConfig {
    fn default_background() -> Rgb {
        [0.1, 0.1, 0.1]
    }
    fn default_stimulus_radius_px() -> u32 {
        128
    }
    fn default_edge_sigma() -> f32 {
        0.3
    }
    fn default_cue_duration_s() -> f64 {
        1.0
    }
    fn default_left_frequency_hz() -> f64 {
        15.0
    }
    fn default_right_frequency_hz() -> f64 {
        20.0
    }
    fn default_waveform() -> Waveform {
        Waveform::Sine
    }
    fn default_color_a() -> Rgb {
        [0.0, 0.0, 1.0]
    }
    fn default_color_b() -> Rgb {
        [1.0, 1.0, 0.0]
    }
    fn default_luminance_multiplier() -> f32 {
        0.9
    }
    fn default_saturation_level() -> f32 {
        0.9
    }
    fn default_probe_duration_s() -> f64 {
        0.2
    }
    fn default_probe_radius_px() -> f32 {
        8.0
    }
    fn default_fixation_range_s() -> (f64, f64) {
        (0.5, 1.5)
    }
    fn default_response_timeout_s() -> f64 {
        2.0
    }
    fn default_feedback_duration_s() -> f64 {
        0.0
    }
    fn default_intertrial_range_s() -> (f64, f64) {
        (0.8, 1.2)
    }
    fn default_miss_threshold_fraction() -> f64 {
        0.5
    }
    fn default_response_poll_interval_s() -> f64 {
        0.0005
    }
    fn default_cue_trigger_code() -> u8 {
        1
    }
    fn default_probe_trigger_code() -> u8 {
        2
    }
    fn default_trial_count() -> usize {
        20
    }
    fn default_output_path() -> String {
        "session_results.json".into()
    }

    /// Fatal checks before any trial runs. Frequency/interval validity is
    /// re-checked by the sequence builders; this covers the rest.
    pub fn validate(&self) -> Result<(), SetupError> {
        if !(self.cue_duration_s > 0.0) {
            return Err(SetupError::InvalidDuration(self.cue_duration_s));
        }
        if !(self.probe_duration_s > 0.0) {
            return Err(SetupError::InvalidDuration(self.probe_duration_s));
        }
        if !(self.response_timeout_s > 0.0) {
            return Err(SetupError::InvalidDuration(self.response_timeout_s));
        }
        if self.fixation_range_s.0 > self.fixation_range_s.1 || self.fixation_range_s.0 < 0.0 {
            return Err(SetupError::InvalidDuration(self.fixation_range_s.0));
        }
        if self.intertrial_range_s.0 > self.intertrial_range_s.1 || self.intertrial_range_s.0 < 0.0
        {
            return Err(SetupError::InvalidDuration(self.intertrial_range_s.0));
        }
        if self.intensity.min > self.intensity.max {
            return Err(SetupError::EmptyIntensityRange {
                min: self.intensity.min,
                max: self.intensity.max,
            });
        }
        Ok(())
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            background: Self::default_background(),
            stimulus_radius_px: Self::default_stimulus_radius_px(),
            edge_sigma: Self::default_edge_sigma(),
            cue_duration_s: Self::default_cue_duration_s(),
            left_frequency_hz: Self::default_left_frequency_hz(),
            right_frequency_hz: Self::default_right_frequency_hz(),
            waveform: Self::default_waveform(),
            color_a: Self::default_color_a(),
            color_b: Self::default_color_b(),
            intensity: IntensityRange::default(),
            luminance_multiplier: Self::default_luminance_multiplier(),
            saturation_level: Self::default_saturation_level(),
            probe_duration_s: Self::default_probe_duration_s(),
            probe_radius_px: Self::default_probe_radius_px(),
            fixation_range_s: Self::default_fixation_range_s(),
            response_timeout_s: Self::default_response_timeout_s(),
            response_policy: ResponsePolicy::default(),
            feedback_duration_s: Self::default_feedback_duration_s(),
            intertrial_range_s: Self::default_intertrial_range_s(),
            miss_threshold_fraction: Self::default_miss_threshold_fraction(),
            response_poll_interval_s: Self::default_response_poll_interval_s(),
            cue_trigger_code: Self::default_cue_trigger_code(),
            probe_trigger_code: Self::default_probe_trigger_code(),
            trial_count: Self::default_trial_count(),
            output_path: Self::default_output_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ExperimentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stimulus_radius_px, 128);
        assert_eq!(config.response_policy, ResponsePolicy::RunsToCompletion);
    }

    #[test]
    fn partial_json_fills_remaining_defaults() {
        let config: ExperimentConfig =
            serde_json::from_str(r#"{"cue_duration_s": 2.0, "response_policy": "ends-stimulus"}"#)
                .unwrap();
        assert_eq!(config.cue_duration_s, 2.0);
        assert_eq!(config.response_policy, ResponsePolicy::EndsStimulus);
        assert_eq!(config.left_frequency_hz, 15.0);
    }

    #[test]
    fn validation_rejects_bad_durations() {
        let mut config = ExperimentConfig::default();
        config.cue_duration_s = 0.0;
        assert!(config.validate().is_err());

        let mut config = ExperimentConfig::default();
        config.fixation_range_s = (1.5, 0.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let config = ExperimentConfig::default();
        let text = serde_json::to_string(&config).unwrap();
        let back: ExperimentConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back.cue_duration_s, config.cue_duration_s);
        assert_eq!(back.waveform, config.waveform);
    }
}
