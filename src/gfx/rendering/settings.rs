//! Output settings applied to every frame

use serde::Deserialize;

/// Operator mapping HDR shading results into display range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ToneMap {
    None,
    AcesNarkowicz,
    #[default]
    KhrPbrNeutral,
}

impl ToneMap {
    /// Value of `FrameUniform::tone_map`
    pub fn shader_index(self) -> u32 {
        match self {
            ToneMap::None => 0,
            ToneMap::AcesNarkowicz => 1,
            ToneMap::KhrPbrNeutral => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Linear RGBA written where nothing is drawn
    pub clear_color: [f32; 4],
    pub exposure: f32,
    pub ibl_intensity: f32,
    /// Draw the environment behind the model while IBL is active
    pub render_environment: bool,
    pub tone_map: ToneMap,
    /// Light the model with the key and fill rig while IBL is inactive and
    /// the model has no lights of its own
    pub directional_light_fallback: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            clear_color: [0.1, 0.1, 0.1, 1.0],
            exposure: 1.0,
            ibl_intensity: 1.0,
            render_environment: true,
            tone_map: ToneMap::default(),
            directional_light_fallback: true,
        }
    }
}

impl RenderSettings {
    pub fn with_clear_color(mut self, rgba: [f32; 4]) -> Self {
        self.clear_color = rgba;
        self
    }

    pub fn with_exposure(mut self, exposure: f32) -> Self {
        self.exposure = exposure.max(0.0);
        self
    }

    pub fn with_tone_map(mut self, tone_map: ToneMap) -> Self {
        self.tone_map = tone_map;
        self
    }

    pub fn with_render_environment(mut self, enabled: bool) -> Self {
        self.render_environment = enabled;
        self
    }

    pub(crate) fn wgpu_clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_color.map(f64::from);
        wgpu::Color { r, g, b, a }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings: RenderSettings =
            serde_json::from_str(r#"{ "exposure": 2.0, "tone_map": "AcesNarkowicz" }"#).unwrap();
        assert_eq!(settings.exposure, 2.0);
        assert_eq!(settings.tone_map, ToneMap::AcesNarkowicz);
        assert!(settings.render_environment);
        assert_eq!(settings.clear_color, RenderSettings::default().clear_color);
    }

    #[test]
    fn test_tone_map_indices_match_shader() {
        assert_eq!(ToneMap::None.shader_index(), 0);
        assert_eq!(ToneMap::AcesNarkowicz.shader_index(), 1);
        assert_eq!(ToneMap::KhrPbrNeutral.shader_index(), 2);
    }
}
