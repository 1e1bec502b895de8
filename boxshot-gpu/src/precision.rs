//! Shader float precision probing

/// Range and precision of fragment-stage floats, as log2 values.
///
/// All zeros means the precision is unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShaderPrecision {
    pub range_min: u32,
    pub range_max: u32,
    pub precision: u32,
}

/// IEEE-754 single precision, what full shader models guarantee
pub const HIGH_FLOAT: ShaderPrecision = ShaderPrecision {
    range_min: 127,
    range_max: 127,
    precision: 23,
};

impl ShaderPrecision {
    /// Ask the adapter how precise fragment floats are.
    ///
    /// Returns `None` when the adapter only reports a legacy shader model,
    /// which makes no promise about float precision.
    pub fn query(adapter: &wgpu::Adapter) -> Option<Self> {
        Self::for_shader_model(adapter.get_downlevel_capabilities().shader_model)
    }

    /// Like [`ShaderPrecision::query`], falling back to all zeros
    pub fn query_or_default(adapter: &wgpu::Adapter) -> Self {
        Self::query(adapter).unwrap_or_else(|| {
            log::warn!("adapter does not report shader precision, assuming none");
            Self::default()
        })
    }

    fn for_shader_model(model: wgpu::ShaderModel) -> Option<Self> {
        match model {
            wgpu::ShaderModel::Sm4 | wgpu::ShaderModel::Sm5 => Some(HIGH_FLOAT),
            _ => None,
        }
    }

    /// Whether depth comparisons can use a tight bias
    pub fn is_high(&self) -> bool {
        self.precision >= HIGH_FLOAT.precision
    }

    /// Depth bias applied when comparing against the shadow map
    pub fn shadow_bias(&self) -> f32 {
        if self.is_high() {
            0.0005
        } else {
            0.005
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zeroed() {
        let precision = ShaderPrecision::default();
        assert_eq!((precision.range_min, precision.range_max, precision.precision), (0, 0, 0));
        assert!(!precision.is_high());
    }

    #[test]
    fn test_shader_models() {
        assert_eq!(ShaderPrecision::for_shader_model(wgpu::ShaderModel::Sm5), Some(HIGH_FLOAT));
        assert_eq!(ShaderPrecision::for_shader_model(wgpu::ShaderModel::Sm4), Some(HIGH_FLOAT));
        assert_eq!(ShaderPrecision::for_shader_model(wgpu::ShaderModel::Sm2), None);
    }

    #[test]
    fn test_unknown_precision_uses_wider_bias() {
        assert!(ShaderPrecision::default().shadow_bias() > HIGH_FLOAT.shadow_bias());
    }
}
