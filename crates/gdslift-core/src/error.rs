use thiserror::Error;

/// Configuration problems raised while building the layer table or a
/// clipping window. These are caller errors, not stream errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid window: ({xmin}, {ymin}) .. ({xmax}, {ymax})")]
    InvalidWindow {
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
    },

    #[error("invalid layer rule for ({layer}, {datatype}): {message}")]
    InvalidLayerRule {
        layer: i64,
        datatype: i64,
        message: String,
    },
}
