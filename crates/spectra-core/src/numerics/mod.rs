pub mod convolution;
pub mod interpolation;
pub mod noise;

pub use convolution::{ConvolutionError, convolve_same};
pub use interpolation::{InterpolationError, TemplateInterpolationInput, interpolate_template};
pub use noise::{GaussianNoiseInput, NoiseError, add_gaussian_noise};
