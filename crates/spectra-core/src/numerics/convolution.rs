use crate::domain::SpectraError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConvolutionError {
    #[error("convolution kernel must not be empty")]
    EmptyKernel,
    #[error("convolution signal must not be empty")]
    EmptySignal,
    #[error("kernel of {kernel} weights is longer than the {signal}-bin signal")]
    KernelLongerThanSignal { kernel: usize, signal: usize },
    #[error("kernel weight must be finite at index {index}, got {value}")]
    NonFiniteWeight { index: usize, value: f64 },
}

impl From<ConvolutionError> for SpectraError {
    fn from(error: ConvolutionError) -> Self {
        SpectraError::configuration("CONFIG.LSF_CONVOLUTION", error.to_string())
    }
}

/// Linear convolution trimmed to the signal length ("same" mode).
///
/// The full convolution has `signal + kernel - 1` samples; the output keeps
/// `signal` of them starting at offset `(kernel - 1) / 2`. Samples past either
/// edge of the signal contribute zero.
pub fn convolve_same(kernel: &[f64], signal: &[f64]) -> Result<Vec<f64>, ConvolutionError> {
    if kernel.is_empty() {
        return Err(ConvolutionError::EmptyKernel);
    }
    if signal.is_empty() {
        return Err(ConvolutionError::EmptySignal);
    }
    if kernel.len() > signal.len() {
        return Err(ConvolutionError::KernelLongerThanSignal {
            kernel: kernel.len(),
            signal: signal.len(),
        });
    }
    for (index, value) in kernel.iter().copied().enumerate() {
        if !value.is_finite() {
            return Err(ConvolutionError::NonFiniteWeight { index, value });
        }
    }

    let offset = (kernel.len() - 1) / 2;
    let output = (0..signal.len())
        .map(|index| {
            let full_index = index + offset;
            let first_tap = full_index.saturating_sub(signal.len() - 1);
            let last_tap = full_index.min(kernel.len() - 1);
            (first_tap..=last_tap)
                .map(|tap| kernel[tap] * signal[full_index - tap])
                .sum()
        })
        .collect();

    Ok(output)
}
