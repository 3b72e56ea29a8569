//! Backend-free shape planning.
//!
//! Every network in [`crate::model`] is a fixed pipeline, so its output shape
//! can be worked out from the layer hyper-parameters alone. The planner here
//! mirrors burn's own size formulas and is used to validate inputs before a
//! tensor is ever built.

use std::fmt;

use crate::error::{Result, ShapeError};

/// Output size of a convolution (or pooling) window along one axis.
pub fn conv_output(size: usize, kernel: usize, stride: usize, padding: usize) -> Option<usize> {
    size.checked_add(padding.checked_mul(2)?)?
        .checked_sub(kernel)
        .map(|span| span / stride + 1)
}

/// Output size of a transposed convolution along one axis.
///
/// With kernel 3, stride 2, padding 1 this is `2 * size - 1`, not a clean
/// doubling.
pub fn conv_transpose_output(
    size: usize,
    kernel: usize,
    stride: usize,
    padding: usize,
) -> Option<usize> {
    let span = size.checked_sub(1)?.checked_mul(stride)?.checked_add(kernel)?;
    span.checked_sub(padding.checked_mul(2)?)
        .filter(|&out| out > 0)
}

pub fn pool_output(size: usize, kernel: usize, stride: usize) -> Option<usize> {
    conv_output(size, kernel, stride, 0)
}

/// One shape-changing layer of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Conv {
        channels: [usize; 2],
        kernel: usize,
        stride: usize,
        padding: usize,
    },
    ConvTranspose {
        channels: [usize; 2],
        kernel: usize,
        stride: usize,
        padding: usize,
    },
    MaxPool {
        kernel: usize,
        stride: usize,
    },
}

impl Stage {
    /// Shape of the tensor this stage produces from `dims`.
    pub fn apply(&self, dims: [usize; 4]) -> Result<[usize; 4]> {
        let [batch, channels, height, width] = dims;
        if dims.contains(&0) {
            return Err(ShapeError::EmptyAxis { dims });
        }
        if !self.fits(height) || !self.fits(width) {
            return Err(ShapeError::Overflow { dims });
        }

        let out_channels = match *self {
            Stage::Conv {
                channels: [c_in, c_out],
                ..
            }
            | Stage::ConvTranspose {
                channels: [c_in, c_out],
                ..
            } => {
                check_channels(c_in, channels)?;
                c_out
            }
            Stage::MaxPool { .. } => channels,
        };

        Ok([batch, out_channels, self.resize(height)?, self.resize(width)?])
    }

    /// Whether the size formulas for this stage stay within `usize`.
    fn fits(&self, size: usize) -> bool {
        match *self {
            Stage::Conv { padding, .. } => padding
                .checked_mul(2)
                .and_then(|pad| size.checked_add(pad))
                .is_some(),
            Stage::ConvTranspose {
                kernel, stride, ..
            } => size
                .checked_mul(stride)
                .and_then(|span| span.checked_add(kernel))
                .is_some(),
            Stage::MaxPool { .. } => true,
        }
    }

    fn resize(&self, size: usize) -> Result<usize> {
        let out = match *self {
            Stage::Conv {
                kernel,
                stride,
                padding,
                ..
            } => conv_output(size, kernel, stride, padding),
            Stage::ConvTranspose {
                kernel,
                stride,
                padding,
                ..
            } => conv_transpose_output(size, kernel, stride, padding),
            Stage::MaxPool { kernel, stride } => pool_output(size, kernel, stride),
        };

        out.filter(|&out| out > 0)
            .ok_or_else(|| ShapeError::TooSmall {
                stage: self.to_string(),
                size,
            })
    }
}

fn check_channels(expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(ShapeError::Channels { expected, found });
    }
    Ok(())
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Conv {
                channels: [c_in, c_out],
                kernel,
                stride,
                padding,
            } => write!(f, "conv {c_in}->{c_out} k{kernel} s{stride} p{padding}"),
            Stage::ConvTranspose {
                channels: [c_in, c_out],
                kernel,
                stride,
                padding,
            } => write!(f, "conv_t {c_in}->{c_out} k{kernel} s{stride} p{padding}"),
            Stage::MaxPool { kernel, stride } => write!(f, "maxpool k{kernel} s{stride}"),
        }
    }
}

/// Shapes after each stage, starting with the input itself.
pub fn trace(stages: &[Stage], input: [usize; 4]) -> Result<Vec<[usize; 4]>> {
    let mut shapes = Vec::with_capacity(stages.len() + 1);
    let mut dims = input;
    if dims.contains(&0) {
        return Err(ShapeError::EmptyAxis { dims });
    }
    shapes.push(dims);

    for stage in stages {
        dims = stage.apply(dims)?;
        shapes.push(dims);
    }

    Ok(shapes)
}

pub fn output_shape(stages: &[Stage], input: [usize; 4]) -> Result<[usize; 4]> {
    if input.contains(&0) {
        return Err(ShapeError::EmptyAxis { dims: input });
    }
    stages.iter().try_fold(input, |dims, stage| stage.apply(dims))
}

/// Checks a flat buffer against the shape it is meant to fill.
pub fn check_buffer(len: usize, dims: [usize; 4]) -> Result<()> {
    let expected = dims
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or(ShapeError::Overflow { dims })?;
    if len != expected {
        return Err(ShapeError::BufferLength {
            expected,
            found: len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOWN: Stage = Stage::Conv {
        channels: [3, 64],
        kernel: 3,
        stride: 2,
        padding: 1,
    };

    #[test]
    fn conv_halves_with_ceiling() {
        assert_eq!(conv_output(64, 3, 2, 1), Some(32));
        assert_eq!(conv_output(35, 3, 2, 1), Some(18));
        assert_eq!(conv_output(9, 4, 1, 0), Some(6));
        assert_eq!(conv_output(3, 4, 1, 0), None);
    }

    #[test]
    fn conv_transpose_is_two_h_minus_one() {
        for size in 1..20 {
            assert_eq!(conv_transpose_output(size, 3, 2, 1), Some(2 * size - 1));
        }
        assert_eq!(conv_transpose_output(0, 3, 2, 1), None);
    }

    #[test]
    fn pool_floors() {
        assert_eq!(pool_output(64, 2, 2), Some(32));
        assert_eq!(pool_output(7, 2, 2), Some(3));
        assert_eq!(pool_output(1, 2, 2), None);
    }

    #[test]
    fn stage_rejects_wrong_channels() {
        let err = DOWN.apply([1, 4, 16, 16]).unwrap_err();
        assert_eq!(
            err,
            ShapeError::Channels {
                expected: 3,
                found: 4
            }
        );
    }

    #[test]
    fn stage_rejects_empty_axis() {
        let err = DOWN.apply([0, 3, 16, 16]).unwrap_err();
        assert!(matches!(err, ShapeError::EmptyAxis { .. }));
    }

    #[test]
    fn pool_too_small_reports_stage() {
        let pool = Stage::MaxPool {
            kernel: 2,
            stride: 2,
        };
        match pool.apply([1, 8, 1, 4]).unwrap_err() {
            ShapeError::TooSmall { stage, size } => {
                assert_eq!(stage, "maxpool k2 s2");
                assert_eq!(size, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn trace_includes_input() {
        let up = Stage::ConvTranspose {
            channels: [64, 32],
            kernel: 3,
            stride: 2,
            padding: 1,
        };
        let shapes = trace(&[DOWN, up], [2, 3, 10, 12]).unwrap();
        assert_eq!(shapes, vec![[2, 3, 10, 12], [2, 64, 5, 6], [2, 32, 9, 11]]);
        assert_eq!(output_shape(&[DOWN, up], [2, 3, 10, 12]).unwrap(), [2, 32, 9, 11]);
    }

    #[test]
    fn huge_sizes_do_not_wrap() {
        assert_eq!(conv_output(usize::MAX, 3, 2, 1), None);
        assert_eq!(conv_transpose_output(usize::MAX, 3, 2, 1), None);
        assert_eq!(pool_output(usize::MAX, 2, 2), Some(usize::MAX / 2));

        let up = Stage::ConvTranspose {
            channels: [3, 8],
            kernel: 3,
            stride: 2,
            padding: 1,
        };
        let dims = [1, 3, usize::MAX / 2 + 2, 1];
        assert_eq!(
            output_shape(&[up], dims).unwrap_err(),
            ShapeError::Overflow { dims }
        );
        assert!(matches!(
            DOWN.apply([1, 3, 4, usize::MAX]),
            Err(ShapeError::Overflow { .. })
        ));
    }

    #[test]
    fn buffer_length_overflow_is_an_error() {
        let dims = [usize::MAX, 3, 2, 2];
        assert_eq!(
            check_buffer(0, dims).unwrap_err(),
            ShapeError::Overflow { dims }
        );
    }

    #[test]
    fn empty_input_rejected_without_stages() {
        let dims = [0, 3, 8, 8];
        assert_eq!(
            output_shape(&[], dims).unwrap_err(),
            ShapeError::EmptyAxis { dims }
        );
        assert_eq!(trace(&[], dims).unwrap_err(), ShapeError::EmptyAxis { dims });
    }

    #[test]
    fn buffer_length_is_checked() {
        assert!(check_buffer(12, [1, 3, 2, 2]).is_ok());
        assert_eq!(
            check_buffer(11, [1, 3, 2, 2]).unwrap_err(),
            ShapeError::BufferLength {
                expected: 12,
                found: 11
            }
        );
    }
}
