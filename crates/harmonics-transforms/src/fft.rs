//! Raw-slice FFT helpers over rustfft.
//!
//! All routines here are unnormalized; callers apply whatever scaling their
//! normalization convention requires.

use num_complex::Complex as FftComplex;
use rustfft::FftPlanner;
use std::cell::RefCell;

pub(crate) type C32 = FftComplex<f32>;

// Thread-local FFT planner cache to avoid re-planning for the same sizes.
thread_local! {
    static PLANNER: RefCell<FftPlanner<f32>> = RefCell::new(FftPlanner::new());
}

/// In-place 1D FFT. `inverse` selects the conjugate (synthesis) transform.
/// No 1/N normalization is applied in either direction.
pub(crate) fn fft_in_place(data: &mut [C32], inverse: bool) {
    let n = data.len();
    PLANNER.with(|p| {
        let fft = if inverse {
            p.borrow_mut().plan_fft_inverse(n)
        } else {
            p.borrow_mut().plan_fft_forward(n)
        };
        fft.process(data);
    });
}

/// In-place unnormalized 2D DFT of a row-major `h x w` buffer: rows first,
/// then columns through a gather/scatter scratch vector.
pub(crate) fn dft2_in_place(buf: &mut [C32], h: usize, w: usize, inverse: bool) {
    debug_assert_eq!(buf.len(), h * w);
    for r in 0..h {
        fft_in_place(&mut buf[r * w..(r + 1) * w], inverse);
    }
    let mut col = vec![C32::new(0.0, 0.0); h];
    for c in 0..w {
        for r in 0..h {
            col[r] = buf[r * w + c];
        }
        fft_in_place(&mut col, inverse);
        for r in 0..h {
            buf[r * w + c] = col[r];
        }
    }
}

/// Source rows kept by a centered latitude truncation: the first
/// `ceil(lmax/2)` rows (non-negative frequencies) and the last
/// `floor(lmax/2)` rows (negative frequencies).
pub(crate) fn truncated_rows(nlat: usize, lmax: usize) -> Vec<usize> {
    let head = lmax.div_ceil(2);
    let tail = lmax / 2;
    let mut rows = Vec::with_capacity(lmax);
    rows.extend(0..head);
    rows.extend(nlat - tail..nlat);
    rows
}

/// Extend the non-negative half-spectrum of one row to a full length-`w`
/// Hermitian spectrum. `rowbuf[..half]` must already be filled, the rest
/// zeroed; DC and (for even `w`) Nyquist bins are self-conjugate and left
/// untouched.
pub(crate) fn hermitian_extend_row(rowbuf: &mut [C32], half: usize) {
    let w = rowbuf.len();
    for m in 1..half {
        let mirror = w - m;
        if mirror != m {
            rowbuf[mirror] = rowbuf[m].conj();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fft_roundtrip() {
        let n = 64;
        let x: Vec<f32> = (0..n).map(|i| (i as f32 * 0.1).sin()).collect();
        let mut buf: Vec<C32> = x.iter().map(|&v| C32::new(v, 0.0)).collect();

        fft_in_place(&mut buf, false);
        fft_in_place(&mut buf, true);

        for i in 0..n {
            assert!(
                (buf[i].re / n as f32 - x[i]).abs() < 1e-5,
                "roundtrip failed at {}: {} vs {}",
                i,
                buf[i].re / n as f32,
                x[i]
            );
        }
    }

    #[test]
    fn test_dft2_roundtrip() {
        let (h, w) = (8, 12);
        let x: Vec<f32> = (0..h * w).map(|i| (i as f32 * 0.37).cos()).collect();
        let mut buf: Vec<C32> = x.iter().map(|&v| C32::new(v, 0.0)).collect();

        dft2_in_place(&mut buf, h, w, false);
        dft2_in_place(&mut buf, h, w, true);

        let scale = 1.0 / (h * w) as f32;
        for i in 0..h * w {
            assert!((buf[i].re * scale - x[i]).abs() < 1e-4);
            assert!((buf[i].im * scale).abs() < 1e-4);
        }
    }

    #[test]
    fn test_truncated_rows_split() {
        assert_eq!(truncated_rows(16, 8), vec![0, 1, 2, 3, 12, 13, 14, 15]);
        assert_eq!(truncated_rows(16, 5), vec![0, 1, 2, 14, 15]);
        assert_eq!(truncated_rows(16, 16), (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_hermitian_extension() {
        let w = 8;
        let half = w / 2 + 1;
        let mut row = vec![C32::new(0.0, 0.0); w];
        for m in 0..half {
            row[m] = C32::new(m as f32, m as f32 * 0.5);
        }
        hermitian_extend_row(&mut row, half);
        for m in 1..half - 1 {
            assert_eq!(row[w - m], row[m].conj());
        }
        // Nyquist bin mirrors onto itself and must not be conjugated away.
        assert_eq!(row[w / 2], C32::new(4.0, 2.0));
    }
}
