//! Low-frame-rate stacking.
//!
//! Groups `lfr_m` consecutive filterbank rows with stride `lfr_n` into one
//! wider frame. The first row is replicated `(lfr_m - 1) / 2` times and
//! prepended so early boundaries stay well-defined; an incomplete tail group
//! is padded by replicating the last available row, never truncated.

/// Apply LFR stacking to `rows` of uniform width.
///
/// Returns `floor(rows.len() / lfr_n)` stacked frames, each
/// `rows[0].len() * lfr_m` wide. Passing `lfr_m == 1 && lfr_n == 1` is the
/// identity.
pub fn apply_lfr(rows: &[Vec<f32>], lfr_m: usize, lfr_n: usize) -> Vec<Vec<f32>> {
    if rows.is_empty() {
        return Vec::new();
    }
    if lfr_m == 1 && lfr_n == 1 {
        return rows.to_vec();
    }

    let dim = rows[0].len();
    let t_lfr = rows.len() / lfr_n;
    let left_pad = (lfr_m - 1) / 2;

    // Padded view: left_pad copies of the first row, then the originals.
    let padded_len = rows.len() + left_pad;
    let row_at = |i: usize| -> &Vec<f32> {
        if i < left_pad {
            &rows[0]
        } else {
            &rows[i - left_pad]
        }
    };

    let mut output = Vec::with_capacity(t_lfr);
    for i in 0..t_lfr {
        let mut frame = Vec::with_capacity(dim * lfr_m);
        let base = i * lfr_n;
        for j in 0..lfr_m {
            // Tail groups replicate the last available row.
            let idx = (base + j).min(padded_len - 1);
            frame.extend_from_slice(row_at(idx));
        }
        output.push(frame);
    }
    output
}
