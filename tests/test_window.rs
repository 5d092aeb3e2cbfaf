use ndarray::{s, Array2};
use reachprep::{window_segment, Collapse, WindowParams};

fn non_overlapping(advance: usize) -> WindowParams {
    WindowParams { advance, bin_width: advance, num_steps: None, collapse: Collapse::Sum }
}

#[test]
fn non_overlapping_bin_count() {
    for len in [0usize, 1, 7, 50, 99, 250] {
        for advance in [1usize, 2, 5, 13] {
            let x = Array2::<f32>::ones((3, len));
            let y = Array2::<f32>::zeros((2, len));
            let w = window_segment(x.view(), y.view(), &non_overlapping(advance));
            assert_eq!(w.samples.dim(), (len / advance, advance, 3));
            assert_eq!(w.labels.dim(), (2, len / advance));
        }
    }
}

#[test]
fn unit_window_is_input_delayed_one_step() {
    // Bin c ends before its label column, so unit bins carry column c − 1
    // (bin 0 repeats column 0).  Labels are the input itself.
    let x = Array2::from_shape_fn((4, 33), |(c, t)| ((c * 31 + t * 17) % 9) as f32);
    let w = window_segment(x.view(), x.view(), &non_overlapping(1));
    let back = w.samples.index_axis(ndarray::Axis(1), 0).t().to_owned();
    assert_eq!(back.column(0), x.column(0));
    assert_eq!(back.slice(s![.., 1..]), x.slice(s![.., ..32]));
    assert_eq!(w.labels, x);
}

#[test]
fn non_overlapping_bins_tile_the_segment() {
    // Bins after the first cover [4c − 4, 4c): columns 0..20 exactly once.
    // Bin 0 adds column 0 a second time.
    let x = Array2::from_shape_fn((1, 24), |(_, t)| t as f32 + 1.0);
    let p = non_overlapping(4);
    let w = window_segment(x.view(), x.view(), &p);
    let total: f32 = w.samples.iter().sum();
    let expected: f32 = 1.0 + (1..=20).map(|v| v as f32).sum::<f32>();
    approx::assert_abs_diff_eq!(total, expected, epsilon = 1e-3);
}

#[test]
fn snn_sub_bins_are_binary() {
    let x = Array2::from_shape_fn((5, 120), |(c, t)| ((c + t) % 4) as f32);
    let p = WindowParams { advance: 3, bin_width: 12, num_steps: Some(4), collapse: Collapse::AnySpike };
    let w = window_segment(x.view(), x.view(), &p);
    assert_eq!(w.samples.dim(), (40, 4, 5));
    assert!(w.samples.iter().all(|&v| v == 0.0 || v == 1.0));
}

#[test]
fn ann_sub_bins_preserve_counts_in_full_bins() {
    let x = Array2::from_shape_fn((2, 60), |(c, t)| ((c + t) % 3) as f32);
    let full = WindowParams { advance: 2, bin_width: 10, num_steps: None, collapse: Collapse::Sum };
    let reduced = WindowParams { num_steps: Some(5), ..full };
    let a = window_segment(x.view(), x.view(), &full);
    let b = window_segment(x.view(), x.view(), &reduced);
    for bin in 0..a.n_bins() {
        let sa: f32 = a.samples.index_axis(ndarray::Axis(0), bin).sum();
        let sb: f32 = b.samples.index_axis(ndarray::Axis(0), bin).sum();
        approx::assert_abs_diff_eq!(sa, sb, epsilon = 1e-4);
    }
}
