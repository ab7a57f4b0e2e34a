use depthctl::frame::{DepthFrame, Intrinsics};

pub const W: usize = 640;
pub const H: usize = 480;

/// Frame where every pixel reads `mm` (0 = no reading).
pub fn flat_frame(w: usize, h: usize, mm: u16) -> DepthFrame {
    assert!(w > 0 && h > 0, "frame dimensions must be positive");
    DepthFrame::from_depth(w, h, vec![mm; w * h], Intrinsics::nominal_640x480())
        .expect("buffer matches dimensions")
}

/// Paint a `size × size` square at depth `mm` with its top-left at `(x0, y0)`.
pub fn paint_square(frame: &mut DepthFrame, x0: usize, y0: usize, size: usize, mm: u16) {
    for y in y0..(y0 + size).min(frame.height()) {
        for x in x0..(x0 + size).min(frame.width()) {
            frame.set_distance(x, y, mm);
        }
    }
}

/// Background at `background_mm` with one square of `size` centred on the frame.
pub fn centred_square(size: usize, square_mm: u16, background_mm: u16) -> DepthFrame {
    let mut frame = flat_frame(W, H, background_mm);
    paint_square(&mut frame, (W - size) / 2, (H - size) / 2, size, square_mm);
    frame
}
