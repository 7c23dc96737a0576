use log::info;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::collage_types::{Grid, MAX_GRID_CELLS, MIN_GRID_CELLS};

/// Picks (cols, rows) for `image_count` images.
///
/// Both counts stay within [2, 6] and their product covers up to 36 images.
/// The larger count runs along the canvas's longer side.
pub fn grid_dimensions(image_count: usize, canvas_size: (u32, u32)) -> (usize, usize) {
    let side = ceil_sqrt(image_count).clamp(MIN_GRID_CELLS, MAX_GRID_CELLS);
    let other = image_count.div_ceil(side).clamp(MIN_GRID_CELLS, MAX_GRID_CELLS);

    let (width, height) = canvas_size;
    if height > width {
        (other.min(side), other.max(side))
    } else {
        (other.max(side), other.min(side))
    }
}

/// Lays out a grid for `image_count` images and shuffles its cells.
///
/// Cells are sized so the grid overhangs the canvas by `margin` on every
/// side, letting edge images bleed past the border.
pub fn plan<R: Rng + ?Sized>(
    image_count: usize,
    canvas_size: (u32, u32),
    margin: u32,
    rng: &mut R,
) -> Grid {
    let (cols, rows) = grid_dimensions(image_count, canvas_size);
    info!("Using grid of {}x{} for {} images", cols, rows, image_count);

    let overflow = margin * 2;
    let cell_width = (canvas_size.0 + overflow) / cols as u32;
    let cell_height = (canvas_size.1 + overflow) / rows as u32;

    let mut cells: Vec<(usize, usize)> = (0..rows)
        .flat_map(|row| (0..cols).map(move |col| (row, col)))
        .collect();
    cells.shuffle(rng);

    Grid {
        cols,
        rows,
        cell_width,
        cell_height,
        cells,
    }
}

fn ceil_sqrt(n: usize) -> usize {
    let mut root = (n as f64).sqrt() as usize;
    while root * root < n {
        root += 1;
    }
    while root > 0 && (root - 1) * (root - 1) >= n {
        root -= 1;
    }
    root
}
