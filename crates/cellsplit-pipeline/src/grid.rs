//! Row-major index helpers shared by the flooding and boundary stages.

/// Indices of the 4-connected neighbours of `index` in a
/// `width` x `height` row-major grid.
///
/// Neighbours outside the grid are skipped, so border pixels yield
/// two or three indices.
pub(crate) fn neighbors4(index: usize, width: usize, height: usize) -> impl Iterator<Item = usize> {
    let x = index % width;
    let y = index / width;
    let up = (y > 0).then(|| index - width);
    let down = (y + 1 < height).then(|| index + width);
    let left = (x > 0).then(|| index - 1);
    let right = (x + 1 < width).then(|| index + 1);
    [up, left, right, down].into_iter().flatten()
}

/// Grid extent as `usize` for index arithmetic.
pub(crate) fn extent(width: u32, height: u32) -> (usize, usize) {
    (width as usize, height as usize)
}
