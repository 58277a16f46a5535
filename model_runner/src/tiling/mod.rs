//! Produces the ordered set of tile crops covering an image region given a crop size and overlap.

use crate::errors::InvalidConfigError;

/// A rectangular pixel crop: `origin = (row, col)`, `size = (width, height)`. `size` is
/// transposed relative to `origin` — this matches the convention `region_bounds`, `crop_size`,
/// and `overlap` all use below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop {
	pub origin: (u32, u32),
	pub size: (u32, u32),
}

impl Crop {
	pub fn new(origin: (u32, u32), size: (u32, u32)) -> Self {
		Self { origin, size }
	}
}

/// Bounds of a region to be tiled: `origin = (row, col)`, `extent = (width, height)`.
pub type RegionBounds = ((u32, u32), (u32, u32));

/// Generates the row-major sequence of crops covering `region_bounds` with the given `crop_size`
/// and `overlap`, both `(width, height)`.
///
/// Stride is `crop_size - overlap` componentwise. The final crop on each axis is clipped to the
/// region extent rather than re-anchored, so crops never extend past the region.
pub fn generate_crops(
	region_bounds: RegionBounds,
	crop_size: (u32, u32),
	overlap: (u32, u32),
) -> Result<Vec<Crop>, InvalidConfigError> {
	if overlap.0 >= crop_size.0 || overlap.1 >= crop_size.1 {
		return Err(InvalidConfigError { crop_size, overlap });
	}

	let ((origin_row, origin_col), (width, height)) = region_bounds;
	let stride = (crop_size.0 - overlap.0, crop_size.1 - overlap.1);

	let row_offsets = axis_offsets(height, stride.1);
	let col_offsets = axis_offsets(width, stride.0);

	let mut crops = Vec::with_capacity(row_offsets.len() * col_offsets.len());
	for &row_offset in &row_offsets {
		let crop_height = crop_size.1.min(height - row_offset);
		for &col_offset in &col_offsets {
			let crop_width = crop_size.0.min(width - col_offset);
			crops.push(Crop::new((origin_row + row_offset, origin_col + col_offset), (crop_width, crop_height)));
		}
	}
	Ok(crops)
}

/// Offsets `0, stride, 2*stride, ...` while strictly less than `extent`; always at least one
/// offset (`0`) even when `extent <= stride`.
fn axis_offsets(extent: u32, stride: u32) -> Vec<u32> {
	let mut offsets = vec![0];
	let mut next = stride;
	while next < extent {
		offsets.push(next);
		next += stride;
	}
	offsets
}
