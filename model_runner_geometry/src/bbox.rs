//! Image-coordinate bounding boxes and intersection-over-union, used by the feature selection
//! step of the `FeatureRefinery` (spec.md §4.4) to decide which overlapping detections are
//! duplicates.

/// An axis-aligned bounding box in image (pixel) coordinates, `[x0, y0, x1, y1]`, matching
/// `properties.bounds_imcoords` on a raw `Feature` (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageBounds {
	pub x0: f64,
	pub y0: f64,
	pub x1: f64,
	pub y1: f64,
}

impl ImageBounds {
	pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
		Self { x0, y0, x1, y1 }
	}

	pub fn from_slice(bounds: &[f64; 4]) -> Self {
		Self::new(bounds[0], bounds[1], bounds[2], bounds[3])
	}

	pub fn width(&self) -> f64 {
		(self.x1 - self.x0).max(0.0)
	}

	pub fn height(&self) -> f64 {
		(self.y1 - self.y0).max(0.0)
	}

	pub fn area(&self) -> f64 {
		self.width() * self.height()
	}

	/// The four image-space corners in `(x, y)` order: top-left, top-right, bottom-right,
	/// bottom-left, matching the winding order a closed polygon ring is built from.
	pub fn corners(&self) -> [(f64, f64); 4] {
		[(self.x0, self.y0), (self.x1, self.y0), (self.x1, self.y1), (self.x0, self.y1)]
	}

	pub fn intersection(&self, other: &ImageBounds) -> ImageBounds {
		ImageBounds::new(
			self.x0.max(other.x0),
			self.y0.max(other.y0),
			self.x1.min(other.x1),
			self.y1.min(other.y1),
		)
	}
}

/// Intersection-over-union of two image-coordinate bounding boxes, in `[0, 1]`.
pub fn iou(a: &ImageBounds, b: &ImageBounds) -> f64 {
	let intersection_area = a.intersection(b).area();
	if intersection_area <= 0.0 {
		return 0.0;
	}
	let union_area = a.area() + b.area() - intersection_area;
	if union_area <= 0.0 {
		return 0.0;
	}
	intersection_area / union_area
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn identical_boxes_have_iou_one() {
		let a = ImageBounds::new(0.0, 0.0, 10.0, 10.0);
		assert_eq!(iou(&a, &a), 1.0);
	}

	#[test]
	fn disjoint_boxes_have_iou_zero() {
		let a = ImageBounds::new(0.0, 0.0, 10.0, 10.0);
		let b = ImageBounds::new(20.0, 20.0, 30.0, 30.0);
		assert_eq!(iou(&a, &b), 0.0);
	}

	#[test]
	fn half_overlap_quarter_area() {
		// a: 10x10 at (0,0); b: 10x10 at (5,0) -> intersection 5x10=50, union 200-50=150
		let a = ImageBounds::new(0.0, 0.0, 10.0, 10.0);
		let b = ImageBounds::new(5.0, 0.0, 15.0, 10.0);
		assert!((iou(&a, &b) - (50.0 / 150.0)).abs() < 1e-9);
	}

	#[test]
	fn touching_edges_have_iou_zero() {
		let a = ImageBounds::new(0.0, 0.0, 10.0, 10.0);
		let b = ImageBounds::new(10.0, 0.0, 20.0, 10.0);
		assert_eq!(iou(&a, &b), 0.0);
	}
}
