//! Small shared types used across the pipeline: classification banners, feature selection
//! configuration, and the observable-event publisher used by status monitors.

pub mod classification;
pub mod feature_selection;
pub mod observable_event;

pub use classification::{Classification, ClassificationLevel};
pub use feature_selection::{FeatureSelectionAlgorithm, FeatureSelectionOptions};
pub use observable_event::{ObservableEvent, SubscriptionId};
