mod entity;
pub use entity::Entity;

mod category;
pub use category::{CategoryTable, DEFAULT_CATEGORY, known_category};

mod series;
pub use series::{Observation, ObservationSeries};
