mod announced;
mod broadcast;
mod group;
mod track;

pub use announced::*;
pub use broadcast::*;
pub use group::*;
pub use track::*;
