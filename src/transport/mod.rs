/// Filesystem discovery of trip files.
pub mod fs;
/// CSV load and persistence of tabular data.
pub mod tabular;
