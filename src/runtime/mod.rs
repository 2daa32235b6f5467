/// Runtime event model.
pub mod events;
/// Runtime handle and single-writer session loop.
pub mod handle;
