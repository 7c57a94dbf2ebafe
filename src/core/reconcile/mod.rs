pub mod engine;

pub use engine::Reconciler;
