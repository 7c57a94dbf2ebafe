pub mod resolver;

pub use resolver::{Resolve, Resolver};
