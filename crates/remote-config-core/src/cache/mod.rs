//! Cache access for the read path

mod scoped;

pub use scoped::ScopedCache;
