// Core modules implementing the bounded transfer, output encoding, and error modeling.
pub mod error;
pub mod project;
pub mod reduce;
pub mod sink;
