pub mod relay;
pub mod stream;
