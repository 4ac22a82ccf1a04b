/// Boxed error returned by port implementations that may run on any thread.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
