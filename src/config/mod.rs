pub mod dispatch;
pub mod environment;

pub use dispatch::DispatchConfig;
pub use environment::EnvironmentConfig;
