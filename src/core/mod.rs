pub mod dispatch;
pub mod wire;
