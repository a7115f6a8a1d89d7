pub mod encode_error;
pub mod encode_logger;
pub mod frame_sink;
pub mod rate_control;
