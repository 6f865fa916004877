mod config;
mod dispatcher;
mod error;
mod framing;
mod registry;
mod shared;
mod watchdog;
mod worker;

pub use config::{BootEnv, WorkerConfig, ENV_DAEMON, ENV_DYNAMIC_WORKER, ENV_SOCKET};
pub use dispatcher::dispatch;
pub use error::WorkerError;
pub use framing::{
    encode_payload_header, encode_request_frame, FrameReader, LENGTH_PREFIX, PAYLOAD_HEADER_LEN,
};
pub use registry::{on_path, Endpoint, HandlerFn, Hook, Registry, RoutePredicate};
pub use shared::WorkerShared;
pub use worker::{ExitReason, Worker};
