pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{cli::CliArgs, AppConfig};
pub use self::core::{
    api::{AppContext, KindleDropApi},
    converter::CalibreConverter,
    network::get_local_address,
    pipeline::IntakePipeline,
    server::{start_server, start_server_on, ServerHandle},
};
pub use utils::error::{DropError, Result};
