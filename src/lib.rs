pub mod alias;
pub mod config;
pub mod dst;
pub mod io;
pub mod key;
pub mod pipeline;
pub mod userparam;

pub use alias::{AliasError, AliasResolver, AliasTable};
pub use config::{AgentConfig, ConfigError};
pub use key::{make_key, parse_key, split_key, ItemKey, KeyError, KeyErrorKind, ParamKind};
pub use pipeline::{Dispatch, DispatchError, PipelineSnapshot, RequestPipeline};
pub use userparam::{BindingTable, CommandTemplater, SafetyPolicy, UserParamError};
