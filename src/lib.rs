pub mod auth;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod format;
pub mod frame;
pub mod protocol;
pub mod row;
pub mod session;
pub mod value;

#[cfg(test)]
mod testing;

pub use auth::{AccessToken, Credentials, OAuthClient, TokenSource};
pub use cli::{PromptError, prompt};
pub use command::{Command, CommandError};
pub use config::Config;
pub use error::{Error, Result};
pub use format::{OutputFormat, OutputFormatter};
pub use frame::{Frame, ResultPages};
pub use protocol::proto::ConnectionInfo;
pub use row::Record;
pub use session::{PreparedStatement, Query, QueryOutput, ResultSet, Session};
pub use value::Value;
