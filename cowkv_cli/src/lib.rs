//! Interactive shell for cowkv
//! cowkv 交互式命令行

mod args;
mod cmd;
mod error;
mod shell;

pub use args::{Args, DEFAULT_PATH, USAGE};
pub use cmd::{Cmd, MENU};
pub use error::{Error, Result};
pub use shell::Shell;
