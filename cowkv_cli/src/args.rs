//! Command line arguments / 命令行参数

use std::path::PathBuf;

use crate::{Error, Result};

pub const DEFAULT_PATH: &str = "./cowkv.db";

pub const USAGE: &str = "\
Usage: cowkv [OPTIONS] [PATH]

Arguments:
  [PATH]  database file [default: ./cowkv.db]

Options:
  -h, --help     print help
  -V, --version  print version
";

#[derive(Debug, PartialEq, Eq)]
pub enum Args {
  Help,
  Version,
  Open(PathBuf),
}

impl Args {
  /// Parse arguments after the program name / 解析程序名之后的参数
  pub fn parse<I, S>(args: I) -> Result<Self>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut path = None;
    for arg in args {
      match arg.as_ref() {
        "-h" | "--help" => return Ok(Self::Help),
        "-V" | "--version" => return Ok(Self::Version),
        opt if opt.starts_with('-') => return Err(Error::UnknownArg(opt.into())),
        p => {
          if path.is_some() {
            return Err(Error::ManyPath);
          }
          path = Some(PathBuf::from(p));
        }
      }
    }
    Ok(Self::Open(
      path.unwrap_or_else(|| PathBuf::from(DEFAULT_PATH)),
    ))
  }
}
