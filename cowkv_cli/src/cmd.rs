//! Shell commands / 交互命令

use std::str::FromStr;

use crate::Error;

pub const MENU: &str = "\
Commands (case-insensitive):
  set   store a key-value pair
  get   read the value of a key
  del   remove a key
  exit  close the database
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmd {
  Set,
  Get,
  Del,
  Exit,
}

impl FromStr for Cmd {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    Ok(match s.to_ascii_lowercase().as_str() {
      "set" => Self::Set,
      "get" => Self::Get,
      "del" => Self::Del,
      "exit" => Self::Exit,
      _ => return Err(Error::UnknownCmd(s.into())),
    })
  }
}
