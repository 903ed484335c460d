//! Interactive shell / 交互式命令行
//!
//! ```text
//! > set
//! key: a
//! value: 1
//! OK set 'a'
//! ```

use std::{
  borrow::Cow,
  io::{BufRead, Write},
};

use cowkv::Kv;
use log::debug;

use crate::{Cmd, MENU, Result};

pub struct Shell<R, W> {
  input: R,
  out: W,
}

fn show(b: &[u8]) -> Cow<'_, str> {
  String::from_utf8_lossy(b)
}

impl<R: BufRead, W: Write> Shell<R, W> {
  pub fn new(input: R, out: W) -> Self {
    Self { input, out }
  }

  pub fn into_inner(self) -> (R, W) {
    (self.input, self.out)
  }

  /// Serve commands until `exit` or end of input
  /// 处理命令直到 exit 或输入结束
  pub fn run(&mut self, kv: &mut Kv) -> Result<()> {
    write!(self.out, "{MENU}")?;
    while let Some(line) = self.read("> ")? {
      if line.trim().is_empty() {
        continue;
      }
      match line.parse::<Cmd>() {
        Ok(Cmd::Exit) => break,
        Ok(cmd) => {
          if !self.exec(kv, cmd)? {
            break;
          }
        }
        Err(e) => {
          writeln!(self.out, "FAILED {e}")?;
          write!(self.out, "{MENU}")?;
        }
      }
    }
    writeln!(self.out, "bye")?;
    Ok(())
  }

  /// Run one command, `false` once input ends
  /// 执行单条命令，输入结束返回 false
  fn exec(&mut self, kv: &mut Kv, cmd: Cmd) -> Result<bool> {
    let Some(key) = self.read("key: ")? else {
      return Ok(false);
    };
    let key = key.trim().as_bytes().to_vec();
    debug!("{cmd:?} {}", show(&key));

    match cmd {
      Cmd::Set => {
        let Some(val) = self.read("value: ")? else {
          return Ok(false);
        };
        match kv.set(&key, val.as_bytes()) {
          Ok(()) => writeln!(self.out, "OK set '{}'", show(&key))?,
          Err(e) => writeln!(self.out, "FAILED {e}")?,
        }
      }
      Cmd::Get => match kv.get(&key) {
        Some(val) => writeln!(self.out, "OK '{}' = '{}'", show(&key), show(val))?,
        None => writeln!(self.out, "FAILED '{}' not found", show(&key))?,
      },
      Cmd::Del => match kv.del(&key) {
        Ok(true) => writeln!(self.out, "OK deleted '{}'", show(&key))?,
        Ok(false) => writeln!(self.out, "FAILED '{}' not found", show(&key))?,
        Err(e) => writeln!(self.out, "FAILED {e}")?,
      },
      Cmd::Exit => return Ok(false),
    }
    Ok(true)
  }

  /// Prompt and read one line without its line ending, `None` at end of input
  /// 提示并读取一行，输入结束返回 None
  fn read(&mut self, prompt: &str) -> Result<Option<String>> {
    write!(self.out, "{prompt}")?;
    self.out.flush()?;
    let mut line = String::new();
    if self.input.read_line(&mut line)? == 0 {
      return Ok(None);
    }
    let len = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(len);
    Ok(Some(line))
  }
}
