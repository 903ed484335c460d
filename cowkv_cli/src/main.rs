use std::{env, io, process};

use cowkv::Kv;
use cowkv_cli::{Args, Result, Shell, USAGE};
use log::error;

fn main() {
  log_init::init();
  if let Err(e) = run() {
    error!("{e}");
    eprintln!("Error: {e}");
    process::exit(1);
  }
}

fn run() -> Result<()> {
  let path = match Args::parse(env::args().skip(1))? {
    Args::Help => {
      print!("{USAGE}");
      return Ok(());
    }
    Args::Version => {
      println!("cowkv {}", env!("CARGO_PKG_VERSION"));
      return Ok(());
    }
    Args::Open(path) => path,
  };

  let mut kv = Kv::open(&path, &[])?;
  println!("cowkv {} on {}", env!("CARGO_PKG_VERSION"), path.display());

  let stdin = io::stdin();
  let mut shell = Shell::new(stdin.lock(), io::stdout().lock());
  let r = shell.run(&mut kv);
  kv.close();
  r
}
