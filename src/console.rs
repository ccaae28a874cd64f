//! Interactive command console.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::controller::MatrixController;

const TUTORIAL: &str = "\
Quick tutorial:
  - 12           = tie input 1 to output 2
  - 345          = tie input 3 to outputs 4 and 5
  - 12,345       = do both above commands at once
  - *7*12,345    = store these commands as macro '7'
  - 7            = recall macro '7'
  - //           = show help about connect command
  - //2,10.0.1.2 = connect to Extron switch at IP 10.0.1.2 (default port)
Hints:
  - dots ('.') and commas (',') can be used interchangeably, even in IP addrs.
  - config file is saved after every \"store macro\" and \"connect\" command";

/// Read commands from stdin until end of input or Ctrl+C.
pub async fn run(controller: &mut MatrixController) -> anyhow::Result<()> {
    println!("----- entering interactive command mode -----");
    println!("{}", TUTORIAL);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                None
            }
        };
        match line {
            Some(line) => controller.handle_command(&line).await,
            None => break,
        }
    }

    println!("----- leaving interactive command mode -----");
    Ok(())
}
