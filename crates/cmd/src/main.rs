// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Args, Parser, Subcommand};
use durq_common_telemetry::{LogFormat, LoggingOptions, init_global_logging};
use durq_storage_queue::{Queue, QueueConfig, QueueError};
use snafu::{ResultExt, Whatever, ensure_whatever};
use tracing_subscriber::filter::Targets;

mod build_info;

#[derive(Debug, Parser)]
#[clap(
name = "durq",
about = "Inspect and edit durable FIFO queue files",
author = build_info::AUTHOR,
version = build_info::FULL_VERSION)]
struct Cli {
    /// Milliseconds to wait for another process to release the queue file
    #[arg(long, global = true, default_value_t = 1000)]
    lock_timeout: u64,

    /// Log filter, e.g. "debug" or "durq_storage_queue=trace"
    #[arg(long, global = true, default_value = "warn", value_parser = parse_log_filter)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    commands: Commands,
}

/// Accept only filters that `init_global_logging` can install.
fn parse_log_filter(value: &str) -> Result<String, String> {
    value
        .parse::<Targets>()
        .map(|_| value.to_string())
        .map_err(|e| format!("invalid log filter: {e}"))
}

#[derive(Debug, Subcommand)]
enum Commands {
    Push(PushArgs),
    Pop(PopArgs),
    Peek(PeekArgs),
    Len(LenArgs),
}

impl Cli {
    fn logging_options(&self) -> LoggingOptions {
        // stdout carries popped values; logs go to stderr.
        LoggingOptions {
            level: Some(self.log_level.clone()),
            append_stdout: false,
            append_stderr: true,
            log_format: if self.log_json {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            ..Default::default()
        }
    }

    fn open(&self, file: &Path, must_exist: bool) -> Result<Queue, Whatever> {
        ensure_whatever!(
            !must_exist || file.exists(),
            "Queue file {} does not exist",
            file.display()
        );
        QueueConfig::builder()
            .path(file)
            .lock_timeout(Duration::from_millis(self.lock_timeout))
            .build()
            .open()
            .with_whatever_context(|_| format!("Failed to open queue {}", file.display()))
    }

    fn run(&self, out: &mut impl Write) -> Result<(), Whatever> {
        match &self.commands {
            Commands::Push(args) => args.run(&self.open(&args.file, false)?, out),
            Commands::Pop(args) => args.run(&self.open(&args.file, true)?, out),
            Commands::Peek(args) => args.run(&self.open(&args.file, true)?, out),
            Commands::Len(args) => args.run(&self.open(&args.file, true)?, out),
        }
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Push one or more values, in order, to the tail of the queue.
The file is created if it does not exist.
Examples:

durq push jobs.redb first second third

")]
struct PushArgs {
    /// Queue file
    file:   PathBuf,
    /// Values to push, stored as UTF-8 bytes
    #[arg(required = true)]
    values: Vec<String>,
}

impl PushArgs {
    fn run(&self, queue: &Queue, out: &mut impl Write) -> Result<(), Whatever> {
        for value in &self.values {
            let seq = queue
                .push_str(value)
                .whatever_context("Failed to push value")?;
            writeln!(out, "{seq}").whatever_context("Failed to write output")?;
        }
        queue.close().whatever_context("Failed to close queue")
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Pop values from the head of the queue and print them, one per line.
Stops early without error when the queue runs empty.
Examples:

durq pop jobs.redb
durq pop jobs.redb -n 10

")]
struct PopArgs {
    /// Queue file
    file:  PathBuf,
    /// Maximum number of values to pop
    #[arg(short = 'n', long, default_value_t = 1)]
    count: u64,
}

impl PopArgs {
    fn run(&self, queue: &Queue, out: &mut impl Write) -> Result<(), Whatever> {
        for _ in 0..self.count {
            let value = match queue.pop() {
                Ok(value) => value,
                Err(QueueError::EmptyQueue) => break,
                Err(e) => return Err(e).whatever_context("Failed to pop value"),
            };
            out.write_all(&value)
                .and_then(|()| writeln!(out))
                .whatever_context("Failed to write output")?;
        }
        queue.close().whatever_context("Failed to close queue")
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Print the value at the head of the queue without removing it.
Examples:

durq peek jobs.redb

")]
struct PeekArgs {
    /// Queue file
    file: PathBuf,
}

impl PeekArgs {
    fn run(&self, queue: &Queue, out: &mut impl Write) -> Result<(), Whatever> {
        let value = queue.peek().whatever_context("Failed to peek value")?;
        out.write_all(&value)
            .and_then(|()| writeln!(out))
            .whatever_context("Failed to write output")?;
        queue.close().whatever_context("Failed to close queue")
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Print the number of queued values and the head/tail cursors.
Examples:

durq len jobs.redb

")]
struct LenArgs {
    /// Queue file
    file: PathBuf,
}

impl LenArgs {
    fn run(&self, queue: &Queue, out: &mut impl Write) -> Result<(), Whatever> {
        let cursor = queue.cursor();
        writeln!(
            out,
            "{} (head {}, tail {})",
            cursor.len(),
            cursor.head,
            cursor.tail
        )
        .whatever_context("Failed to write output")?;
        queue.close().whatever_context("Failed to close queue")
    }
}

fn main() -> Result<(), Whatever> {
    let cli = Cli::parse();
    let _guards = init_global_logging("durq", &cli.logging_options());
    tracing::debug!(?cli, "Starting");

    cli.run(&mut io::stdout().lock())
}
