// Copyright (c) 2024 Mudit Bhargava
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.
//

// main.rs
//
// This file contains the main entry point for the out-of-order RISC-V
// backend simulator. It parses the command line, builds the scheduler, runs
// the simulation loop, and prints the end-of-run summary.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use rvooo_rust::backend::config::{BackendConfig, DmemConfig};
use rvooo_rust::backend::scheduler::{Scheduler, SimOptions, StepOutcome};

#[derive(Parser)]
#[command(name = "rvooo_rust")]
#[command(about = "A cycle-accurate Tomasulo out-of-order RISC-V backend simulator")]
#[command(version)]
struct Cli {
    /// Instruction trace file (pre-disassembled)
    #[arg(long = "test_name")]
    test_name: PathBuf,

    /// Memory image file ($readmemh style)
    #[arg(long = "mem_name")]
    mem_name: PathBuf,

    /// Append DMEM contents to memory.log each cycle
    #[arg(long = "mem_dump")]
    mem_dump: bool,

    /// Append commit history to commit.log at simulation end
    #[arg(long = "commit_history_dump")]
    commit_history_dump: bool,

    /// Append a ROB snapshot to rob.log each cycle
    #[arg(long = "rob_dump")]
    rob_dump: bool,

    /// Maximum cycles
    #[arg(long = "max_cycles", default_value = "100000")]
    max_cycles: u64,

    /// Seed for the DMEM hit/miss draw
    #[arg(long = "dmem_seed", default_value = "0")]
    dmem_seed: u64,

    /// DMEM cache hit rate in [0, 1]
    #[arg(long = "dmem_hit_rate", default_value = "0.9")]
    dmem_hit_rate: f64,

    /// Write end-of-run statistics as JSON to this file
    #[arg(long = "stats_json")]
    stats_json: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = BackendConfig::default().with_dmem(
        DmemConfig::default()
            .with_seed(cli.dmem_seed)
            .with_hit_rate(cli.dmem_hit_rate),
    );

    let mut opts = SimOptions::new(cli.test_name, cli.mem_name);
    opts.mem_dump = cli.mem_dump;
    opts.commit_history_dump = cli.commit_history_dump;
    opts.rob_dump = cli.rob_dump;
    opts.max_cycles = cli.max_cycles;
    opts.config = config;

    let mut scheduler = match Scheduler::new(opts) {
        Ok(scheduler) => scheduler,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            return ExitCode::FAILURE;
        },
    };

    match scheduler.run() {
        Ok(outcome) => {
            if outcome == StepOutcome::Drained {
                println!(
                    "{} in {} cycles",
                    "Simulation drained".green().bold(),
                    scheduler.cycle()
                );
            } else {
                println!(
                    "{} after {} cycles",
                    "Simulation stopped".yellow().bold(),
                    scheduler.cycle()
                );
            }
            print!("{}", scheduler.stats());

            if let Some(path) = cli.stats_json {
                let json = scheduler.stats().to_json();
                if let Err(err) = fs::write(&path, format!("{:#}", json)) {
                    eprintln!("{} cannot write {}: {}", "error:".red().bold(), path.display(), err);
                    return ExitCode::FAILURE;
                }
            }

            ExitCode::SUCCESS
        },
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::FAILURE
        },
    }
}
