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

// dmem.rs
//
// This file contains the data memory: a byte-addressable, little-endian,
// on-demand byte map with a single outstanding transaction. Whether an
// access takes the cache or the memory latency is decided by a seeded
// pseudo-random draw, so a run is reproducible from its seed.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::backend::config::DmemConfig;
use crate::errors::SimulatorError;

/// What the LSU asks the memory to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemOp {
    Read,
    Write(u32),
}

#[derive(Debug, Clone)]
pub struct MemRequest {
    pub rob_idx: usize,
    pub addr: u32,
    pub size: usize,
    pub op: MemOp,
}

/// Completion notification. `value` carries the raw (zero-extended) bytes
/// for reads and is None for writes.
#[derive(Debug, Clone)]
pub struct MemResponse {
    pub rob_idx: usize,
    pub value: Option<u32>,
}

struct Transaction {
    req: MemRequest,
    counter: usize,
    result: Option<u32>,
    performed: bool,
}

pub struct DataMemory {
    mem: HashMap<u32, u8>,
    cache_latency: usize,
    mem_latency: usize,
    cache_hit_rate: f64,
    rng: StdRng,
    txn: Option<Transaction>,
    pub hits: u64,
    pub misses: u64,
}

impl DataMemory {
    pub fn new(config: &DmemConfig) -> Self {
        Self {
            mem: HashMap::new(),
            cache_latency: config.cache_latency,
            mem_latency: config.mem_latency,
            cache_hit_rate: config.cache_hit_rate,
            rng: StdRng::seed_from_u64(config.seed),
            txn: None,
            hits: 0,
            misses: 0,
        }
    }

    /// Load a Verilog $readmemh-style image: `@<hex>` lines move the load
    /// pointer, other lines carry space-separated byte values. Bytes are
    /// grouped into 4-byte words and byte-reversed into little-endian
    /// storage (the file carries words most-significant byte first).
    pub fn load_image<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SimulatorError> {
        let file = File::open(&path)?;
        let reader = BufReader::new(file);

        let mut addr: u32 = 0;
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(hex) = line.strip_prefix('@') {
                addr = u32::from_str_radix(hex.trim(), 16).map_err(|_| {
                    SimulatorError::MalformedInput(format!("bad address line '{}'", line))
                })?;
                continue;
            }

            let bytes = line
                .split_whitespace()
                .map(|tok| {
                    u8::from_str_radix(tok, 16).map_err(|_| {
                        SimulatorError::MalformedInput(format!("bad byte value '{}'", tok))
                    })
                })
                .collect::<Result<Vec<u8>, SimulatorError>>()?;

            for word in bytes.chunks(4) {
                for &byte in word.iter().rev() {
                    self.mem.insert(addr, byte);
                    addr += 1;
                }
            }
        }

        info!(
            "Loaded {} bytes of memory image from {}",
            self.mem.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    pub fn read(&self, addr: u32, size: usize) -> u32 {
        let mut value: u32 = 0;
        for i in 0..size {
            let byte = *self.mem.get(&addr.wrapping_add(i as u32)).unwrap_or(&0);
            value |= (byte as u32) << (8 * i);
        }
        value
    }

    pub fn write(&mut self, addr: u32, value: u32, size: usize) {
        for i in 0..size {
            let byte = ((value >> (8 * i)) & 0xFF) as u8;
            self.mem.insert(addr.wrapping_add(i as u32), byte);
        }
    }

    pub fn can_start(&self) -> bool {
        self.txn.is_none()
    }

    /// Begin a transaction. The latency is the cache latency on a hit and
    /// the memory latency on a miss, decided by the seeded draw.
    pub fn start(&mut self, req: MemRequest) {
        debug_assert!(self.txn.is_none(), "memory already has a transaction");

        let hit = self.rng.gen::<f64>() < self.cache_hit_rate;
        let counter = if hit {
            self.hits += 1;
            self.cache_latency
        } else {
            self.misses += 1;
            self.mem_latency
        };

        debug!(
            "DMEM start: rob_idx={} addr=0x{:08x} {:?} ({} cycles)",
            req.rob_idx, req.addr, req.op, counter
        );

        self.txn = Some(Transaction {
            req,
            counter,
            result: None,
            performed: false,
        });
    }

    /// Advance the transaction counter; the access is performed the cycle
    /// the counter reaches zero and the completion is held until collected.
    pub fn step(&mut self) {
        let Some(txn) = self.txn.as_mut() else {
            return;
        };
        if txn.performed {
            return;
        }

        txn.counter = txn.counter.saturating_sub(1);
        if txn.counter == 0 {
            match txn.req.op {
                MemOp::Read => {
                    let value = {
                        let mut v: u32 = 0;
                        for i in 0..txn.req.size {
                            let byte = *self
                                .mem
                                .get(&txn.req.addr.wrapping_add(i as u32))
                                .unwrap_or(&0);
                            v |= (byte as u32) << (8 * i);
                        }
                        v
                    };
                    txn.result = Some(value);
                },
                MemOp::Write(value) => {
                    for i in 0..txn.req.size {
                        let byte = ((value >> (8 * i)) & 0xFF) as u8;
                        self.mem.insert(txn.req.addr.wrapping_add(i as u32), byte);
                    }
                },
            }
            txn.performed = true;
        }
    }

    pub fn has_ready(&self) -> bool {
        self.txn.as_ref().map_or(false, |txn| txn.performed)
    }

    pub fn take_ready(&mut self) -> Option<MemResponse> {
        if !self.has_ready() {
            return None;
        }
        self.txn.take().map(|txn| MemResponse {
            rob_idx: txn.req.rob_idx,
            value: txn.result,
        })
    }
}

impl fmt::Display for DataMemory {
    /// One `<hex-addr>: <byte-value>` line per populated byte, ascending.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut addrs: Vec<&u32> = self.mem.keys().collect();
        addrs.sort();
        for addr in addrs {
            writeln!(f, "0x{:08x}: {}", addr, self.mem[addr])?;
        }
        Ok(())
    }
}
