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

// config.rs
//
// This file contains the configuration structs for the backend. It defines
// per-unit reservation-station sizes and latencies, the ROB and commit-queue
// geometry, and the data-memory timing model.

use crate::backend::pick::PickPolicy;

/// Per-unit shape: reservation-station entries, latency, and whether the
/// pipeline is iterative (one in flight) or fully pipelined.
#[derive(Debug, Clone)]
pub struct UnitConfig {
    pub n_entries: usize,
    pub latency: usize,
    pub iterative: bool,
}

impl UnitConfig {
    pub fn new(n_entries: usize, latency: usize, iterative: bool) -> Self {
        assert!(n_entries > 0, "unit needs at least one RS entry");
        assert!(latency > 0, "unit latency must be positive");
        Self {
            n_entries,
            latency,
            iterative,
        }
    }
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self::new(8, 1, true)
    }
}

/// Data-memory timing: single outstanding transaction with a seeded
/// stochastic hit/miss latency draw.
#[derive(Debug, Clone)]
pub struct DmemConfig {
    pub cache_latency: usize,
    pub mem_latency: usize,
    pub cache_hit_rate: f64,
    pub seed: u64,
}

impl Default for DmemConfig {
    fn default() -> Self {
        Self {
            cache_latency: 1,
            mem_latency: 2,
            cache_hit_rate: 0.9,
            seed: 0,
        }
    }
}

impl DmemConfig {
    pub fn with_latencies(mut self, cache_latency: usize, mem_latency: usize) -> Self {
        assert!(cache_latency > 0, "cache latency must be positive");
        assert!(mem_latency > 0, "memory latency must be positive");
        self.cache_latency = cache_latency;
        self.mem_latency = mem_latency;
        self
    }

    pub fn with_hit_rate(mut self, rate: f64) -> Self {
        assert!((0.0..=1.0).contains(&rate), "hit rate must be in [0, 1]");
        self.cache_hit_rate = rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Configuration of the whole out-of-order backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub rob_size: usize,
    pub commit_queue_depth: usize,
    /// Dispatch-buffer size and per-cycle issue budget.
    pub issue_width: usize,
    pub arith_unit: UnitConfig,
    pub branch_unit: UnitConfig,
    pub load_unit: UnitConfig,
    pub store_unit: UnitConfig,
    pub pick_policy: PickPolicy,
    pub store_to_load_forwarding: bool,
    pub dmem: DmemConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            rob_size: 16,
            commit_queue_depth: 3,
            issue_width: 1,
            arith_unit: UnitConfig::default(),
            branch_unit: UnitConfig::default(),
            load_unit: UnitConfig::default(),
            store_unit: UnitConfig::default(),
            pick_policy: PickPolicy::OldestReady,
            store_to_load_forwarding: false,
            dmem: DmemConfig::default(),
        }
    }
}

impl BackendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rob_size(mut self, size: usize) -> Self {
        assert!(size > 0, "ROB size must be positive");
        self.rob_size = size;
        self
    }

    pub fn with_commit_queue_depth(mut self, depth: usize) -> Self {
        assert!(depth > 0, "commit queue depth must be positive");
        self.commit_queue_depth = depth;
        self
    }

    pub fn with_issue_width(mut self, width: usize) -> Self {
        assert!(width > 0, "issue width must be positive");
        self.issue_width = width;
        self
    }

    pub fn with_arith_unit(mut self, unit: UnitConfig) -> Self {
        self.arith_unit = unit;
        self
    }

    pub fn with_branch_unit(mut self, unit: UnitConfig) -> Self {
        self.branch_unit = unit;
        self
    }

    pub fn with_load_unit(mut self, unit: UnitConfig) -> Self {
        self.load_unit = unit;
        self
    }

    pub fn with_store_unit(mut self, unit: UnitConfig) -> Self {
        self.store_unit = unit;
        self
    }

    pub fn with_pick_policy(mut self, policy: PickPolicy) -> Self {
        self.pick_policy = policy;
        self
    }

    pub fn with_store_to_load_forwarding(mut self, enabled: bool) -> Self {
        self.store_to_load_forwarding = enabled;
        self
    }

    pub fn with_dmem(mut self, dmem: DmemConfig) -> Self {
        self.dmem = dmem;
        self
    }
}
