/*
 * Licensed to the Apache Software Foundation (ASF) under one or more
 * contributor license agreements.  See the NOTICE file distributed with
 * this work for additional information regarding copyright ownership.
 * The ASF licenses this file to You under the Apache License, Version 2.0
 * (the "License"); you may not use this file except in compliance with
 * the License.  You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::sync::atomic::{AtomicBool, Ordering};

pub use tracing::{self, Level};

// flag for the sake of avoiding multiple initialization
static TRACING_CONFIGURED: AtomicBool = AtomicBool::new(false);

mod level;
mod tracing_configurer;

pub use level::parse_level;

/// Environment variable holding an `EnvFilter` directive, e.g. `kestrel=debug`.
pub const KESTREL_LOG: &str = "KESTREL_LOG";

// put on main method
pub fn init() {
    init_with_level("info")
}

/// Installs the global subscriber with the given max level unless
/// `KESTREL_LOG` overrides it. Only the first call has an effect.
pub fn init_with_level(level: &str) {
    if TRACING_CONFIGURED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
    {
        tracing_configurer::default(parse_level(level))
    }
}

pub fn is_configured() -> bool {
    TRACING_CONFIGURED.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use tracing::{debug, info, trace};

    #[test]
    fn test_print_info_log() {
        super::init();
        debug!("hello rust:debug");
        trace!("hello rust:trace");
        info!("hello rust:info");
        assert!(super::is_configured());
    }

    #[test]
    fn test_init_twice_is_noop() {
        super::init_with_level("debug");
        super::init_with_level("trace");
        assert!(super::is_configured());
    }
}
