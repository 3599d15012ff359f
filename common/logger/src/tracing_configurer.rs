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

use tracing_subscriber::EnvFilter;

use crate::{Level, KESTREL_LOG};

pub(crate) fn default(level: Level) {
    let builder = tracing_subscriber::fmt()
        .compact()
        .with_thread_names(false)
        .with_line_number(true);

    // another subscriber may already be installed by the host application
    let _ = match std::env::var(KESTREL_LOG) {
        Ok(directive) => builder
            .with_env_filter(EnvFilter::new(directive))
            .try_init(),
        Err(_) => builder.with_max_level(level).try_init(),
    };
}
