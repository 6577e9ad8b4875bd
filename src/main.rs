// This file is part of the terraform-provider-ibm project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;

mod classic;
mod client;
mod config;
mod dns;
mod flex;
mod iam;
mod provider;
mod resource_group;
mod resource_instance;
mod session;
mod tagging;
#[cfg(test)]
mod test_utils;
mod transit_gateway;
mod utils;
mod vpc;
mod wait;

use provider::IbmProvider;

/// Level requested through `TF_LOG_PROVIDER`, then `TF_LOG`
fn log_level<F>(lookup: F) -> LevelFilter
where
    F: Fn(&str) -> Option<String>,
{
    let level = lookup("TF_LOG_PROVIDER")
        .filter(|level| !level.is_empty())
        .or_else(|| lookup("TF_LOG"))
        .unwrap_or_default();
    match level.to_ascii_lowercase().as_str() {
        "trace" | "json" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "error" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => LevelFilter::WARN,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level(|key| std::env::var(key).ok()).into())
        .from_env_lossy()
        .add_directive("hyper=warn".parse()?)
        .add_directive("rustls=warn".parse()?);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .compact(),
        )
        .with(env_filter)
        .init();

    tf_provider::serve("ibm", IbmProvider::default()).await?;
    Ok(())
}
