//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

//! End-to-end analysis: profile the registry, hand the metadata to an
//! external plan generator, and execute whatever plan comes back.

use serde::Serialize;
use serde_json::Value as Json;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::exec::{Executor, PlanOutcome};
use crate::profile::{profile, Metadata};
use crate::relation::Registry;

/// Source of aggregation plans, typically a text-generation service.
///
/// The generator sees only the metadata and the caller's request; it never
/// touches the relations themselves.
pub trait PlanGenerator {
    fn generate(&self, metadata: &Metadata, request: &str) -> Result<Json>;
}

impl<F> PlanGenerator for F
where
    F: Fn(&Metadata, &str) -> Result<Json>,
{
    fn generate(&self, metadata: &Metadata, request: &str) -> Result<Json> {
        self(metadata, request)
    }
}

/// Everything produced by [`analyze`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub metadata: Metadata,
    pub plan: Json,
    pub outcome: PlanOutcome,
}

/// Profile `tables`, ask `generator` for a plan, and execute it.
///
/// Generator failures are returned as [`Error::Generator`]; execution
/// problems are reported inside [`Analysis::outcome`].
pub fn analyze<G: PlanGenerator + ?Sized>(
    tables: &Registry,
    generator: &G,
    request: &str,
    config: &Config,
) -> Result<Analysis> {
    let metadata = profile(tables, &config.profile);
    let plan = generator
        .generate(&metadata, request)
        .map_err(|e| match e {
            Error::Generator(_) => e,
            other => Error::Generator(other.to_string()),
        })?;
    info!(request, "generated aggregation plan");
    let outcome = Executor::new(tables)
        .with_config(config.exec.clone())
        .execute(&plan);
    Ok(Analysis {
        metadata,
        plan,
        outcome,
    })
}
