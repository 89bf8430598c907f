//! # iam-check
//!
//! Offline permission check against a JSON fixture.
//!
//! ```text
//! iam-check fixture.json
//! ```
//!
//! The fixture holds `{ "user": User, "request": PermissionCheckRequest }`.
//! Prints the check response and the user's effective permission ids.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `IAM_SCOPE_MODE` - `exact` (default) or `type_fallback`
//! - `IAM_UNRESOLVED_CONDITIONS` - `fail_closed` (default) or `fail_open`
//! - `RUST_LOG` - Log level (default: info)

use anyhow::{bail, Context};
use iam_authz::{EngineConfig, IamEngine, PermissionCheckRequest, PermissionCheckResponse, User};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Deserialize)]
struct Fixture {
    user: User,
    request: PermissionCheckRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    response: PermissionCheckResponse,
    effective_permissions: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        bail!("usage: iam-check <fixture.json>");
    };

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture {}", path.display()))?;
    let fixture: Fixture = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse fixture {}", path.display()))?;

    let config = EngineConfig::from_env().context("invalid engine configuration")?;
    let engine = IamEngine::new(config).context("failed to initialize engine")?;

    info!(
        "Checking '{}' for user '{}' (iam-authz v{})",
        fixture.request.permission,
        fixture.user.id,
        iam_authz::VERSION
    );

    let response = engine.check_permission(&fixture.user, &fixture.request);
    let mut effective_permissions: Vec<String> = engine
        .effective_permissions(&fixture.user)
        .into_iter()
        .map(|p| p.id)
        .collect();
    effective_permissions.sort();

    let report = Report {
        response,
        effective_permissions,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
