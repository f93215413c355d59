//! Deploy tag naming.
//!
//! Tags are named `deploy-[<prefix>-]<environment>-<YYYY-MM-DD>`. A second
//! deploy on the same day gets `.1`, then `.2`, and so on: suffixes are
//! probed in order and the first unused name wins.

use chrono::{DateTime, Local, NaiveDate};

/// Tag name before collision probing.
pub fn base_name(prefix: Option<&str>, environment: &str, date: NaiveDate) -> String {
    match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => format!("deploy-{}-{}-{}", prefix, environment, date.format("%Y-%m-%d")),
        None => format!("deploy-{}-{}", environment, date.format("%Y-%m-%d")),
    }
}

/// First name in `base`, `base.1`, `base.2`, ... not present in `existing`.
pub fn next_available(base: &str, existing: &[String]) -> String {
    let taken = |name: &str| existing.iter().any(|tag| tag == name);

    let mut name = base.to_string();
    let mut counter = 0u32;
    while taken(&name) {
        counter += 1;
        name = format!("{}.{}", base, counter);
    }
    name
}

pub fn deploy_message(environment: &str, at: &DateTime<Local>) -> String {
    format!("Deploy to {} at {}", environment, at.format("%Y-%m-%d %H:%M:%S %z"))
}

pub fn promote_message(environment: &str, source: &str, at: &DateTime<Local>) -> String {
    format!(
        "Deploy to {} from {} at {}",
        environment,
        source,
        at.format("%Y-%m-%d %H:%M:%S %z")
    )
}
