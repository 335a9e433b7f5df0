//! Implementation of the `delegator route` command.

use super::{build_request, print_json};
use crate::cli::RouteArgs;
use crate::delegation::route_task;
use crate::error::Result;
use crate::exit_codes;

/// Print the routing decision and plan for a task without executing it.
///
/// The printed plan is the router's output: depth-derived model and
/// reasoning-effort overrides are applied at execution time, not here.
pub fn cmd_route(args: RouteArgs) -> Result<i32> {
    let request = build_request(args.request);
    let routed = route_task(&request);
    print_json(&serde_json::json!({
        "decision": routed.decision,
        "plan": routed.plan,
    }))?;
    Ok(exit_codes::SUCCESS)
}
