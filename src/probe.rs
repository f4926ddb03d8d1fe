//! Reachability probing via the system `ping` binary.
//!
//! The core phase first waits for the default gateway, patiently: blocks
//! of `retry_limit + 1` attempts separated by a long backoff, repeated
//! until the gateway answers. Network bring-up after boot can take
//! minutes, and there is nothing useful to do without a route. Once the
//! gateway answers, the configured target mapping is probed in rounds;
//! the whole mapping is retried until a round has no failures or the
//! allowed rounds run out.
//!
//! A `null` host in the mapping stands for the default gateway, which is
//! resolved from the OS routing tables when not configured explicitly.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{CoreSettings, NetworkTargets};
use crate::errors::ProbeError;
use crate::util::exec::{ExecRequest, ExecService};

const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Probe every target in the mapping. `is_core` adds the gateway wait
/// in front and marks this as the warden's own connectivity check.
pub fn probe(targets: &NetworkTargets, is_core: bool, core: &CoreSettings) -> Result<(), ProbeError> {
    let exec = ExecService::new(PING_TIMEOUT);

    if is_core {
        wait_for_gateway(&exec, core)?;
    }

    if targets.is_empty() {
        debug!(is_core, "no probe targets configured");
        return Ok(());
    }

    let rounds = core.rounds();
    let mut round: u32 = 0;
    loop {
        round += 1;
        let mut failed = 0usize;
        for (name, host) in targets {
            match resolve_host(host.as_deref(), core) {
                Ok(resolved) => match ping(&exec, &resolved) {
                    Some(latency) => {
                        info!(
                            name = %name,
                            host = %resolved,
                            latency_ms = latency.as_millis() as u64,
                            "reachable"
                        );
                        thread::sleep(core.normal_pace());
                    }
                    None => {
                        warn!(name = %name, host = %resolved, round, "ping failed");
                        failed += 1;
                    }
                },
                Err(err) => {
                    warn!(name = %name, round, error = %err, "host not resolvable");
                    failed += 1;
                }
            }
        }
        if failed == 0 {
            return Ok(());
        }
        if round >= rounds {
            return Err(ProbeError::NetworkUnreachable {
                failed,
                total: targets.len(),
                rounds,
            });
        }
        thread::sleep(core.error_pace());
    }
}

/// Block until the gateway answers a ping. Unbounded on purpose; only an
/// unresolvable-by-construction setup (no configured gateway on a
/// platform without autodetection) errors out.
fn wait_for_gateway(exec: &ExecService, core: &CoreSettings) -> Result<(), ProbeError> {
    if core.gateway.is_none() && !autodetect_supported() {
        return Err(ProbeError::GatewayUnavailable(
            "no gateway configured and automatic detection is unsupported on this platform"
                .to_string(),
        ));
    }

    let block = core.rounds().max(1);
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.wrapping_add(1);
        let host = match &core.gateway {
            Some(h) => Ok(h.clone()),
            None => resolve_default_gateway(),
        };
        match host {
            Ok(host) => {
                if let Some(latency) = ping(exec, &host) {
                    info!(
                        host = %host,
                        latency_ms = latency.as_millis() as u64,
                        attempt,
                        "gateway reachable"
                    );
                    thread::sleep(core.normal_pace());
                    return Ok(());
                }
                warn!(host = %host, attempt, "gateway ping failed");
            }
            Err(err) => {
                warn!(attempt, error = %err, "default gateway not resolvable yet");
            }
        }
        if attempt % block == 0 {
            info!(attempt, "gateway still unreachable; backing off");
            thread::sleep(core.long_backoff());
        }
        thread::sleep(core.error_pace());
    }
}

fn resolve_host(host: Option<&str>, core: &CoreSettings) -> Result<String, ProbeError> {
    match host {
        Some(h) if !h.is_empty() => Ok(h.to_string()),
        _ => match &core.gateway {
            Some(g) => Ok(g.clone()),
            None => resolve_default_gateway(),
        },
    }
}

/// One ping, judged purely by exit status. Returns the wall-clock
/// latency of the invocation on success.
fn ping(exec: &ExecService, host: &str) -> Option<Duration> {
    let count_flag = if cfg!(windows) { "-n" } else { "-c" };
    let request = ExecRequest::new("ping")
        .arg(count_flag)
        .arg("1")
        .arg(host)
        .quiet(true);
    match exec.run(request) {
        Ok(out) if out.status.success() => Some(out.duration),
        Ok(_) => None,
        Err(err) => {
            debug!(host = %host, error = %err, "ping could not run");
            None
        }
    }
}

fn autodetect_supported() -> bool {
    cfg!(any(target_os = "linux", target_os = "macos"))
}

#[cfg(target_os = "linux")]
fn resolve_default_gateway() -> Result<String, ProbeError> {
    if let Ok(table) = std::fs::read_to_string("/proc/net/route") {
        if let Some(gw) = parse_proc_net_route(&table) {
            return Ok(gw);
        }
    }
    let exec = ExecService::new(Duration::from_secs(5));
    let out = exec
        .run(
            ExecRequest::new("ip")
                .args(["route", "show", "default"])
                .capture_output(true),
        )
        .map_err(|err| ProbeError::GatewayUnavailable(err.to_string()))?;
    if !out.status.success() {
        return Err(ProbeError::GatewayUnavailable(format!(
            "ip route exited with {:?}",
            out.status.code()
        )));
    }
    parse_ip_route_default(&out.stdout)
        .ok_or_else(|| ProbeError::GatewayUnavailable("no default route".to_string()))
}

#[cfg(target_os = "macos")]
fn resolve_default_gateway() -> Result<String, ProbeError> {
    let exec = ExecService::new(Duration::from_secs(5));
    let out = exec
        .run(
            ExecRequest::new("route")
                .args(["-n", "get", "default"])
                .capture_output(true),
        )
        .map_err(|err| ProbeError::GatewayUnavailable(err.to_string()))?;
    if !out.status.success() {
        return Err(ProbeError::GatewayUnavailable(format!(
            "route -n get default exited with {:?}",
            out.status.code()
        )));
    }
    parse_route_get_default(&out.stdout)
        .ok_or_else(|| ProbeError::GatewayUnavailable("no default route".to_string()))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn resolve_default_gateway() -> Result<String, ProbeError> {
    Err(ProbeError::GatewayUnavailable(
        "automatic gateway detection is unsupported on this platform; set core.gateway"
            .to_string(),
    ))
}

/// Pick the gateway of the default route out of `/proc/net/route`.
/// Addresses are hex-encoded little-endian u32s.
fn parse_proc_net_route(contents: &str) -> Option<String> {
    for line in contents.lines().skip(1) {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() < 3 {
            continue;
        }
        if cols[1] != "00000000" || cols[2] == "00000000" {
            continue;
        }
        if let Ok(raw) = u32::from_str_radix(cols[2], 16) {
            return Some(std::net::Ipv4Addr::from(raw.to_le_bytes()).to_string());
        }
    }
    None
}

/// Token after `via` in `ip route show default` output.
fn parse_ip_route_default(output: &str) -> Option<String> {
    for line in output.lines() {
        let mut tokens = line.split_whitespace();
        while let Some(tok) = tokens.next() {
            if tok == "via" {
                return tokens.next().map(|s| s.to_string());
            }
        }
    }
    None
}

/// Address after `gateway:` in `route -n get default` output.
#[allow(dead_code)]
fn parse_route_get_default(output: &str) -> Option<String> {
    for line in output.lines() {
        if let Some(rest) = line.trim_start().strip_prefix("gateway:") {
            let gw = rest.trim();
            if !gw.is_empty() {
                return Some(gw.to_string());
            }
        }
    }
    None
}
