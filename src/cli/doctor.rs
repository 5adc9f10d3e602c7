//! `aria doctor` - active health diagnostics.
//!
//! Validates configuration and probes external dependencies to surface
//! problems before they bite during normal operation. Each check reports
//! pass/fail with actionable guidance on failures.

use std::time::Duration;

use clap::Subcommand;
use secrecy::ExposeSecret;

use crate::config::{AgentConfig, ChainConfig, ChannelsConfig, LlmConfig, XmtpConfig};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Optional doctor subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum DoctorSubcommand {
    /// Validate startup prerequisites (configuration and the gateway port).
    Startup,
}

/// Run diagnostic checks and print results.
pub async fn run_doctor_command(
    command: Option<DoctorSubcommand>,
    strict: bool,
) -> anyhow::Result<()> {
    crate::bootstrap::load_env_files();
    match command {
        Some(DoctorSubcommand::Startup) => run_startup_checks(strict),
        None => run_full_doctor(strict).await,
    }
}

async fn run_full_doctor(strict: bool) -> anyhow::Result<()> {
    println!("Aria Doctor");
    println!("===========\n");

    let mut passed = 0u32;
    let mut failed = 0u32;

    // ── Configuration checks ──────────────────────────────────

    check("Env file", check_env_file(), &mut passed, &mut failed);
    check("XMTP keys", check_xmtp(), &mut passed, &mut failed);
    check("Gemini API key", check_llm(), &mut passed, &mut failed);
    check("Chain settings", check_chain(), &mut passed, &mut failed);
    check("Agent settings", check_agent(), &mut passed, &mut failed);
    check(
        "Gateway and frame settings",
        check_channels(),
        &mut passed,
        &mut failed,
    );

    // ── External services ─────────────────────────────────────

    check(
        "Gemini API reachability",
        check_gemini_reachability().await,
        &mut passed,
        &mut failed,
    );
    check(
        "Base RPC reachability",
        check_rpc_reachability().await,
        &mut passed,
        &mut failed,
    );
    check(
        "HTTP gateway bind port",
        check_gateway_port_available(),
        &mut passed,
        &mut failed,
    );

    // ── Summary ───────────────────────────────────────────────

    println!();
    println!("  {passed} passed, {failed} failed");

    if failed > 0 {
        println!("\n  Some checks failed. Run `aria init` to create ~/.aria/.env.");
        if strict {
            anyhow::bail!("doctor strict mode failed with {failed} check(s)");
        }
    }

    Ok(())
}

fn run_startup_checks(strict: bool) -> anyhow::Result<()> {
    println!("Aria Doctor (startup)");
    println!("=====================\n");

    let mut passed = 0u32;
    let mut failed = 0u32;

    check("XMTP keys", check_xmtp(), &mut passed, &mut failed);
    check("Gemini API key", check_llm(), &mut passed, &mut failed);
    check("Agent settings", check_agent(), &mut passed, &mut failed);
    check(
        "HTTP gateway bind port",
        check_gateway_port_available(),
        &mut passed,
        &mut failed,
    );

    println!();
    println!("  {passed} passed, {failed} failed");

    if failed > 0 {
        println!("\n  Startup preflight failed. Fix the listed checks before `aria serve`.");
        if strict {
            anyhow::bail!("doctor startup strict mode failed with {failed} check(s)");
        }
    }

    Ok(())
}

// ── Individual checks ───────────────────────────────────────

fn check(name: &str, result: CheckResult, passed: &mut u32, failed: &mut u32) {
    match result {
        CheckResult::Pass(detail) => {
            *passed += 1;
            println!("  [pass] {name}: {detail}");
        }
        CheckResult::Fail(detail) => {
            *failed += 1;
            println!("  [FAIL] {name}: {detail}");
        }
        CheckResult::Skip(reason) => {
            println!("  [skip] {name}: {reason}");
        }
    }
}

#[derive(Debug)]
enum CheckResult {
    Pass(String),
    Fail(String),
    Skip(String),
}

fn check_env_file() -> CheckResult {
    let path = crate::bootstrap::aria_env_path();
    if path.exists() {
        CheckResult::Pass(format!("loaded {}", path.display()))
    } else {
        CheckResult::Skip(format!(
            "{} not found (environment variables only)",
            path.display()
        ))
    }
}

fn check_xmtp() -> CheckResult {
    match XmtpConfig::resolve() {
        Ok(xmtp) => CheckResult::Pass(format!("configured for {}", xmtp.env.as_str())),
        Err(e) => CheckResult::Fail(e.to_string()),
    }
}

fn check_llm() -> CheckResult {
    match LlmConfig::resolve() {
        Ok(llm) => CheckResult::Pass(format!(
            "model {}, timeout {}s",
            llm.model,
            llm.timeout.as_secs()
        )),
        Err(e) => CheckResult::Fail(format!("{e}; free text falls back to canned replies")),
    }
}

fn check_chain() -> CheckResult {
    match ChainConfig::resolve() {
        Ok(chain) => CheckResult::Pass(format!(
            "chain id {}{}",
            chain.chain_id,
            chain
                .rpc_url
                .as_deref()
                .map(|url| format!(", rpc {url}"))
                .unwrap_or_default()
        )),
        Err(e) => CheckResult::Fail(e.to_string()),
    }
}

fn check_agent() -> CheckResult {
    let chain = match ChainConfig::resolve() {
        Ok(chain) => chain,
        Err(e) => return CheckResult::Fail(format!("chain settings invalid: {e}")),
    };
    let defaults = AgentConfig::default();
    match AgentConfig::resolve(&chain, defaults.responder_timeout) {
        Ok(agent) => CheckResult::Pass(format!(
            "{} msgs per {}s, aliases [{}]{}",
            agent.rate_limit_max_requests,
            agent.rate_limit_window.as_secs(),
            agent.aliases.join(", "),
            if agent.agent_address.is_some() {
                ""
            } else {
                "; ARIA_AGENT_ADDRESS unset, group replies to Aria are not detected"
            }
        )),
        Err(e) => CheckResult::Fail(e.to_string()),
    }
}

fn check_channels() -> CheckResult {
    match ChannelsConfig::resolve() {
        Ok(channels) => CheckResult::Pass(format!(
            "gateway {}:{}{}, frame {}",
            channels.gateway.host,
            channels.gateway.port,
            if channels.gateway.auth_token.is_some() {
                " (bridge token set)"
            } else {
                " (bridge open)"
            },
            channels.frame.base_url
        )),
        Err(e) => CheckResult::Fail(e.to_string()),
    }
}

fn probe_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

async fn check_gemini_reachability() -> CheckResult {
    let llm = match LlmConfig::resolve() {
        Ok(llm) => llm,
        Err(_) => return CheckResult::Skip("GEMINI_API_KEY not configured".to_string()),
    };

    let url = format!(
        "{}/v1beta/models/{}",
        llm.base_url.trim_end_matches('/'),
        llm.model
    );
    let response = probe_client()
        .get(&url)
        .header("x-goog-api-key", llm.gemini_api_key.expose_secret())
        .send()
        .await;

    match response {
        Ok(resp) if resp.status().is_success() => {
            CheckResult::Pass(format!("model {} available", llm.model))
        }
        Ok(resp) if resp.status().as_u16() == 401 || resp.status().as_u16() == 403 => {
            CheckResult::Fail("API key rejected".to_string())
        }
        Ok(resp) => CheckResult::Fail(format!("HTTP {} from {}", resp.status(), llm.base_url)),
        Err(e) => CheckResult::Fail(format!("cannot reach {}: {e}", llm.base_url)),
    }
}

async fn check_rpc_reachability() -> CheckResult {
    let chain = match ChainConfig::resolve() {
        Ok(chain) => chain,
        Err(e) => return CheckResult::Fail(e.to_string()),
    };
    let Some(rpc_url) = chain.rpc_url else {
        return CheckResult::Skip("BASE_RPC_URL not configured".to_string());
    };

    probe_chain_id(&rpc_url, chain.chain_id).await
}

async fn probe_chain_id(rpc_url: &str, expected: u64) -> CheckResult {
    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "eth_chainId",
        "params": []
    });
    let response = match probe_client().post(rpc_url).json(&request).send().await {
        Ok(response) => response,
        Err(e) => return CheckResult::Fail(format!("cannot reach {rpc_url}: {e}")),
    };
    let body: serde_json::Value = match response.json().await {
        Ok(body) => body,
        Err(e) => return CheckResult::Fail(format!("invalid JSON-RPC response: {e}")),
    };

    match body
        .get("result")
        .and_then(|v| v.as_str())
        .and_then(|hex| u64::from_str_radix(hex.trim_start_matches("0x"), 16).ok())
    {
        Some(id) if id == expected => CheckResult::Pass(format!("chain id {id} confirmed")),
        Some(id) => CheckResult::Fail(format!(
            "RPC reports chain {id}, BASE_CHAIN_ID is {expected}"
        )),
        None => CheckResult::Fail(format!("unexpected eth_chainId response: {body}")),
    }
}

fn check_gateway_port_available() -> CheckResult {
    let channels = match ChannelsConfig::resolve() {
        Ok(channels) => channels,
        Err(e) => return CheckResult::Fail(e.to_string()),
    };

    let port = channels.gateway.port;
    let bind_addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    match std::net::TcpListener::bind(bind_addr) {
        Ok(listener) => {
            drop(listener);
            CheckResult::Pass(format!("port {} is available", port))
        }
        Err(error) => CheckResult::Fail(format!(
            "port {} is unavailable ({}); free the port or change ARIA_GATEWAY_PORT",
            port, error
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::{ENV_MUTEX, clear_aria_env};

    #[test]
    fn check_counts_pass_and_fail_but_not_skip() {
        let mut passed = 0;
        let mut failed = 0;
        check("a", CheckResult::Pass("ok".into()), &mut passed, &mut failed);
        check("b", CheckResult::Fail("bad".into()), &mut passed, &mut failed);
        check("c", CheckResult::Skip("n/a".into()), &mut passed, &mut failed);
        assert_eq!((passed, failed), (1, 1));
    }

    #[test]
    fn missing_keys_fail_and_unset_rpc_skips() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_aria_env();

        assert!(matches!(check_xmtp(), CheckResult::Fail(_)));
        assert!(matches!(check_llm(), CheckResult::Fail(_)));
        assert!(matches!(check_chain(), CheckResult::Pass(_)));
        assert!(matches!(check_agent(), CheckResult::Pass(_)));

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        assert!(matches!(
            rt.block_on(check_rpc_reachability()),
            CheckResult::Skip(_)
        ));
        assert!(matches!(
            rt.block_on(check_gemini_reachability()),
            CheckResult::Skip(_)
        ));
    }

    #[tokio::test]
    async fn rpc_chain_id_is_compared() {
        use wiremock::matchers::{body_partial_json, method};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"method": "eth_chainId"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": "0x2105"}),
            ))
            .mount(&server)
            .await;

        assert!(matches!(
            probe_chain_id(&server.uri(), 8453).await,
            CheckResult::Pass(_)
        ));
        match probe_chain_id(&server.uri(), 84532).await {
            CheckResult::Fail(detail) => assert!(detail.contains("reports chain 8453")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
