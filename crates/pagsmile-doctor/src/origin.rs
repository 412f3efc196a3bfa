//! `pagsmile-doctor origin`: send a request through the relay's proxy and
//! report how the gateway answered.

use std::time::Duration;

const TEST_USER_AGENT: &str = "Test-Script/1.0";
const PROXY_TEST_PATH: &str = "/pagsmile-proxy/api/test";

#[derive(Debug, thiserror::Error)]
pub enum DoctorError {
    #[error("relay is not reachable at {url}: {source}")]
    Unreachable { url: String, source: reqwest::Error },
    #[error("relay health check answered {0}")]
    Unhealthy(u16),
    #[error("proxy test request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Forbidden,
    Other(u16),
}

impl Verdict {
    pub fn from_status(status: u16) -> Self {
        match status {
            200 => Verdict::Ok,
            403 => Verdict::Forbidden,
            other => Verdict::Other(other),
        }
    }

    pub fn explain(&self) -> Vec<String> {
        match self {
            Verdict::Ok => vec!["200 OK: the gateway accepted the relayed request".into()],
            Verdict::Forbidden => vec![
                "403 Forbidden. Likely causes:".into(),
                "  - the Origin header is not reaching the gateway".into(),
                "  - the domain is not authorised in the Pagsmile dashboard".into(),
                "  - the credentials are wrong".into(),
            ],
            Verdict::Other(status) => vec![format!(
                "status {status}: see the relay logs for the gateway reply"
            )],
        }
    }
}

fn base(url: &str) -> &str {
    url.trim_end_matches('/')
}

async fn check_health(client: &reqwest::Client, base_url: &str) -> Result<(), DoctorError> {
    let url = format!("{}/health", base(base_url));
    println!("Checking {url}");
    let resp = client
        .get(&url)
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .map_err(|source| DoctorError::Unreachable {
            url: url.clone(),
            source,
        })?;
    let status = resp.status().as_u16();
    if status != 200 {
        return Err(DoctorError::Unhealthy(status));
    }
    println!("Relay is up\n");
    Ok(())
}

pub async fn run(base_url: &str) -> Result<(), DoctorError> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    println!("Origin header check against {}\n", base(base_url));
    check_health(&client, base_url).await?;

    let referer = format!("{}/", base(base_url));
    println!("Sending with:");
    println!("  Origin: {}", base(base_url));
    println!("  Referer: {referer}");
    println!("  User-Agent: {TEST_USER_AGENT}");
    println!("  Content-Type: application/json\n");

    let body = serde_json::json!({
        "test": true,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    let url = format!("{}{}", base(base_url), PROXY_TEST_PATH);
    tracing::debug!(url = %url, "sending proxy test request");
    let resp = client
        .post(&url)
        .header("Origin", base(base_url))
        .header("Referer", &referer)
        .header("User-Agent", TEST_USER_AGENT)
        .json(&body)
        .send()
        .await?;

    let status = resp.status();
    let headers: serde_json::Map<String, serde_json::Value> = resp
        .headers()
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                serde_json::Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned()),
            )
        })
        .collect();
    let bytes = resp.bytes().await?;
    let data = serde_json::from_slice::<serde_json::Value>(&bytes)
        .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned().into());

    println!("Status: {status}");
    println!("\nResponse headers:");
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::Value::Object(headers)).unwrap_or_default()
    );
    println!("\nResponse body:");
    println!("{}", serde_json::to_string_pretty(&data).unwrap_or_default());

    println!("\nAnalysis:");
    for line in Verdict::from_status(status.as_u16()).explain() {
        println!("  {line}");
    }
    println!("\nThe relay logs an \"origin resolved\" event per proxied request;");
    println!("check that it names the Origin you expect.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_from_status() {
        assert_eq!(Verdict::from_status(200), Verdict::Ok);
        assert_eq!(Verdict::from_status(403), Verdict::Forbidden);
        assert_eq!(Verdict::from_status(500), Verdict::Other(500));
    }

    #[test]
    fn test_forbidden_mentions_origin() {
        let lines = Verdict::Forbidden.explain();
        assert!(lines.iter().any(|l| l.contains("Origin")));
    }

    #[test]
    fn test_base_trims_slash() {
        assert_eq!(base("http://localhost:3000/"), "http://localhost:3000");
        assert_eq!(base("http://localhost:3000"), "http://localhost:3000");
    }
}
