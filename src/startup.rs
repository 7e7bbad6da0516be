use crate::config::Config;
use crate::validation::validate_account_id;
use anyhow::{Context, Result};
use sqlx::PgPool;
use std::time::Duration;

pub struct ValidationReport {
    pub environment: bool,
    pub database: bool,
    pub gateway: bool,
    /// None when pinning credentials are absent; uploads then degrade to
    /// placeholders and the check is skipped.
    pub pinning: Option<bool>,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.environment && self.database && self.gateway && self.pinning.unwrap_or(true)
    }

    pub fn print(&self) {
        println!("\n=== Startup Validation Report ===");
        println!("Environment Variables: {}", status(self.environment));
        println!("Database Connectivity: {}", status(self.database));
        println!("Ledger Gateway:        {}", status(self.gateway));
        match self.pinning {
            Some(ok) => println!("Pinning Service:       {}", status(ok)),
            None => println!("Pinning Service:       skipped (not configured)"),
        }

        if !self.errors.is_empty() {
            println!("\nErrors:");
            for error in &self.errors {
                println!("  ❌ {}", error);
            }
        }

        println!(
            "\nOverall Status: {}",
            if self.is_valid() { "✅ PASS" } else { "❌ FAIL" }
        );
        println!("=================================\n");
    }
}

fn status(ok: bool) -> &'static str {
    if ok {
        "✅ OK"
    } else {
        "❌ FAIL"
    }
}

pub async fn validate_environment(config: &Config, pool: &PgPool) -> Result<ValidationReport> {
    let mut report = ValidationReport {
        environment: true,
        database: true,
        gateway: true,
        pinning: config.pinning_configured().then_some(true),
        errors: Vec::new(),
    };

    if let Err(e) = validate_env_vars(config) {
        report.environment = false;
        report.errors.push(format!("Environment: {}", e));
    }

    if let Err(e) = validate_database(pool).await {
        report.database = false;
        report.errors.push(format!("Database: {}", e));
    }

    if let Err(e) = validate_gateway(&config.ledger_gateway_url).await {
        report.gateway = false;
        report.errors.push(format!("Gateway: {}", e));
    }

    if let (Some(url), Some(token)) = (&config.pinning_api_url, &config.pinning_api_token) {
        if let Err(e) = validate_pinning(url, token).await {
            report.pinning = Some(false);
            report.errors.push(format!("Pinning: {}", e));
        }
    }

    Ok(report)
}

fn validate_env_vars(config: &Config) -> Result<()> {
    if config.database_url.is_empty() {
        anyhow::bail!("DATABASE_URL is empty");
    }
    if config.server_port == 0 {
        anyhow::bail!("SERVER_PORT must be greater than 0");
    }
    if config.operator_private_key.is_empty() {
        anyhow::bail!("OPERATOR_PRIVATE_KEY is empty");
    }

    validate_account_id(&config.operator_account_id)
        .context("OPERATOR_ACCOUNT_ID is not a valid entity id")?;
    validate_account_id(&config.batch_topic_id)
        .context("BATCH_TOPIC_ID is not a valid entity id")?;
    validate_account_id(&config.batch_token_id)
        .context("BATCH_TOKEN_ID is not a valid entity id")?;

    url::Url::parse(&config.ledger_gateway_url)
        .context("LEDGER_GATEWAY_URL is not a valid URL")?;

    if let Some(pinning_url) = &config.pinning_api_url {
        url::Url::parse(pinning_url).context("PINNING_API_URL is not a valid URL")?;
    }

    Ok(())
}

async fn validate_database(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .context("Failed to connect to database")?;

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .context("Failed to check migrations table")?;

    if applied == 0 {
        anyhow::bail!("No migrations applied");
    }

    Ok(())
}

async fn validate_gateway(gateway_url: &str) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let response = client
        .get(gateway_url)
        .send()
        .await
        .context("Failed to connect to ledger gateway")?;

    if !response.status().is_success() {
        anyhow::bail!("Ledger gateway returned status: {}", response.status());
    }

    Ok(())
}

async fn validate_pinning(pinning_url: &str, api_token: &str) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let response = client
        .get(format!(
            "{}/data/testAuthentication",
            pinning_url.trim_end_matches('/')
        ))
        .bearer_auth(api_token)
        .send()
        .await
        .context("Failed to connect to pinning service")?;

    if !response.status().is_success() {
        anyhow::bail!("Pinning service rejected credentials: {}", response.status());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerNetwork;

    fn valid_config() -> Config {
        Config {
            server_port: 3000,
            database_url: "postgres://localhost:5432/agritrust".to_string(),
            ledger_network: LedgerNetwork::Testnet,
            ledger_gateway_url: "https://gateway.testnet.example".to_string(),
            operator_account_id: "0.0.1001".to_string(),
            operator_private_key: "302e020100300506032b657004220420cafe".to_string(),
            batch_topic_id: "0.0.123".to_string(),
            batch_token_id: "0.0.456".to_string(),
            pinning_api_url: None,
            pinning_api_token: None,
            cors_allowed_origins: None,
            log_request_body: false,
        }
    }

    #[test]
    fn test_validate_env_vars_accepts_valid_config() {
        assert!(validate_env_vars(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_env_vars_empty_database_url() {
        let config = Config {
            database_url: String::new(),
            ..valid_config()
        };

        assert!(validate_env_vars(&config).is_err());
    }

    #[test]
    fn test_validate_env_vars_invalid_gateway_url() {
        let config = Config {
            ledger_gateway_url: "not-a-url".to_string(),
            ..valid_config()
        };

        assert!(validate_env_vars(&config).is_err());
    }

    #[test]
    fn test_validate_env_vars_invalid_operator_account() {
        let config = Config {
            operator_account_id: "operator".to_string(),
            ..valid_config()
        };

        assert!(validate_env_vars(&config).is_err());
    }

    #[test]
    fn test_report_skips_unconfigured_pinning() {
        let report = ValidationReport {
            environment: true,
            database: true,
            gateway: true,
            pinning: None,
            errors: Vec::new(),
        };

        assert!(report.is_valid());
    }
}
