use anyhow::bail;

use crate::cli::OutputFormat;
use crate::client::HttpTransport;

pub async fn handle(transport: &HttpTransport, output_format: OutputFormat) -> anyhow::Result<()> {
    let body = transport.health().await?;
    let healthy = body["success"].as_bool().unwrap_or(false);

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&body)?),
        OutputFormat::Text => {
            let stats = &body["data"]["database"]["stats"];
            println!("Server: {}", transport.base_url());
            println!("Status: {}", if healthy { "ok" } else { "degraded" });
            println!(
                "Pool: {} open, {} idle, max {}",
                stats["size"], stats["idle"], stats["max_connections"]
            );
        }
    }

    if !healthy {
        bail!("server reported unhealthy database");
    }
    Ok(())
}
