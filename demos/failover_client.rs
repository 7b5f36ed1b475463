use terrastore_client::{ClientConfig, TerrastoreClient};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("==> Terrastore Failover Client");

    // The first host is never reachable; the client fails over and sticks to the second.
    let config = ClientConfig::from_json(
        r#"{
            "hosts": ["http://127.0.0.1:1", "http://localhost:8080"],
            "policy": "ordered",
            "connect_timeout_ms": 1000,
            "request_timeout_ms": 5000
        }"#,
    )?;
    let client = TerrastoreClient::from_config(&config)?;
    println!("✓ Configured {} hosts", config.hosts.len());
    println!("  Current host: {}", client.connection().current_host()?);

    for attempt in 1..=3 {
        match client.buckets() {
            Ok(buckets) => println!("✓ Attempt {}: {} buckets", attempt, buckets.len()),
            Err(err) if err.is_connectivity() => println!("✗ Attempt {}: {}", attempt, err),
            Err(err) => return Err(err.into()),
        }
        println!("  Current host: {}", client.connection().current_host()?);
    }

    match client.cluster_stats() {
        Ok(stats) => {
            for cluster in stats.clusters {
                println!("✓ Cluster {} ({})", cluster.name, cluster.status);
                for node in cluster.nodes {
                    println!("  {} at {}:{}", node.name, node.host, node.port);
                }
            }
        }
        Err(err) => println!("✗ Cluster stats unavailable: {}", err),
    }

    Ok(())
}
