use serde::{Deserialize, Serialize};
use terrastore_client::{Error, MergeDescriptor, Parameters, TerrastoreClient};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Person {
    name: String,
    city: String,
    visits: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("==> Terrastore Basic Usage");

    let url = std::env::var("TERRASTORE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let client = TerrastoreClient::new(&url)?;
    println!("✓ Created client for {}", url);

    let people = client.bucket("people");

    // Put a few values
    for (key, name, city) in [("p1", "Ada", "London"), ("p2", "Alan", "Wilmslow"), ("p3", "Grace", "Arlington")] {
        people.key(key).put(&Person {
            name: name.to_string(),
            city: city.to_string(),
            visits: 0,
        })?;
    }
    println!("✓ Stored 3 people");

    // Get one back
    let ada: Person = people.key("p1").get()?;
    println!("✓ Got p1: {:?}", ada);

    // Range query
    let range = people.range("p1").to("p2").comparator("lexical-asc").get::<Person>()?;
    println!("✓ Range p1..p2 returned {} entries", range.len());
    for (key, person) in range.iter() {
        println!("  {} => {}", key, person.name);
    }

    // Predicate query
    let londoners = people.predicate::<Person>("jxpath:/city[.='London']")?;
    println!("✓ {} people live in London", londoners.len());

    // Conditional put
    match people
        .key("p2")
        .conditional("jxpath:/city[.='London']")
        .put(&ada)
    {
        Err(Error::UnsatisfiedCondition { message, .. }) => {
            println!("✓ Conditional put rejected: {}", message)
        }
        other => println!("  Conditional put: {:?}", other),
    }

    // Server-side update and merge
    let updated: Person = people
        .key("p3")
        .update("replace")
        .timeout(1000)
        .parameters(
            Parameters::new()
                .with("name", "Grace")
                .with("city", "New York")
                .with("visits", 1),
        )
        .execute_and_get()?;
    println!("✓ Updated p3: {:?}", updated);

    let merged: serde_json::Value = people
        .key("p1")
        .merge(MergeDescriptor::new().replace([("city", "Marylebone")]))?;
    println!("✓ Merged p1: {}", merged);

    // Missing keys surface as a typed error
    if let Err(err) = people.key("nobody").get::<Person>() {
        println!("✓ Missing key: {} (not found: {})", err, err.is_key_not_found());
    }

    // Buckets and cleanup
    let buckets = client.buckets()?;
    println!("✓ Buckets: {:?}", buckets.iter().collect::<Vec<_>>());

    people.remove()?;
    println!("✓ Removed bucket");

    println!("\n==> Example completed successfully!");
    Ok(())
}
