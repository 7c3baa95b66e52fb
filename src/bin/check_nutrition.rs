//! Query the nutrition service for a food name and print what the bot would use
//!
//! Usage: check_nutrition [food name...]   (defaults to "banana")

use nutribot::nutrition::{normalize, ServingSizeTable};
use nutribot::services::{ninjas, ApiNinjasClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let food = if args.is_empty() {
        "banana".to_string()
    } else {
        args.join(" ")
    };

    let api_key = std::env::var("API_NINJAS_KEY")
        .map_err(|_| "API_NINJAS_KEY environment variable not set")?;
    let client = ApiNinjasClient::new(api_key)?;

    println!("Querying nutrition for: {}", food);
    let items = client.query(&food).await?;
    println!("Raw response ({} item(s), per 100 g):", items.len());
    println!("{}", serde_json::to_string_pretty(&items)?);

    match ninjas::best_match(items) {
        Some(raw) => {
            let record = normalize(&ServingSizeTable::default(), &food, &raw);
            println!("Per serving:");
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        None => println!("No nutrition data for '{}'", food),
    }

    Ok(())
}
