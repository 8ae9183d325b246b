use gateway_sdk::GatewayClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = GatewayClient::new("http://localhost:7000");

    // 1. Register this machine
    println!("Registering...");
    let (client, registration) = client.registered().await?;
    println!("{}", registration.message);

    // 2. Spend some quota
    let created = client.create_item("first item").await?;
    println!("Created: {} ({:?} requests left)", created.body, created.remaining_after());

    let listed = client.list_items().await?;
    println!("Items: {}", listed.body["count"]);

    // 3. Top up
    let recharged = client.recharge(None).await?;
    println!("{}", recharged.body["message"]);

    Ok(())
}
